mod demo;

use fm_rust::Sha256Oracle;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The demo uses the SHA-256 oracle, so repeated runs reproduce the
    // exact same curve.
    //
    // Any other TrialHash implementation can be plugged in instead, for
    // example the faster non-cryptographic one:
    // demo::synthetic::run::<fm_rust::Xxh64Oracle>()?;

    println!("Flajolet-Martin estimation");
    println!("==========================");
    demo::synthetic::run::<Sha256Oracle>()?;

    Ok(())
}
