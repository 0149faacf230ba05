use sha2::{Digest, Sha256};
use xxhash_rust::xxh64::xxh64;

/// A deterministic, seed-parameterized hash standing in for a family of
/// independent random hash functions, one per trial.
pub trait TrialHash {
    /// Hashes `item` under the hash function selected by `seed`.
    ///
    /// For a fixed `(item, seed)` pair the result is identical across
    /// calls, runs and processes.
    fn hash_trial(&self, item: &[u8], seed: u64) -> u64;
}

/// SHA-256 backed oracle, the default.
///
/// The seed is folded into the pre-image rather than selecting a different
/// algorithm: the pre-image is the item length (8 bytes, big-endian), the
/// item bytes, then the seed (8 bytes, big-endian). The length prefix keeps
/// distinct `(item, seed)` pairs from ever sharing a pre-image. The first
/// 8 digest bytes, read big-endian, become the hash value.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Oracle;

impl TrialHash for Sha256Oracle {
    fn hash_trial(&self, item: &[u8], seed: u64) -> u64 {
        let mut digest = Sha256::new();
        digest.update((item.len() as u64).to_be_bytes());
        digest.update(item);
        digest.update(seed.to_be_bytes());
        let output = digest.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&output[..8]);
        u64::from_be_bytes(prefix)
    }
}

/// Xxh64 backed oracle.
///
/// Not of the cryptographic class, but considerably faster; the trial seed
/// maps directly onto the xxh64 seed parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh64Oracle;

impl TrialHash for Xxh64Oracle {
    fn hash_trial(&self, item: &[u8], seed: u64) -> u64 {
        xxh64(item, seed)
    }
}
