use fm_rust::{TrialHash, estimate_cardinality_parallel};
use plotters::prelude::*;

const TRIAL_COUNT: usize = 256;

/// (true cardinality, estimate) pairs.
pub type EstimatePoints = Vec<(u64, u64)>;

fn sample_items(n: u64) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("item_{i}").into_bytes()).collect()
}

/// Estimates a sweep of synthetic streams with known true cardinality.
///
/// The trials of each estimate run on the rayon thread pool; the streams
/// themselves are processed one after another.
pub fn collect_estimates<H>() -> Result<EstimatePoints, Box<dyn std::error::Error>>
where
    H: TrialHash + Default + Send + Sync,
{
    let mut points = Vec::new();
    for n in (100..2000).step_by(100) {
        let items = sample_items(n);
        let estimate = estimate_cardinality_parallel::<H, _>(&items, TRIAL_COUNT)?;
        points.push((n, estimate));
    }
    Ok(points)
}

/// Draws the estimate-vs-actual comparison and writes it to
/// `fm_estimation.png`.
pub fn plot_estimates(points: &[(u64, u64)]) -> Result<(), Box<dyn std::error::Error>> {
    let max_n = points.iter().map(|&(n, _)| n).max().unwrap_or(1) as f64;
    let max_y = points.iter().map(|&(n, est)| n.max(est)).max().unwrap_or(1) as f64;

    // Matching matplotlib default colors
    let blue = RGBColor(31, 119, 180);
    let red = RGBColor(214, 39, 40);

    let root = BitMapBackend::new("fm_estimation.png", (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Flajolet-Martin Cardinality Estimation",
            ("sans-serif", 32).into_font(),
        )
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..max_n * 1.05, 0.0..max_y * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("actual unique items")
        .y_desc("estimated unique items")
        .label_style(("sans-serif", 18))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|&(n, _)| (n as f64, n as f64)),
            blue.stroke_width(2),
        ))?
        .label("Actual")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], blue.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|&(n, est)| (n as f64, est as f64)),
            red.stroke_width(3),
        ))?
        .label("FM estimate")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], red.stroke_width(3)));

    chart.draw_series(
        points
            .iter()
            .map(|&(n, est)| Circle::new((n as f64, est as f64), 4, red.filled())),
    )?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", 18))
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    println!("Plot saved to fm_estimation.png");

    Ok(())
}

/// Prints relative error statistics for the collected sweep.
pub fn print_error_stats(points: &[(u64, u64)]) {
    let errors: Vec<f64> = points
        .iter()
        .map(|&(n, est)| 100.0 * (est as f64 - n as f64).abs() / n as f64)
        .collect();

    let avg = errors.iter().sum::<f64>() / errors.len() as f64;
    let min = errors.iter().copied().fold(f64::INFINITY, f64::min);
    let max = errors.iter().copied().fold(0.0f64, f64::max);

    println!("Average estimation error: {avg:.2}%");
    println!("Min error: {min:.2}%");
    println!("Max error: {max:.2}%");

    println!();
    println!("{:<10} {:<12} {:<10}", "Actual", "Estimated", "Error (%)");
    println!("{:-<32}", "");
    for (&(n, est), err) in points.iter().zip(errors.iter()).step_by(3) {
        println!("{:<10} {:<12} {:<10.1}", n, est, err);
    }
}

pub fn run<H>() -> Result<(), Box<dyn std::error::Error>>
where
    H: TrialHash + Default + Send + Sync,
{
    println!("Estimating synthetic streams ({TRIAL_COUNT} trials each)...");
    let points = collect_estimates::<H>()?;

    plot_estimates(&points)?;

    println!();
    print_error_stats(&points);

    Ok(())
}
