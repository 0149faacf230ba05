use rayon::prelude::*;

use crate::error::EstimateError;
use crate::oracle::{Sha256Oracle, TrialHash};

const PHI: f64 = 0.77351;

/// Position of the least-significant set bit of `x`, or -1 when `x` has no
/// set bits at all.
#[inline]
pub fn rightmost_set_bit(x: u64) -> i32 {
    if x == 0 {
        -1
    } else {
        // trailing_zeros() will usually be compiled to a single instruction
        // like BSF on x86 architectures
        x.trailing_zeros() as i32
    }
}

/// Streaming Flajolet-Martin sketch over a fixed number of independent
/// trials.
///
/// Each trial tracks the maximum rightmost-set-bit position observed under
/// its own seeded hash function, so memory use stays at one scalar per
/// trial no matter how many items are folded in.
#[derive(Debug)]
pub struct FmSketch<H: TrialHash = Sha256Oracle> {
    max_rho: Vec<i32>,
    hasher: H,
}

impl FmSketch<Sha256Oracle> {
    /// Creates a sketch backed by the default SHA-256 oracle.
    pub fn new(trial_count: usize) -> Result<Self, EstimateError> {
        Self::with_hasher(trial_count, Sha256Oracle)
    }
}

impl<H: TrialHash> FmSketch<H> {
    /// Creates a sketch driven by the given per-trial hash.
    ///
    /// Fails before any hashing work when `trial_count` is zero. A single
    /// trial is legal, just statistically noisy.
    pub fn with_hasher(trial_count: usize, hasher: H) -> Result<Self, EstimateError> {
        if trial_count == 0 {
            return Err(EstimateError::InvalidTrialCount);
        }
        Ok(FmSketch {
            max_rho: vec![0; trial_count],
            hasher,
        })
    }

    pub fn trial_count(&self) -> usize {
        self.max_rho.len()
    }

    /// Folds one item into every trial.
    pub fn add(&mut self, item: &[u8]) {
        for (seed, max_rho) in self.max_rho.iter_mut().enumerate() {
            let rho = rightmost_set_bit(self.hasher.hash_trial(item, seed as u64));
            // An all-zero hash yields rho = -1 and never raises the maximum.
            if rho > *max_rho {
                *max_rho = rho;
            }
        }
    }

    /// Per-trial power-of-two estimates, in trial order.
    pub fn trial_estimates(&self) -> Vec<u64> {
        self.max_rho.iter().map(|&rho| 1u64 << rho).collect()
    }

    /// Corrected median of the per-trial estimates.
    pub fn estimate(&self) -> u64 {
        corrected_median(self.trial_estimates())
    }
}

/// Sorts ascending and selects the element at index `len / 2`.
///
/// For even trial counts this is the element just past the true median,
/// not the average of the two middle elements.
fn select_median(estimates: &mut [u64]) -> u64 {
    estimates.sort_unstable();
    estimates[estimates.len() / 2]
}

fn corrected_median(mut estimates: Vec<u64>) -> u64 {
    let median = select_median(&mut estimates);
    // Truncation toward zero, not rounding.
    (median as f64 / PHI) as u64
}

/// Estimates the number of distinct items in `items` over `trial_count`
/// independent trials, single threaded.
///
/// Items are read once each; duplicates cannot raise the estimate since
/// equal byte representations hash identically in every trial.
pub fn estimate_cardinality<H, I>(items: I, trial_count: usize) -> Result<u64, EstimateError>
where
    H: TrialHash + Default,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut sketch = FmSketch::with_hasher(trial_count, H::default())?;
    for item in items {
        sketch.add(item.as_ref());
    }
    Ok(sketch.estimate())
}

/// Same estimate as [`estimate_cardinality`], with the trials fanned out
/// across the rayon thread pool.
///
/// Trials never share state: each scans the items read-only and yields its
/// own power-of-two estimate, and the results are gathered before the
/// median selection. The returned value is bit-for-bit the one the
/// sequential path produces.
pub fn estimate_cardinality_parallel<H, T>(
    items: &[T],
    trial_count: usize,
) -> Result<u64, EstimateError>
where
    H: TrialHash + Default + Send + Sync,
    T: AsRef<[u8]> + Sync,
{
    if trial_count == 0 {
        return Err(EstimateError::InvalidTrialCount);
    }

    let hasher = H::default();
    let estimates: Vec<u64> = (0..trial_count as u64)
        .into_par_iter()
        .map(|seed| {
            let mut max_rho = 0;
            for item in items {
                let rho = rightmost_set_bit(hasher.hash_trial(item.as_ref(), seed));
                if rho > max_rho {
                    max_rho = rho;
                }
            }
            1u64 << max_rho
        })
        .collect();

    Ok(corrected_median(estimates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Xxh64Oracle;
    use test_case::test_case;

    fn sample_items(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| format!("item_{i}").into_bytes()).collect()
    }

    #[test_case(0 => -1)]
    #[test_case(1 => 0)]
    #[test_case(6 => 1)]
    #[test_case(8 => 3)]
    #[test_case(u64::MAX => 0)]
    #[test_case(1 << 63 => 63)]
    fn rightmost_set_bit_positions(x: u64) -> i32 {
        rightmost_set_bit(x)
    }

    #[test]
    fn median_selection_takes_upper_middle_element() {
        assert_eq!(select_median(&mut [16, 2, 8, 4]), 8);
        assert_eq!(select_median(&mut [4, 1, 2]), 2);
        assert_eq!(select_median(&mut [32]), 32);
    }

    #[test]
    fn correction_truncates_toward_zero() {
        // 8 / 0.77351 = 10.34..
        assert_eq!(corrected_median(vec![2, 4, 8, 16]), 10);
        // 1 / 0.77351 = 1.29..
        assert_eq!(corrected_median(vec![1]), 1);
    }

    #[test_case(1)]
    #[test_case(4)]
    #[test_case(128)]
    fn empty_input_estimates_one(trial_count: usize) {
        let sketch = FmSketch::new(trial_count).unwrap();
        assert_eq!(sketch.estimate(), 1);
    }

    #[test]
    fn zero_trials_is_rejected_before_hashing() {
        assert_eq!(
            FmSketch::new(0).unwrap_err(),
            EstimateError::InvalidTrialCount
        );

        let items = sample_items(3);
        assert_eq!(
            estimate_cardinality::<Sha256Oracle, _>(&items, 0).unwrap_err(),
            EstimateError::InvalidTrialCount
        );
        assert_eq!(
            estimate_cardinality_parallel::<Sha256Oracle, _>(&items, 0).unwrap_err(),
            EstimateError::InvalidTrialCount
        );
    }

    #[test]
    fn running_maximum_never_decreases() {
        let mut sketch = FmSketch::new(16).unwrap();
        let mut previous = sketch.max_rho.clone();
        for item in sample_items(200) {
            sketch.add(&item);
            for (prev, cur) in previous.iter().zip(sketch.max_rho.iter()) {
                assert!(cur >= prev);
            }
            previous = sketch.max_rho.clone();
        }
    }

    #[test]
    fn estimate_is_deterministic() {
        let items = sample_items(300);
        let first = estimate_cardinality::<Sha256Oracle, _>(&items, 64).unwrap();
        let second = estimate_cardinality::<Sha256Oracle, _>(&items, 64).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parallel_matches_sequential() {
        let items = sample_items(500);
        for &trial_count in &[1, 7, 64] {
            let sequential =
                estimate_cardinality::<Sha256Oracle, _>(&items, trial_count).unwrap();
            let parallel =
                estimate_cardinality_parallel::<Sha256Oracle, _>(&items, trial_count).unwrap();
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn duplicate_items_do_not_raise_the_estimate() {
        let distinct = sample_items(100);
        let mut repeated = distinct.clone();
        repeated.extend(distinct.iter().cloned());
        repeated.extend(distinct.iter().cloned());

        assert_eq!(
            estimate_cardinality::<Sha256Oracle, _>(&distinct, 64).unwrap(),
            estimate_cardinality::<Sha256Oracle, _>(&repeated, 64).unwrap()
        );
    }

    #[test_case(100)]
    #[test_case(500)]
    #[test_case(1000)]
    #[test_case(1500)]
    fn estimate_tracks_true_cardinality(n: usize) {
        let items = sample_items(n);
        let estimate = estimate_cardinality_parallel::<Sha256Oracle, _>(&items, 128).unwrap();

        // Per-trial estimates are quantized to powers of two and the
        // max-position statistic overshoots, so the corrected median lands
        // within a small constant factor of the truth rather than on it.
        let ratio = estimate as f64 / n as f64;
        assert!(
            (0.25..4.0).contains(&ratio),
            "n={n} estimate={estimate} ratio={ratio:.3}"
        );
    }

    #[test]
    fn estimate_grows_with_cardinality() {
        let small = estimate_cardinality::<Sha256Oracle, _>(&sample_items(100), 128).unwrap();
        let large = estimate_cardinality::<Sha256Oracle, _>(&sample_items(1500), 128).unwrap();
        assert!(large > small);
    }

    #[test]
    fn alternative_oracle_follows_the_same_contract() {
        let items = sample_items(400);
        let sequential = estimate_cardinality::<Xxh64Oracle, _>(&items, 64).unwrap();
        let parallel = estimate_cardinality_parallel::<Xxh64Oracle, _>(&items, 64).unwrap();
        assert_eq!(sequential, parallel);

        let ratio = sequential as f64 / 400.0;
        assert!((0.25..4.0).contains(&ratio), "estimate={sequential}");
    }
}
