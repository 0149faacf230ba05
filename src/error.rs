use thiserror::Error;

/// Errors surfaced by the estimation entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EstimateError {
    /// The median selection indexes into the per-trial estimates, which is
    /// undefined for an empty set of trials.
    #[error("trial count must be at least 1")]
    InvalidTrialCount,
}
