pub mod error;
pub mod estimator;
pub mod oracle;

pub use error::EstimateError;
pub use estimator::FmSketch;
pub use estimator::estimate_cardinality;
pub use estimator::estimate_cardinality_parallel;
pub use estimator::rightmost_set_bit;
pub use oracle::Sha256Oracle;
pub use oracle::TrialHash;
pub use oracle::Xxh64Oracle;
