use thiserror::Error;

/// Errors surfaced by engine construction, re-configuration and the
/// cross-validation helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Luxury level outside the table, skip distance the engine cannot
    /// honour, or an unsupported lane width.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The SWB and LCG representations of the same stream diverged.
    #[error("state mismatch after {step} advances: {detail}")]
    StateMismatch { step: u64, detail: String },

    /// A 25-word classical state vector that no generator can produce.
    #[error("invalid state vector: {0}")]
    InvalidStateVector(String),
}

pub type Result<T> = std::result::Result<T, Error>;
