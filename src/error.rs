//! Error taxonomy shared by every core operation.
//!
//! The first four variants always surface to the caller of the mutating
//! operation. `Unavailable` from the chain layer is recovered locally
//! (cache fallback or log-and-continue); `Unavailable` from the store is
//! surfaced because there is nothing to fall back to.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Actor, proof, or request does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate natural key (proof id, request id, wallet/DID).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transition attempted from a non-eligible state. Retried clients use
    /// this to tell a benign race from a real mistake, so it must never be
    /// collapsed into `NotFound`.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Out-of-range score impact, malformed identifier, bad filter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Downstream chain gateway or store unreachable.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        CoreError::NotFound(format!("{} {}", kind, id))
    }

    pub fn conflict(kind: &str, id: &str) -> Self {
        CoreError::Conflict(format!("{} {} already exists", kind, id))
    }
}
