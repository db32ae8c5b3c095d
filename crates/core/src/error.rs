//! Domain error model.

use thiserror::Error;

/// Result type used across the domain crates.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures of the sync domain.
///
/// Transport, storage and payload decoding failures are infra errors and
/// wrap this one, never the other way round.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A record the sync depends on does not exist (stock item, link, ...).
    #[error("not found: {0}")]
    NotFound(String),

    /// A quantity or amount left the representable range.
    #[error("arithmetic overflow in {0}")]
    Overflow(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn overflow(what: impl Into<String>) -> Self {
        Self::Overflow(what.into())
    }
}
