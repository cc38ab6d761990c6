//! Caller-visible error taxonomy.
//!
//! Only validation, not-found, and invalid-state errors ever reach a caller;
//! directory failures and per-record infrastructure errors are absorbed into
//! execution logs and record state by the engine and poller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected synchronously at create/update; never enters the store.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing record, or a record owned by another tenant. Tenant mismatch
    /// is reported as not-found so existence never leaks across tenants.
    #[error("scheduled action not found")]
    NotFound,

    /// The record exists in the caller's tenant but is not in a state that
    /// permits the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Storage failure (pool, SQL, serialization of persisted JSON).
    #[error("storage error: {0}")]
    Storage(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for EngineError {
    fn from(e: r2d2::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
