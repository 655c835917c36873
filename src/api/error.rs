// ==========================================
// Flight Roster - API layer error types
// ==========================================
// Converts repository and engine errors into caller-facing errors.
// Conflicts stay distinguishable so clients can retry them.
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ===== Request validation =====
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    // ===== Business rules =====
    #[error("business rule violation: {0}")]
    BusinessRuleViolation(String),

    #[error("invalid state transition: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// A referenced resource id did not resolve during evaluation.
    #[error("unresolvable reference: {0}")]
    ResolutionError(String),

    // ===== Concurrency =====
    /// Retryable: another writer got there first.
    #[error("conflict: {0}")]
    Conflict(String),

    // ===== Data access =====
    #[error("persistence failure: {0}")]
    PersistenceError(String),

    // ===== Catch-all =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// RepositoryError conversion
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure { entity, id, expected } => {
                ApiError::Conflict(format!(
                    "{entity} {id} was modified concurrently (expected revision {expected})"
                ))
            }
            RepositoryError::VersionConflict { message } => ApiError::Conflict(message),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{entity} with id {id}"))
            }
            RepositoryError::LockError(msg) => {
                ApiError::PersistenceError(format!("lock acquisition failed: {msg}"))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::PersistenceError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("unique constraint violation: {msg}"))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("foreign key violation: {msg}"))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// EngineError conversion
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Resolution { entity, id } => {
                ApiError::ResolutionError(format!("{entity} with id {id}"))
            }
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::Repository(repo_err) => repo_err.into(),
            EngineError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result alias for the API layer.
pub type ApiResult<T> = Result<T, ApiError>;
