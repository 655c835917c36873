// ==========================================
// Flight Roster - engine error types
// ==========================================
// Constraint failures are never errors here; they travel as
// ConstraintResult data. These variants cover unresolved references,
// bad input and plumbing failures.
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A referenced id does not resolve. Fatal for the single candidate
    /// being evaluated; batch solves skip the candidate instead of
    /// aborting.
    #[error("unresolved reference: {entity} with id={id}")]
    Resolution { entity: String, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn resolution(entity: &str, id: &str) -> Self {
        EngineError::Resolution {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, EngineError::Resolution { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
