// ==========================================
// Flight Roster - API layer
// ==========================================
// Call surface for thin endpoint handlers.
// ==========================================

pub mod error;
pub mod roster_api;

pub use error::{ApiError, ApiResult};
pub use roster_api::{CreatePlanRequest, RosterApi, SolveOutcome};
