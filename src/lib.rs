// ==========================================
// Flight Roster - core library
// ==========================================
// Roster-optimization engine for a flight-training academy: feasibility
// checking, multi-dimensional scoring, greedy + local-search solving and
// disruption replanning over a SQLite store. Decision support: every
// alternative waits for human accept/reject.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Engine layer - business rules
pub mod engine;

// Configuration layer - scheduling policy
pub mod config;

// Database infrastructure (connection init / unified PRAGMAs)
pub mod db;

// Logging
pub mod logging;

// API layer - business interface
pub mod api;

// ==========================================
// Core type re-exports
// ==========================================

pub use domain::types::{
    AircraftStatus, AlternativeStatus, AssignmentStatus, ConstraintType, PlanStatus,
    ResourceKind, TriggerType,
};

pub use domain::{
    AlternativeSolution, Assignment, CandidateAssignment, ConstraintResult, FeasibilityReport,
    ObjectiveWeights, Plan, ReplanningReport, ScoreBreakdown, ScoreResult, TimeSlot,
    TriggerRequest,
};

pub use engine::{
    ContextProvider, ContextSpec, EngineError, FeasibilityEngine, ReplanningMonitor,
    RosterEventPublisher, RosterSolution, RosterSolver, ScoringEngine, SolveContext,
    SolveRequest, StoreContextProvider,
};

pub use api::{ApiError, ApiResult, RosterApi, SolveOutcome};

pub use config::SchedulingPolicy;

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "flight-roster";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
