// ==========================================
// Flight Roster - engine layer
// ==========================================
// Business rules live here, never SQL. Feasibility and scoring are
// pure over a prefetched context snapshot; the solver and replanning
// monitor orchestrate them.
// ==========================================

pub mod context;
pub mod error;
pub mod events;
pub mod feasibility;
pub mod replanning;
pub mod scoring;
pub mod solver;

pub use context::{ContextProvider, ContextSpec, SolveContext, StoreContextProvider};
pub use error::{EngineError, EngineResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, RosterEvent, RosterEventPublisher,
    RosterEventType,
};
pub use feasibility::FeasibilityEngine;
pub use replanning::ReplanningMonitor;
pub use scoring::ScoringEngine;
pub use solver::{EvaluatedAssignment, RosterSolution, RosterSolver, SolveRequest};
