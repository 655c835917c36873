// ==========================================
// Flight Roster - domain model layer
// ==========================================
// Entities, value types and state machines only; no data access, no
// engine logic.
// ==========================================

pub mod alternative;
pub mod assignment;
pub mod feasibility;
pub mod plan;
pub mod resources;
pub mod score;
pub mod types;

// Re-export core types
pub use alternative::{AlternativeSolution, ReplanningReport, TriggerRequest};
pub use assignment::{Assignment, CandidateAssignment, TimeSlot};
pub use feasibility::{ConstraintResult, FeasibilityReport};
pub use plan::{ObjectiveWeights, Plan};
pub use resources::{
    Aircraft, Airport, AvailabilityBlock, Instructor, Lesson, Student, WeatherMinima,
    WeatherSnapshot,
};
pub use score::{ScoreBreakdown, ScoreResult};
pub use types::{
    AircraftStatus, AlternativeStatus, AssignmentStatus, ConstraintType, PlanStatus, ResourceKind,
    TriggerType,
};
