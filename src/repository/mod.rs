// ==========================================
// Flight Roster - data repository layer
// ==========================================
// Data access only; no business logic. All queries are parameterized.
// ==========================================

pub mod alternative_repo;
pub mod assignment_repo;
pub mod environment_repo;
pub mod error;
pub mod plan_repo;
pub mod resource_repo;

// Re-export core repositories
pub use alternative_repo::AlternativeRepository;
pub use assignment_repo::AssignmentRepository;
pub use environment_repo::EnvironmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use plan_repo::PlanRepository;
pub use resource_repo::ResourceRepository;
