// ==========================================
// Flight Roster - configuration layer
// ==========================================

pub mod policy;

pub use policy::SchedulingPolicy;
