// ==========================================
// Flight Roster - scheduling policy
// ==========================================
// Operational knobs for the feasibility checker, scorer, solver and
// replanning monitor. Injected by the caller; defaults mirror academy
// standard operating procedure.
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingPolicy {
    /// When true, weather-minima failures demote from blocking to
    /// warning. The scorer keeps penalizing them via weather_fit.
    pub allow_weather_waiver: bool,

    /// Fallback daily duty cap for instructors without an explicit one.
    pub max_daily_duty_minutes: i64,

    /// Warn when a candidate pushes daily duty above this fraction of
    /// the cap.
    pub duty_warning_ratio: f64,

    /// Warn when an aircraft is within this many flight hours of its
    /// next maintenance.
    pub maintenance_warning_hours: f64,

    /// Warn when forecast confidence is below this value.
    pub min_weather_confidence: f64,

    /// Top-N alternatives kept per affected assignment during replanning.
    pub max_alternatives_per_assignment: usize,

    /// Wall-clock budget for the local-search improvement phase.
    pub phase2_time_budget_ms: u64,

    /// Local-search iteration cap when the solve request does not set one.
    pub default_max_iterations: u32,

    /// Target scheduled minutes per aircraft per day, used by the
    /// utilization score.
    pub target_utilization_minutes_per_day: f64,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            allow_weather_waiver: false,
            max_daily_duty_minutes: 480,
            duty_warning_ratio: 0.8,
            maintenance_warning_hours: 10.0,
            min_weather_confidence: 0.5,
            max_alternatives_per_assignment: 3,
            phase2_time_budget_ms: 45_000,
            default_max_iterations: 1_000,
            target_utilization_minutes_per_day: 240.0,
        }
    }
}
