// ==========================================
// Flight Roster - domain type definitions
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Plan status
// ==========================================
// Transitions are forward-only: Draft -> Active -> Archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Draft,
    Active,
    Archived,
}

impl PlanStatus {
    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(&self, next: PlanStatus) -> bool {
        matches!(
            (self, next),
            (PlanStatus::Draft, PlanStatus::Active) | (PlanStatus::Active, PlanStatus::Archived)
        )
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Draft => write!(f, "DRAFT"),
            PlanStatus::Active => write!(f, "ACTIVE"),
            PlanStatus::Archived => write!(f, "ARCHIVED"),
        }
    }
}

// ==========================================
// Assignment status
// ==========================================
// PendingConfirm -> Scheduled -> Completed
// PendingConfirm/Scheduled -> Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    PendingConfirm,
    Scheduled,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn can_transition_to(&self, next: AssignmentStatus) -> bool {
        matches!(
            (self, next),
            (AssignmentStatus::PendingConfirm, AssignmentStatus::Scheduled)
                | (AssignmentStatus::Scheduled, AssignmentStatus::Completed)
                | (AssignmentStatus::PendingConfirm, AssignmentStatus::Cancelled)
                | (AssignmentStatus::Scheduled, AssignmentStatus::Cancelled)
        )
    }

    /// Terminal statuses can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    }

    /// Statuses that occupy their resources for double-booking purposes.
    pub fn occupies_resources(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::PendingConfirm | AssignmentStatus::Scheduled
        )
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::PendingConfirm => write!(f, "PENDING_CONFIRM"),
            AssignmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AssignmentStatus::Completed => write!(f, "COMPLETED"),
            AssignmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// Alternative status
// ==========================================
// Pending -> Accepted (terminal) | Pending -> Rejected (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlternativeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for AlternativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlternativeStatus::Pending => write!(f, "PENDING"),
            AlternativeStatus::Accepted => write!(f, "ACCEPTED"),
            AlternativeStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

// ==========================================
// Replanning trigger type
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    Weather,
    Notam,
    Availability,
    Aircraft,
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Weather => write!(f, "WEATHER"),
            TriggerType::Notam => write!(f, "NOTAM"),
            TriggerType::Availability => write!(f, "AVAILABILITY"),
            TriggerType::Aircraft => write!(f, "AIRCRAFT"),
        }
    }
}

// ==========================================
// Constraint type
// ==========================================
// Closed set: one feasibility evaluation produces exactly one
// ConstraintResult per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Availability,
    Qualifications,
    AircraftCapabilities,
    AirportPerformance,
    WeatherMinima,
    DutyRules,
    StudentPrerequisites,
}

impl ConstraintType {
    pub const ALL: [ConstraintType; 7] = [
        ConstraintType::Availability,
        ConstraintType::Qualifications,
        ConstraintType::AircraftCapabilities,
        ConstraintType::AirportPerformance,
        ConstraintType::WeatherMinima,
        ConstraintType::DutyRules,
        ConstraintType::StudentPrerequisites,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::Availability => "availability",
            ConstraintType::Qualifications => "qualifications",
            ConstraintType::AircraftCapabilities => "aircraft_capabilities",
            ConstraintType::AirportPerformance => "airport_performance",
            ConstraintType::WeatherMinima => "weather_minima",
            ConstraintType::DutyRules => "duty_rules",
            ConstraintType::StudentPrerequisites => "student_prerequisites",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Aircraft status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AircraftStatus {
    Available,
    Maintenance,
    Grounded,
}

impl AircraftStatus {
    pub fn is_schedulable(&self) -> bool {
        matches!(self, AircraftStatus::Available)
    }
}

impl fmt::Display for AircraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AircraftStatus::Available => write!(f, "AVAILABLE"),
            AircraftStatus::Maintenance => write!(f, "MAINTENANCE"),
            AircraftStatus::Grounded => write!(f, "GROUNDED"),
        }
    }
}

// ==========================================
// Availability block owner
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Instructor,
    Aircraft,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Instructor => write!(f, "INSTRUCTOR"),
            ResourceKind::Aircraft => write!(f, "AIRCRAFT"),
        }
    }
}
