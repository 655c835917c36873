// ==========================================
// Flight Roster - plan domain model
// ==========================================

use crate::domain::types::PlanStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ObjectiveWeights - relative importance of the six scoring dimensions
// ==========================================
// Weights SHOULD sum to 1.0 but this is not enforced; they are
// interpreted as relative importance and never re-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub weather_fit: f64,
    pub instructor_balance: f64,
    pub travel_min: f64,
    pub aircraft_utilization: f64,
    pub student_continuity: f64,
    pub cancellation_risk: f64,
}

impl ObjectiveWeights {
    /// All weights must be non-negative. Returns the offending field name
    /// on failure so callers can produce an explicit message.
    pub fn validate(&self) -> Result<(), &'static str> {
        let fields = [
            ("weather_fit", self.weather_fit),
            ("instructor_balance", self.instructor_balance),
            ("travel_min", self.travel_min),
            ("aircraft_utilization", self.aircraft_utilization),
            ("student_continuity", self.student_continuity),
            ("cancellation_risk", self.cancellation_risk),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(name);
            }
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.weather_fit
            + self.instructor_balance
            + self.travel_min
            + self.aircraft_utilization
            + self.student_continuity
            + self.cancellation_risk
    }
}

impl Default for ObjectiveWeights {
    /// Even split across the six dimensions.
    fn default() -> Self {
        let w = 1.0 / 6.0;
        Self {
            weather_fit: w,
            instructor_balance: w,
            travel_min: w,
            aircraft_utilization: w,
            student_continuity: w,
            cancellation_risk: w,
        }
    }
}

// ==========================================
// Plan - a scheduling horizon with objective weights
// ==========================================
// Weights are immutable after creation; status moves forward only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub plan_name: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub status: PlanStatus,
    pub objective_weights: ObjectiveWeights,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        plan_id: impl Into<String>,
        plan_name: impl Into<String>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        objective_weights: ObjectiveWeights,
        created_by: impl Into<String>,
    ) -> Result<Self, String> {
        if period_end <= period_start {
            return Err(format!(
                "period_end {} must be after period_start {}",
                period_end, period_start
            ));
        }
        if let Err(field) = objective_weights.validate() {
            return Err(format!("objective weight '{}' must be non-negative", field));
        }
        let now = Utc::now();
        Ok(Self {
            plan_id: plan_id.into(),
            plan_name: plan_name.into(),
            period_start,
            period_end,
            status: PlanStatus::Draft,
            objective_weights,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_draft(&self) -> bool {
        self.status == PlanStatus::Draft
    }

    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    pub fn is_archived(&self) -> bool {
        self.status == PlanStatus::Archived
    }
}
