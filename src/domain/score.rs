// ==========================================
// Flight Roster - scoring records
// ==========================================

use crate::domain::plan::ObjectiveWeights;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ScoreBreakdown - six dimension scores, each in [0, 1]
// ==========================================
// Fixed-field record rather than an open map: the six dimensions are a
// closed set mirroring ObjectiveWeights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub weather_fit: f64,
    pub instructor_balance: f64,
    pub travel_min: f64,
    pub aircraft_utilization: f64,
    pub student_continuity: f64,
    pub cancellation_risk: f64,
}

impl ScoreBreakdown {
    /// Weighted sum over the six dimensions. No re-normalization is
    /// applied when the weights do not sum to 1; callers own weight
    /// hygiene.
    pub fn weighted_total(&self, weights: &ObjectiveWeights) -> f64 {
        weights.weather_fit * self.weather_fit
            + weights.instructor_balance * self.instructor_balance
            + weights.travel_min * self.travel_min
            + weights.aircraft_utilization * self.aircraft_utilization
            + weights.student_continuity * self.student_continuity
            + weights.cancellation_risk * self.cancellation_risk
    }

    /// Every dimension inside [0, 1].
    pub fn in_bounds(&self) -> bool {
        [
            self.weather_fit,
            self.instructor_balance,
            self.travel_min,
            self.aircraft_utilization,
            self.student_continuity,
            self.cancellation_risk,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}

// ==========================================
// ScoreResult - breakdown plus its weighted total
// ==========================================
// Ephemeral unless attached to a persisted Assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    pub computed_at: DateTime<Utc>,
}

impl ScoreResult {
    pub fn new(breakdown: ScoreBreakdown, weights: &ObjectiveWeights) -> Self {
        Self {
            total_score: breakdown.weighted_total(weights),
            breakdown,
            computed_at: Utc::now(),
        }
    }
}
