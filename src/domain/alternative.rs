// ==========================================
// Flight Roster - replanning alternatives
// ==========================================

use crate::domain::assignment::CandidateAssignment;
use crate::domain::score::ScoreBreakdown;
use crate::domain::types::{AlternativeStatus, TriggerType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// TriggerRequest - an external disruption signal
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub trigger_type: TriggerType,
    pub trigger_details: String,
    /// Airport ICAO for weather/notam, instructor id for availability,
    /// aircraft id for aircraft triggers.
    pub affected_entity_id: Option<String>,
    /// When absent, every non-terminal future assignment matching the
    /// trigger entity is considered affected.
    pub timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

// ==========================================
// AlternativeSolution - a ranked replacement proposal for review
// ==========================================
// Lifecycle: Pending -> Accepted (terminal, at most one per original
// assignment) or Pending -> Rejected (terminal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeSolution {
    pub alternative_id: String,
    pub original_assignment_id: String,
    pub trigger_type: TriggerType,
    pub trigger_details: String,
    pub alternative_assignment: CandidateAssignment,
    pub score_breakdown: ScoreBreakdown,
    pub total_score: f64,
    pub status: AlternativeStatus,
    pub generated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl AlternativeSolution {
    pub fn pending(
        original_assignment_id: impl Into<String>,
        trigger_type: TriggerType,
        trigger_details: impl Into<String>,
        alternative_assignment: CandidateAssignment,
        score_breakdown: ScoreBreakdown,
        total_score: f64,
    ) -> Self {
        Self {
            alternative_id: Uuid::new_v4().to_string(),
            original_assignment_id: original_assignment_id.into(),
            trigger_type,
            trigger_details: trigger_details.into(),
            alternative_assignment,
            score_breakdown,
            total_score,
            status: AlternativeStatus::Pending,
            generated_at: Utc::now(),
            decided_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == AlternativeStatus::Pending
    }
}

// ==========================================
// ReplanningReport - outcome of one trigger
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplanningReport {
    pub alternatives_generated: usize,
    pub affected_assignments: usize,
    /// Affected assignment ids for which no feasible replacement existed.
    pub no_alternative_for: Vec<String>,
}
