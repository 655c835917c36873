// ==========================================
// Flight Roster - assignment domain model
// ==========================================
// An Assignment is one training sortie: student + instructor + aircraft
// + optional lesson + airport + half-open time window.
// ==========================================

use crate::domain::feasibility::FeasibilityReport;
use crate::domain::score::ScoreBreakdown;
use crate::domain::types::AssignmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// CandidateAssignment - an uncommitted pairing under evaluation
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssignment {
    pub student_id: String,
    pub instructor_id: String,
    pub aircraft_id: String,
    pub lesson_id: Option<String>,
    pub airport_icao: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl CandidateAssignment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_at - self.start_at).num_minutes()
    }

    /// Half-open interval overlap: [a.start, a.end) ∩ [b.start, b.end) ≠ ∅.
    pub fn overlaps(&self, other_start: DateTime<Utc>, other_end: DateTime<Utc>) -> bool {
        self.start_at < other_end && other_start < self.end_at
    }
}

// ==========================================
// Assignment - a persisted sortie owned by a Plan
// ==========================================
// feasibility_proof and score_breakdown are immutable audit attachments
// captured when the record was created; status and resource fields are
// the only mutable parts (resource fields change only via an accepted
// replanning alternative).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: String,
    pub plan_id: String,
    pub student_id: String,
    pub instructor_id: String,
    pub aircraft_id: String,
    pub lesson_id: Option<String>,
    pub airport_icao: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub feasibility_proof: FeasibilityReport,
    pub score_breakdown: ScoreBreakdown,
    pub total_score: f64,
    /// Optimistic-lock revision, bumped on every update.
    pub revision: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    /// Materialize a candidate selected by the solver, carrying its proof
    /// and score at selection time.
    pub fn from_candidate(
        plan_id: impl Into<String>,
        candidate: &CandidateAssignment,
        proof: FeasibilityReport,
        breakdown: ScoreBreakdown,
        total_score: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            assignment_id: Uuid::new_v4().to_string(),
            plan_id: plan_id.into(),
            student_id: candidate.student_id.clone(),
            instructor_id: candidate.instructor_id.clone(),
            aircraft_id: candidate.aircraft_id.clone(),
            lesson_id: candidate.lesson_id.clone(),
            airport_icao: candidate.airport_icao.clone(),
            start_at: candidate.start_at,
            end_at: candidate.end_at,
            status: AssignmentStatus::PendingConfirm,
            feasibility_proof: proof,
            score_breakdown: breakdown,
            total_score,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// View of this assignment as a candidate, for re-evaluation during
    /// local search and replanning.
    pub fn as_candidate(&self) -> CandidateAssignment {
        CandidateAssignment {
            student_id: self.student_id.clone(),
            instructor_id: self.instructor_id.clone(),
            aircraft_id: self.aircraft_id.clone(),
            lesson_id: self.lesson_id.clone(),
            airport_icao: self.airport_icao.clone(),
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_at - self.start_at).num_minutes()
    }
}

// ==========================================
// TimeSlot - a candidate scheduling window offered to the solver
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub airport_icao: String,
}

impl TimeSlot {
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>, airport_icao: impl Into<String>) -> Self {
        Self {
            start_at,
            end_at,
            airport_icao: airport_icao.into(),
        }
    }
}
