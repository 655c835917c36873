// ==========================================
// Flight Roster - engine event publishing
// ==========================================
// The engine defines the publisher trait; outer layers (notification
// fan-out, audit sinks) implement adapters. Keeps the engine free of
// downstream dependencies.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// Event types
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterEventType {
    /// A solve produced and committed a new set of assignments.
    SolutionCommitted,
    /// A disruption trigger was received and the affected set resolved.
    ReplanningTriggered,
    /// Replanning generated alternatives for disrupted assignments.
    AlternativesGenerated,
    /// An alternative was accepted and applied to its assignment.
    AlternativeAccepted,
    /// An alternative was rejected by a reviewer.
    AlternativeRejected,
    /// Replanning could not produce any alternative for an assignment.
    NoAlternativeFound,
    /// An assignment changed status outside the alternatives workflow.
    AssignmentStatusChanged,
}

impl RosterEventType {
    pub fn as_str(&self) -> &str {
        match self {
            RosterEventType::SolutionCommitted => "SolutionCommitted",
            RosterEventType::ReplanningTriggered => "ReplanningTriggered",
            RosterEventType::AlternativesGenerated => "AlternativesGenerated",
            RosterEventType::AlternativeAccepted => "AlternativeAccepted",
            RosterEventType::AlternativeRejected => "AlternativeRejected",
            RosterEventType::NoAlternativeFound => "NoAlternativeFound",
            RosterEventType::AssignmentStatusChanged => "AssignmentStatusChanged",
        }
    }
}

/// Event carried to downstream adapters. `affected_assignment_ids`
/// of None means plan-wide scope; `plan_id` of None means cross-plan
/// scope (disruption triggers resolve assignments across plans).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEvent {
    pub plan_id: Option<String>,
    pub event_type: RosterEventType,
    pub source: Option<String>,
    pub affected_assignment_ids: Option<Vec<String>>,
    pub occurred_at: DateTime<Utc>,
}

impl RosterEvent {
    pub fn plan_wide(plan_id: impl Into<String>, event_type: RosterEventType, source: Option<String>) -> Self {
        Self {
            plan_id: Some(plan_id.into()),
            event_type,
            source,
            affected_assignment_ids: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn scoped(
        plan_id: impl Into<String>,
        event_type: RosterEventType,
        source: Option<String>,
        assignment_ids: Vec<String>,
    ) -> Self {
        Self {
            plan_id: Some(plan_id.into()),
            event_type,
            source,
            affected_assignment_ids: Some(assignment_ids),
            occurred_at: Utc::now(),
        }
    }

    /// Event not tied to any single plan, carrying the resolved
    /// assignment ids (possibly empty).
    pub fn cross_plan(
        event_type: RosterEventType,
        source: Option<String>,
        assignment_ids: Vec<String>,
    ) -> Self {
        Self {
            plan_id: None,
            event_type,
            source,
            affected_assignment_ids: Some(assignment_ids),
            occurred_at: Utc::now(),
        }
    }
}

// ==========================================
// Publisher trait
// ==========================================

/// Implemented by outer layers; the engine only knows the trait.
/// Returns a sink-specific receipt id, or an empty string when the
/// sink has none.
pub trait RosterEventPublisher: Send + Sync {
    fn publish(&self, event: RosterEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Publisher that drops everything. Unit-test and standalone use.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl RosterEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: RosterEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: dropping event - plan_id={}, event_type={}",
            event.plan_id.as_deref().unwrap_or("-"),
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// Wrapper that makes Option<Arc<dyn RosterEventPublisher>> ergonomic.
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn RosterEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn RosterEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: RosterEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: no publisher configured, skipping - plan_id={}, event_type={}",
                    event.plan_id.as_deref().unwrap_or("-"),
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
