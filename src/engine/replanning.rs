// ==========================================
// Flight Roster - replanning monitor
// ==========================================
// Reacts to a disruption trigger: for each affected assignment,
// generates replacement candidates (different instructor, different
// aircraft, shifted time window), evaluates them exactly as the solver
// evaluates a single candidate, and keeps the top ranked ones as
// pending alternatives for human review. Publishes an event per
// affected assignment so reviewers get prompted.
// ==========================================

use crate::config::SchedulingPolicy;
use crate::domain::alternative::{AlternativeSolution, ReplanningReport, TriggerRequest};
use crate::domain::assignment::{Assignment, CandidateAssignment};
use crate::domain::plan::ObjectiveWeights;
use crate::engine::context::SolveContext;
use crate::engine::error::EngineResult;
use crate::engine::events::{OptionalEventPublisher, RosterEvent, RosterEventType};
use crate::engine::feasibility::FeasibilityEngine;
use crate::engine::scoring::ScoringEngine;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Time shifts tried for each affected assignment, in addition to
/// instructor and aircraft substitutions.
const SHIFT_HOURS: [i64; 4] = [1, 2, 3, 24];

pub struct ReplanningMonitor {
    feasibility: FeasibilityEngine,
    scoring: ScoringEngine,
    policy: Arc<SchedulingPolicy>,
    events: OptionalEventPublisher,
}

impl ReplanningMonitor {
    pub fn new(policy: Arc<SchedulingPolicy>, events: OptionalEventPublisher) -> Self {
        Self {
            feasibility: FeasibilityEngine::new(policy.clone()),
            scoring: ScoringEngine::new(policy.clone()),
            policy,
            events,
        }
    }

    /// Generate ranked alternatives for every affected assignment.
    /// Callers resolve the affected set from the store and persist the
    /// returned alternatives; nothing is written here.
    #[instrument(skip(self, trigger, affected, ctx, weights), fields(trigger_type = %trigger.trigger_type))]
    pub fn generate_alternatives(
        &self,
        trigger: &TriggerRequest,
        affected: &[Assignment],
        ctx: &SolveContext,
        weights: &ObjectiveWeights,
    ) -> EngineResult<(Vec<AlternativeSolution>, ReplanningReport)> {
        let mut alternatives: Vec<AlternativeSolution> = Vec::new();
        let mut no_alternative_for: Vec<String> = Vec::new();

        for assignment in affected {
            let ranked = self.alternatives_for(assignment, trigger, ctx, weights)?;
            if ranked.is_empty() {
                warn!(
                    assignment_id = %assignment.assignment_id,
                    "no feasible alternative found"
                );
                no_alternative_for.push(assignment.assignment_id.clone());
                self.publish(
                    assignment,
                    RosterEventType::NoAlternativeFound,
                    vec![assignment.assignment_id.clone()],
                );
            } else {
                self.publish(
                    assignment,
                    RosterEventType::AlternativesGenerated,
                    vec![assignment.assignment_id.clone()],
                );
                alternatives.extend(ranked);
            }
        }

        let report = ReplanningReport {
            alternatives_generated: alternatives.len(),
            affected_assignments: affected.len(),
            no_alternative_for,
        };
        info!(
            alternatives = report.alternatives_generated,
            affected = report.affected_assignments,
            without_alternative = report.no_alternative_for.len(),
            "replanning finished"
        );
        Ok((alternatives, report))
    }

    /// Candidate variants for one assignment, evaluated and ranked,
    /// truncated to the policy's per-assignment cap.
    fn alternatives_for(
        &self,
        assignment: &Assignment,
        trigger: &TriggerRequest,
        ctx: &SolveContext,
        weights: &ObjectiveWeights,
    ) -> EngineResult<Vec<AlternativeSolution>> {
        let original = assignment.as_candidate();
        let mut evaluated: Vec<(CandidateAssignment, crate::domain::ScoreBreakdown, f64)> =
            Vec::new();

        for variant in self.variants(&original, ctx) {
            match self.feasibility.check(
                &variant,
                ctx,
                &[],
                Some(assignment.assignment_id.as_str()),
            ) {
                Ok(proof) if proof.feasible => {
                    let breakdown = self.scoring.breakdown(&variant, ctx, &[])?;
                    evaluated.push((variant, breakdown, breakdown.weighted_total(weights)));
                }
                Ok(_) => {}
                Err(e) if e.is_resolution() => {
                    debug!(error = %e, "skipping unresolvable variant");
                }
                Err(e) => return Err(e),
            }
        }

        // rank by score, stable within equal scores
        evaluated.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        evaluated.truncate(self.policy.max_alternatives_per_assignment);

        Ok(evaluated
            .into_iter()
            .map(|(candidate, breakdown, total_score)| {
                AlternativeSolution::pending(
                    assignment.assignment_id.clone(),
                    trigger.trigger_type,
                    trigger.trigger_details.clone(),
                    candidate,
                    breakdown,
                    total_score,
                )
            })
            .collect())
    }

    /// Variant enumeration: every other instructor, every other
    /// schedulable aircraft, and the fixed set of time shifts. The
    /// unmodified original is excluded; replanning exists because it
    /// stopped being viable.
    fn variants(
        &self,
        original: &CandidateAssignment,
        ctx: &SolveContext,
    ) -> Vec<CandidateAssignment> {
        let mut variants: Vec<CandidateAssignment> = Vec::new();

        let mut instructor_ids: Vec<&String> = ctx.instructors.keys().collect();
        instructor_ids.sort();
        for instructor_id in instructor_ids {
            if *instructor_id != original.instructor_id {
                let mut v = original.clone();
                v.instructor_id = instructor_id.clone();
                variants.push(v);
            }
        }

        let mut aircraft_ids: Vec<&String> = ctx
            .aircraft
            .values()
            .filter(|a| a.status.is_schedulable())
            .map(|a| &a.aircraft_id)
            .collect();
        aircraft_ids.sort();
        for aircraft_id in aircraft_ids {
            if *aircraft_id != original.aircraft_id {
                let mut v = original.clone();
                v.aircraft_id = aircraft_id.clone();
                variants.push(v);
            }
        }

        for hours in SHIFT_HOURS {
            let shift = Duration::hours(hours);
            let mut v = original.clone();
            v.start_at += shift;
            v.end_at += shift;
            variants.push(v);
        }

        variants
    }

    fn publish(&self, assignment: &Assignment, event_type: RosterEventType, ids: Vec<String>) {
        let event = RosterEvent::scoped(
            assignment.plan_id.clone(),
            event_type,
            Some("ReplanningMonitor".to_string()),
            ids,
        );
        if let Err(e) = self.events.publish(event) {
            // notification failure must not fail the replanning run
            warn!(error = %e, "event publish failed");
        }
    }
}
