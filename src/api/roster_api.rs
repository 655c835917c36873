// ==========================================
// Flight Roster - roster API facade
// ==========================================
// The call surface thin endpoint handlers invoke. Owns the wiring of
// repositories, context provider, solver and replanning monitor, and
// the atomic-commit semantics around solve results.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::SchedulingPolicy;
use crate::domain::alternative::{AlternativeSolution, ReplanningReport, TriggerRequest};
use crate::domain::assignment::{Assignment, CandidateAssignment, TimeSlot};
use crate::domain::plan::{ObjectiveWeights, Plan};
use crate::domain::types::{AssignmentStatus, PlanStatus, TriggerType};
use crate::engine::context::{ContextProvider, ContextSpec, StoreContextProvider};
use crate::engine::events::{
    OptionalEventPublisher, RosterEvent, RosterEventPublisher, RosterEventType,
};
use crate::engine::feasibility::FeasibilityEngine;
use crate::engine::replanning::ReplanningMonitor;
use crate::engine::scoring::ScoringEngine;
use crate::engine::solver::{RosterSolver, SolveRequest};
use crate::domain::feasibility::FeasibilityReport;
use crate::domain::score::ScoreResult;
use crate::repository::alternative_repo::AlternativeRepository;
use crate::repository::assignment_repo::AssignmentRepository;
use crate::repository::environment_repo::EnvironmentRepository;
use crate::repository::plan_repo::PlanRepository;
use crate::repository::resource_repo::ResourceRepository;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// Request / response DTOs
// ==========================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    pub plan_name: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub objective_weights: ObjectiveWeights,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveOutcome {
    pub success: bool,
    pub assignments_created: usize,
    pub average_score: f64,
    pub total_iterations: u64,
    pub execution_time_ms: u64,
    pub unassigned_students: Vec<String>,
}

// ==========================================
// RosterApi
// ==========================================

pub struct RosterApi {
    plans: Arc<PlanRepository>,
    assignments: Arc<AssignmentRepository>,
    alternatives: Arc<AlternativeRepository>,
    provider: StoreContextProvider,
    solver: RosterSolver,
    monitor: ReplanningMonitor,
    feasibility: FeasibilityEngine,
    scoring: ScoringEngine,
    events: OptionalEventPublisher,
}

impl RosterApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        policy: Arc<SchedulingPolicy>,
        publisher: Option<Arc<dyn RosterEventPublisher>>,
    ) -> Self {
        let resources = Arc::new(ResourceRepository::new(conn.clone()));
        let environment = Arc::new(EnvironmentRepository::new(conn.clone()));
        let assignments = Arc::new(AssignmentRepository::new(conn.clone()));
        let monitor_events = match &publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p.clone()),
            None => OptionalEventPublisher::none(),
        };
        let events = match publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };
        Self {
            plans: Arc::new(PlanRepository::new(conn.clone())),
            alternatives: Arc::new(AlternativeRepository::new(conn)),
            provider: StoreContextProvider::new(resources, environment, assignments.clone()),
            assignments,
            solver: RosterSolver::new(policy.clone()),
            monitor: ReplanningMonitor::new(policy.clone(), monitor_events),
            feasibility: FeasibilityEngine::new(policy.clone()),
            scoring: ScoringEngine::new(policy),
            events,
        }
    }

    // ==========================================
    // Plans
    // ==========================================

    #[instrument(skip(self, request), fields(plan_name = %request.plan_name))]
    pub async fn create_plan(&self, request: CreatePlanRequest) -> ApiResult<Plan> {
        let plan = Plan::new(
            Uuid::new_v4().to_string(),
            request.plan_name,
            request.period_start,
            request.period_end,
            request.objective_weights,
            request.created_by,
        )
        .map_err(ApiError::InvalidInput)?;
        self.plans.create(&plan)?;
        info!(plan_id = %plan.plan_id, "plan created");
        Ok(plan)
    }

    pub async fn get_plan(&self, plan_id: &str) -> ApiResult<Plan> {
        self.plans
            .find_by_id(plan_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Plan with id {plan_id}")))
    }

    pub async fn list_plans(&self) -> ApiResult<Vec<Plan>> {
        Ok(self.plans.list_all()?)
    }

    #[instrument(skip(self))]
    pub async fn update_plan_status(&self, plan_id: &str, next: PlanStatus) -> ApiResult<()> {
        self.plans.update_status(plan_id, next)?;
        Ok(())
    }

    /// Move one assignment through its lifecycle (confirm, complete,
    /// cancel). `expected_revision` guards against concurrent edits;
    /// a mismatch surfaces as a retryable conflict.
    #[instrument(skip(self))]
    pub async fn update_assignment_status(
        &self,
        assignment_id: &str,
        next: AssignmentStatus,
        expected_revision: i32,
    ) -> ApiResult<()> {
        self.assignments
            .update_status(assignment_id, next, expected_revision)?;
        if let Some(assignment) = self.assignments.find_by_id(assignment_id)? {
            self.publish(RosterEvent::scoped(
                assignment.plan_id,
                RosterEventType::AssignmentStatusChanged,
                Some("RosterApi".to_string()),
                vec![assignment_id.to_string()],
            ));
        }
        Ok(())
    }

    // ==========================================
    // Single-candidate evaluation
    // ==========================================

    #[instrument(skip(self, candidate), fields(student_id = %candidate.student_id))]
    pub async fn check_feasibility(
        &self,
        candidate: &CandidateAssignment,
    ) -> ApiResult<FeasibilityReport> {
        let mut ctx = self
            .provider
            .build_context(&candidate_spec(candidate))
            .await?;
        if let Some(lesson_id) = &candidate.lesson_id {
            self.provider.load_lesson(&mut ctx, lesson_id)?;
        }
        Ok(self.feasibility.check(candidate, &ctx, &[], None)?)
    }

    #[instrument(skip(self, candidate), fields(student_id = %candidate.student_id))]
    pub async fn score_assignment(
        &self,
        candidate: &CandidateAssignment,
        plan_id: &str,
    ) -> ApiResult<ScoreResult> {
        let plan = self.get_plan(plan_id).await?;
        let mut ctx = self
            .provider
            .build_context(&candidate_spec(candidate))
            .await?;
        if let Some(lesson_id) = &candidate.lesson_id {
            self.provider.load_lesson(&mut ctx, lesson_id)?;
        }
        Ok(self
            .scoring
            .score(candidate, &ctx, &[], &plan.objective_weights)?)
    }

    // ==========================================
    // Solve
    // ==========================================

    pub async fn solve(&self, request: SolveRequest) -> ApiResult<SolveOutcome> {
        self.solve_with_cancellation(request, None).await
    }

    /// Full two-phase solve, committed atomically. Nothing persists if
    /// the batch write fails; callers may retry the whole solve.
    #[instrument(skip(self, request, cancel), fields(plan_id = %request.plan_id))]
    pub async fn solve_with_cancellation(
        &self,
        request: SolveRequest,
        cancel: Option<Arc<AtomicBool>>,
    ) -> ApiResult<SolveOutcome> {
        let plan = self.get_plan(&request.plan_id).await?;
        if plan.is_archived() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "plan {} is archived",
                plan.plan_id
            )));
        }

        let spec = solve_spec(&plan, &request);
        let ctx = Arc::new(self.provider.build_context(&spec).await?);
        let solution = self
            .solver
            .solve_with_cancellation(&plan, &request, ctx, cancel)
            .await?;

        let records: Vec<Assignment> = solution
            .assignments
            .iter()
            .map(|e| {
                Assignment::from_candidate(
                    plan.plan_id.clone(),
                    &e.candidate,
                    e.proof.clone(),
                    e.breakdown,
                    e.total_score,
                )
            })
            .collect();
        let created = self.assignments.insert_batch(&records)?;

        if created > 0 {
            self.publish(RosterEvent::scoped(
                plan.plan_id.clone(),
                RosterEventType::SolutionCommitted,
                Some("RosterApi".to_string()),
                records.iter().map(|a| a.assignment_id.clone()).collect(),
            ));
        }

        info!(
            created,
            unassigned = solution.unassigned_students.len(),
            "solve committed"
        );
        Ok(SolveOutcome {
            success: true,
            assignments_created: created,
            average_score: solution.average_score(),
            total_iterations: solution.total_iterations,
            execution_time_ms: solution.execution_time_ms,
            unassigned_students: solution.unassigned_students,
        })
    }

    // ==========================================
    // Replanning
    // ==========================================

    /// Resolve the affected assignments for a disruption trigger,
    /// generate ranked alternatives and persist them as pending.
    #[instrument(skip(self, trigger), fields(trigger_type = %trigger.trigger_type))]
    pub async fn trigger_replanning(&self, trigger: TriggerRequest) -> ApiResult<ReplanningReport> {
        let affected = self.resolve_affected(&trigger)?;
        // announce the trigger itself, even when nothing resolved
        self.publish(RosterEvent::cross_plan(
            RosterEventType::ReplanningTriggered,
            Some("RosterApi".to_string()),
            affected.iter().map(|a| a.assignment_id.clone()).collect(),
        ));
        if affected.is_empty() {
            return Ok(ReplanningReport {
                alternatives_generated: 0,
                affected_assignments: 0,
                no_alternative_for: Vec::new(),
            });
        }

        // affected assignments may span plans; weights are per plan
        let mut by_plan: BTreeMap<String, Vec<Assignment>> = BTreeMap::new();
        for assignment in affected {
            by_plan
                .entry(assignment.plan_id.clone())
                .or_default()
                .push(assignment);
        }

        let mut merged = ReplanningReport {
            alternatives_generated: 0,
            affected_assignments: 0,
            no_alternative_for: Vec::new(),
        };
        for (plan_id, group) in by_plan {
            let plan = self.get_plan(&plan_id).await?;
            let mut ctx = self
                .provider
                .build_context(&replanning_spec(&group))
                .await?;
            for assignment in &group {
                if let Some(lesson_id) = &assignment.lesson_id {
                    self.provider.load_lesson(&mut ctx, lesson_id)?;
                }
            }
            let (alternatives, report) = self.monitor.generate_alternatives(
                &trigger,
                &group,
                &ctx,
                &plan.objective_weights,
            )?;
            for alternative in &alternatives {
                self.alternatives.insert(alternative)?;
            }
            merged.alternatives_generated += report.alternatives_generated;
            merged.affected_assignments += report.affected_assignments;
            merged.no_alternative_for.extend(report.no_alternative_for);
        }
        info!(
            affected = merged.affected_assignments,
            alternatives = merged.alternatives_generated,
            "replanning trigger handled"
        );
        Ok(merged)
    }

    /// Accept one alternative: the original assignment takes the
    /// proposal's resources/time and returns to SCHEDULED, siblings are
    /// auto-rejected, all in one transaction.
    #[instrument(skip(self))]
    pub async fn accept_alternative(&self, alternative_id: &str) -> ApiResult<()> {
        let alternative = self
            .alternatives
            .find_by_id(alternative_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("AlternativeSolution with id {alternative_id}"))
            })?;
        self.alternatives.accept(alternative_id)?;

        if let Some(assignment) = self
            .assignments
            .find_by_id(&alternative.original_assignment_id)?
        {
            self.publish(RosterEvent::scoped(
                assignment.plan_id,
                RosterEventType::AlternativeAccepted,
                Some("RosterApi".to_string()),
                vec![alternative.original_assignment_id.clone()],
            ));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reject_alternative(&self, alternative_id: &str) -> ApiResult<()> {
        let alternative = self
            .alternatives
            .find_by_id(alternative_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("AlternativeSolution with id {alternative_id}"))
            })?;
        self.alternatives.reject(alternative_id)?;

        if let Some(assignment) = self
            .assignments
            .find_by_id(&alternative.original_assignment_id)?
        {
            self.publish(RosterEvent::scoped(
                assignment.plan_id,
                RosterEventType::AlternativeRejected,
                Some("RosterApi".to_string()),
                vec![alternative.original_assignment_id],
            ));
        }
        Ok(())
    }

    pub async fn list_alternatives(
        &self,
        assignment_id: &str,
    ) -> ApiResult<Vec<AlternativeSolution>> {
        Ok(self.alternatives.list_by_assignment(assignment_id)?)
    }

    // ==========================================
    // Internals
    // ==========================================

    fn resolve_affected(&self, trigger: &TriggerRequest) -> ApiResult<Vec<Assignment>> {
        let entity = trigger.affected_entity_id.as_deref().ok_or_else(|| {
            ApiError::InvalidInput("trigger requires affected_entity_id".to_string())
        })?;
        let affected = match trigger.trigger_type {
            TriggerType::Weather | TriggerType::Notam => self
                .assignments
                .find_active_by_airport(entity, trigger.timeframe)?,
            TriggerType::Availability => self
                .assignments
                .find_active_by_instructor(entity, trigger.timeframe)?,
            TriggerType::Aircraft => self
                .assignments
                .find_active_by_aircraft(entity, trigger.timeframe)?,
        };
        Ok(affected)
    }

    fn publish(&self, event: RosterEvent) {
        if let Err(e) = self.events.publish(event) {
            warn!(error = %e, "event publish failed");
        }
    }
}

// context covering one candidate's references, padded a day each way so
// duty accumulation and double-booking see the whole UTC day
fn candidate_spec(candidate: &CandidateAssignment) -> ContextSpec {
    ContextSpec {
        student_ids: vec![candidate.student_id.clone()],
        instructor_ids: vec![candidate.instructor_id.clone()],
        aircraft_ids: vec![candidate.aircraft_id.clone()],
        airport_icaos: vec![candidate.airport_icao.clone()],
        all_instructors: false,
        all_aircraft: false,
        horizon_start: candidate.start_at - Duration::hours(24),
        horizon_end: candidate.end_at + Duration::hours(24),
    }
}

fn solve_spec(plan: &Plan, request: &SolveRequest) -> ContextSpec {
    ContextSpec {
        student_ids: request.student_ids.clone(),
        instructor_ids: request.instructor_ids.clone(),
        aircraft_ids: request.aircraft_ids.clone(),
        airport_icaos: slot_airports(&request.time_slots),
        all_instructors: false,
        all_aircraft: false,
        horizon_start: plan.period_start - Duration::hours(24),
        horizon_end: plan.period_end + Duration::hours(24),
    }
}

// replanning variants substitute any instructor/aircraft and shift up
// to 24 hours, so the context loads the full pools and a widened window
fn replanning_spec(affected: &[Assignment]) -> ContextSpec {
    let earliest = affected.iter().map(|a| a.start_at).min().unwrap_or_else(Utc::now);
    let latest = affected.iter().map(|a| a.end_at).max().unwrap_or_else(Utc::now);
    let mut airports: Vec<String> = affected.iter().map(|a| a.airport_icao.clone()).collect();
    airports.sort();
    airports.dedup();
    ContextSpec {
        student_ids: affected.iter().map(|a| a.student_id.clone()).collect(),
        instructor_ids: Vec::new(),
        aircraft_ids: Vec::new(),
        airport_icaos: airports,
        all_instructors: true,
        all_aircraft: true,
        horizon_start: earliest - Duration::hours(24),
        horizon_end: latest + Duration::hours(48),
    }
}

fn slot_airports(slots: &[TimeSlot]) -> Vec<String> {
    let mut airports: Vec<String> = slots.iter().map(|s| s.airport_icao.clone()).collect();
    airports.sort();
    airports.dedup();
    airports
}
