// ==========================================
// Flight Roster - two-phase roster solver
// ==========================================
// Phase 1 builds a roster greedily: per student, enumerate every
// (slot, instructor, aircraft) combination, keep the best feasible one.
// Phase 2 improves it with randomized instructor swaps under a
// wall-clock budget. The solver never persists anything; callers commit
// the returned solution atomically.
// ==========================================

use crate::config::SchedulingPolicy;
use crate::domain::assignment::{CandidateAssignment, TimeSlot};
use crate::domain::feasibility::FeasibilityReport;
use crate::domain::plan::Plan;
use crate::domain::score::ScoreBreakdown;
use crate::engine::context::SolveContext;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::feasibility::FeasibilityEngine;
use crate::engine::scoring::ScoringEngine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

// ==========================================
// Request / result types
// ==========================================

#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub plan_id: String,
    /// Students to roster, in priority order. Phase 1 serves them
    /// front to back.
    pub student_ids: Vec<String>,
    pub instructor_ids: Vec<String>,
    pub aircraft_ids: Vec<String>,
    pub time_slots: Vec<TimeSlot>,
    /// Phase 2 iteration cap; policy default when absent.
    pub max_iterations: Option<u64>,
    /// Phase 2 RNG seed. Absent means a random seed, logged for replay.
    pub seed: Option<u64>,
}

/// One fully evaluated roster entry: the candidate plus the proof and
/// score captured at selection time.
#[derive(Debug, Clone)]
pub struct EvaluatedAssignment {
    pub candidate: CandidateAssignment,
    pub proof: FeasibilityReport,
    pub breakdown: ScoreBreakdown,
    pub total_score: f64,
}

#[derive(Debug, Clone)]
pub struct RosterSolution {
    pub assignments: Vec<EvaluatedAssignment>,
    pub total_score: f64,
    pub total_iterations: u64,
    pub execution_time_ms: u64,
    pub unassigned_students: Vec<String>,
}

impl RosterSolution {
    pub fn average_score(&self) -> f64 {
        if self.assignments.is_empty() {
            0.0
        } else {
            self.total_score / self.assignments.len() as f64
        }
    }
}

// ==========================================
// Solver
// ==========================================

#[derive(Clone)]
pub struct RosterSolver {
    feasibility: FeasibilityEngine,
    scoring: ScoringEngine,
    policy: Arc<SchedulingPolicy>,
}

impl RosterSolver {
    pub fn new(policy: Arc<SchedulingPolicy>) -> Self {
        Self {
            feasibility: FeasibilityEngine::new(policy.clone()),
            scoring: ScoringEngine::new(policy.clone()),
            policy,
        }
    }

    pub async fn solve(
        &self,
        plan: &Plan,
        request: &SolveRequest,
        ctx: Arc<SolveContext>,
    ) -> EngineResult<RosterSolution> {
        self.solve_with_cancellation(plan, request, ctx, None).await
    }

    /// Full two-phase solve. `cancel` is polled between Phase 2 moves;
    /// a raised flag ends the search cleanly on the best solution so far.
    #[instrument(skip(self, plan, request, ctx, cancel), fields(plan_id = %request.plan_id))]
    pub async fn solve_with_cancellation(
        &self,
        plan: &Plan,
        request: &SolveRequest,
        ctx: Arc<SolveContext>,
        cancel: Option<Arc<AtomicBool>>,
    ) -> EngineResult<RosterSolution> {
        validate_request(request)?;
        let started = Instant::now();

        // ===== Phase 1: greedy construction =====
        let mut working: Vec<EvaluatedAssignment> = Vec::with_capacity(request.student_ids.len());
        let mut unassigned: Vec<String> = Vec::new();

        for student_id in &request.student_ids {
            match self
                .best_for_student(student_id, request, &ctx, &working, &plan.objective_weights)
                .await?
            {
                Some(evaluated) => working.push(evaluated),
                None => unassigned.push(student_id.clone()),
            }
        }

        let phase1_total: f64 = working.iter().map(|e| e.total_score).sum();
        info!(
            assigned = working.len(),
            unassigned = unassigned.len(),
            phase1_total,
            "greedy construction finished"
        );

        // ===== Phase 2: randomized instructor swaps =====
        let max_iterations = request
            .max_iterations
            .unwrap_or(u64::from(self.policy.default_max_iterations));
        let seed = request.seed.unwrap_or_else(|| {
            let s = rand::rng().random::<u64>();
            info!(seed = s, "no seed supplied, generated one for replay");
            s
        });

        let budget = Duration::from_millis(self.policy.phase2_time_budget_ms);
        let solver = self.clone();
        let ctx_for_search = ctx.clone();
        let weights = plan.objective_weights;
        let (best, iterations) = tokio::task::spawn_blocking(move || {
            solver.improve(
                working,
                &ctx_for_search,
                &weights,
                seed,
                max_iterations,
                budget,
                cancel,
            )
        })
        .await
        .map_err(|e| EngineError::Other(anyhow::anyhow!("phase 2 task failed: {e}")))?;

        let total_score: f64 = best.iter().map(|e| e.total_score).sum();
        let solution = RosterSolution {
            assignments: best,
            total_score,
            total_iterations: iterations,
            execution_time_ms: started.elapsed().as_millis() as u64,
            unassigned_students: unassigned,
        };
        info!(
            assignments = solution.assignments.len(),
            total_score = solution.total_score,
            iterations = solution.total_iterations,
            elapsed_ms = solution.execution_time_ms,
            "solve finished"
        );
        Ok(solution)
    }

    /// Enumerate slot × instructor × aircraft for one student and return
    /// the best feasible evaluation, or None when nothing is feasible.
    /// Candidates are evaluated on a worker pool; the max-score pick
    /// breaks ties by lowest enumeration index.
    async fn best_for_student(
        &self,
        student_id: &str,
        request: &SolveRequest,
        ctx: &Arc<SolveContext>,
        working: &[EvaluatedAssignment],
        weights: &crate::domain::plan::ObjectiveWeights,
    ) -> EngineResult<Option<EvaluatedAssignment>> {
        let mut combos: Vec<(usize, CandidateAssignment)> = Vec::with_capacity(
            request.time_slots.len() * request.instructor_ids.len() * request.aircraft_ids.len(),
        );
        let mut index = 0usize;
        for slot in &request.time_slots {
            for instructor_id in &request.instructor_ids {
                for aircraft_id in &request.aircraft_ids {
                    combos.push((
                        index,
                        CandidateAssignment {
                            student_id: student_id.to_string(),
                            instructor_id: instructor_id.clone(),
                            aircraft_id: aircraft_id.clone(),
                            lesson_id: None,
                            airport_icao: slot.airport_icao.clone(),
                            start_at: slot.start_at,
                            end_at: slot.end_at,
                        },
                    ));
                    index += 1;
                }
            }
        }

        let working_set: Arc<Vec<CandidateAssignment>> =
            Arc::new(working.iter().map(|e| e.candidate.clone()).collect());
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let chunk_size = combos.len().div_ceil(workers).max(1);

        let mut handles = Vec::with_capacity(workers);
        for chunk in combos.chunks(chunk_size) {
            let chunk: Vec<(usize, CandidateAssignment)> = chunk.to_vec();
            let solver = self.clone();
            let ctx = ctx.clone();
            let working_set = working_set.clone();
            let weights = *weights;
            handles.push(tokio::task::spawn_blocking(move || {
                let mut feasible: Vec<(usize, EvaluatedAssignment)> = Vec::new();
                for (idx, candidate) in chunk {
                    match solver.evaluate(&candidate, &ctx, &working_set, &weights) {
                        Ok(Some(evaluated)) => feasible.push((idx, evaluated)),
                        Ok(None) => {}
                        Err(e) if e.is_resolution() => {
                            // unresolved reference kills this candidate only
                            debug!(error = %e, "skipping unresolvable candidate");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(feasible)
            }));
        }

        let mut best: Option<(usize, EvaluatedAssignment)> = None;
        let chunk_results = futures::future::try_join_all(handles)
            .await
            .map_err(|e| EngineError::Other(anyhow::anyhow!("evaluation task failed: {e}")))?;
        for chunk_result in chunk_results {
            for (idx, evaluated) in chunk_result? {
                let better = match &best {
                    None => true,
                    Some((best_idx, best_eval)) => {
                        evaluated.total_score > best_eval.total_score
                            || (evaluated.total_score == best_eval.total_score && idx < *best_idx)
                    }
                };
                if better {
                    best = Some((idx, evaluated));
                }
            }
        }
        Ok(best.map(|(_, evaluated)| evaluated))
    }

    /// Feasibility + score for one candidate. None when infeasible.
    fn evaluate(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        working: &[CandidateAssignment],
        weights: &crate::domain::plan::ObjectiveWeights,
    ) -> EngineResult<Option<EvaluatedAssignment>> {
        let proof = self.feasibility.check(candidate, ctx, working, None)?;
        if !proof.feasible {
            return Ok(None);
        }
        let breakdown = self.scoring.breakdown(candidate, ctx, working)?;
        Ok(Some(EvaluatedAssignment {
            candidate: candidate.clone(),
            proof,
            breakdown,
            total_score: breakdown.weighted_total(weights),
        }))
    }

    /// Phase 2 body. Runs on a blocking worker: pure CPU over the
    /// context snapshot, no store access.
    #[allow(clippy::too_many_arguments)]
    fn improve(
        &self,
        initial: Vec<EvaluatedAssignment>,
        ctx: &SolveContext,
        weights: &crate::domain::plan::ObjectiveWeights,
        seed: u64,
        max_iterations: u64,
        budget: Duration,
        cancel: Option<Arc<AtomicBool>>,
    ) -> (Vec<EvaluatedAssignment>, u64) {
        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut current = initial;
        let mut current_total: f64 = current.iter().map(|e| e.total_score).sum();
        // best tracked separately so the persisted outcome never regresses
        let mut best = current.clone();
        let mut best_total = current_total;
        let mut iterations: u64 = 0;

        if current.len() < 2 {
            return (best, iterations);
        }

        while iterations < max_iterations {
            if started.elapsed() >= budget {
                debug!(iterations, "phase 2 wall-clock budget exhausted");
                break;
            }
            if let Some(flag) = &cancel {
                if flag.load(Ordering::Relaxed) {
                    warn!(iterations, "phase 2 cancelled by caller");
                    break;
                }
            }
            iterations += 1;

            let i = rng.random_range(0..current.len());
            let mut j = rng.random_range(0..current.len());
            while j == i {
                j = rng.random_range(0..current.len());
            }

            // propose swapping the two instructors
            let mut a = current[i].candidate.clone();
            let mut b = current[j].candidate.clone();
            if a.instructor_id == b.instructor_id {
                continue;
            }
            std::mem::swap(&mut a.instructor_id, &mut b.instructor_id);

            // the rest of the roster, unchanged
            let others: Vec<CandidateAssignment> = current
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != i && *k != j)
                .map(|(_, e)| e.candidate.clone())
                .collect();

            let new_a = match self.reevaluate(&a, ctx, &others, std::slice::from_ref(&b), weights) {
                Some(e) => e,
                None => continue,
            };
            let new_b = match self.reevaluate(&b, ctx, &others, std::slice::from_ref(&a), weights) {
                Some(e) => e,
                None => continue,
            };

            let proposed_total = current_total - current[i].total_score - current[j].total_score
                + new_a.total_score
                + new_b.total_score;
            if proposed_total > current_total {
                current[i] = new_a;
                current[j] = new_b;
                current_total = proposed_total;
                if current_total > best_total {
                    best = current.clone();
                    best_total = current_total;
                }
            }
        }

        debug!(iterations, best_total, "phase 2 finished");
        (best, iterations)
    }

    /// Re-evaluate one swapped candidate against the rest of the roster
    /// plus its swap partner. Resolution errors and infeasibility both
    /// veto the move.
    fn reevaluate(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        others: &[CandidateAssignment],
        partner: &[CandidateAssignment],
        weights: &crate::domain::plan::ObjectiveWeights,
    ) -> Option<EvaluatedAssignment> {
        let mut working: Vec<CandidateAssignment> = Vec::with_capacity(others.len() + partner.len());
        working.extend_from_slice(others);
        working.extend_from_slice(partner);

        let proof = self.feasibility.check(candidate, ctx, &working, None).ok()?;
        if !proof.feasible {
            return None;
        }
        let breakdown = self.scoring.breakdown(candidate, ctx, &working).ok()?;
        Some(EvaluatedAssignment {
            candidate: candidate.clone(),
            proof,
            breakdown,
            total_score: breakdown.weighted_total(weights),
        })
    }
}

fn validate_request(request: &SolveRequest) -> EngineResult<()> {
    if request.student_ids.is_empty() {
        return Err(EngineError::InvalidInput("student pool is empty".to_string()));
    }
    if request.instructor_ids.is_empty() {
        return Err(EngineError::InvalidInput("instructor pool is empty".to_string()));
    }
    if request.aircraft_ids.is_empty() {
        return Err(EngineError::InvalidInput("aircraft pool is empty".to_string()));
    }
    if request.time_slots.is_empty() {
        return Err(EngineError::InvalidInput("no candidate time slots".to_string()));
    }
    for slot in &request.time_slots {
        if slot.end_at <= slot.start_at {
            return Err(EngineError::InvalidInput(format!(
                "slot end {} not after start {}",
                slot.end_at, slot.start_at
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::ObjectiveWeights;
    use crate::domain::resources::{
        Aircraft, Airport, AvailabilityBlock, Instructor, Student,
    };
    use crate::domain::types::{AircraftStatus, ResourceKind};
    use chrono::{DateTime, TimeZone, Utc};

    fn t(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, 0, 0).unwrap()
    }

    fn plan() -> Plan {
        Plan::new(
            "P1",
            "March week 2",
            t(10, 0),
            t(12, 0),
            ObjectiveWeights::default(),
            "tests",
        )
        .unwrap()
    }

    // 3 students, 2 instructors, 1 aircraft, 5 non-overlapping slots.
    fn scenario_context() -> SolveContext {
        let mut ctx = SolveContext::empty(t(10, 0), t(12, 0));
        for id in ["S1", "S2", "S3"] {
            ctx.students.insert(
                id.to_string(),
                Student {
                    student_id: id.to_string(),
                    name: id.to_string(),
                    home_airport_icao: "KPAO".to_string(),
                    enrolled_at: t(1, 0),
                },
            );
        }
        for id in ["I1", "I2"] {
            ctx.instructors.insert(
                id.to_string(),
                Instructor {
                    instructor_id: id.to_string(),
                    name: id.to_string(),
                    ratings: vec!["CFI".to_string()],
                    base_airport_icao: "KPAO".to_string(),
                    max_daily_duty_minutes: None,
                },
            );
            ctx.availability.insert(
                (ResourceKind::Instructor, id.to_string()),
                vec![AvailabilityBlock {
                    owner_kind: ResourceKind::Instructor,
                    owner_id: id.to_string(),
                    start_at: t(10, 6),
                    end_at: t(10, 20),
                }],
            );
        }
        ctx.aircraft.insert(
            "AC1".to_string(),
            Aircraft {
                aircraft_id: "AC1".to_string(),
                tail_number: "N123AB".to_string(),
                model: "C172".to_string(),
                capability_tags: vec![],
                status: AircraftStatus::Available,
                base_airport_icao: "KPAO".to_string(),
                hours_to_maintenance: None,
                min_runway_ft: None,
            },
        );
        ctx.availability.insert(
            (ResourceKind::Aircraft, "AC1".to_string()),
            vec![AvailabilityBlock {
                owner_kind: ResourceKind::Aircraft,
                owner_id: "AC1".to_string(),
                start_at: t(10, 6),
                end_at: t(10, 20),
            }],
        );
        ctx.airports.insert(
            "KPAO".to_string(),
            Airport {
                icao: "KPAO".to_string(),
                name: "Palo Alto".to_string(),
                runway_length_ft: 2443.0,
                elevation_ft: 4.0,
            },
        );
        ctx
    }

    fn scenario_request() -> SolveRequest {
        SolveRequest {
            plan_id: "P1".to_string(),
            student_ids: vec!["S1".to_string(), "S2".to_string(), "S3".to_string()],
            instructor_ids: vec!["I1".to_string(), "I2".to_string()],
            aircraft_ids: vec!["AC1".to_string()],
            time_slots: (0..5)
                .map(|i| TimeSlot {
                    start_at: t(10, 7 + 2 * i),
                    end_at: t(10, 8 + 2 * i),
                    airport_icao: "KPAO".to_string(),
                })
                .collect(),
            max_iterations: Some(200),
            seed: Some(42),
        }
    }

    fn solver() -> RosterSolver {
        RosterSolver::new(Arc::new(SchedulingPolicy::default()))
    }

    #[tokio::test]
    async fn schedules_every_student_with_enough_slots() {
        let ctx = Arc::new(scenario_context());
        let solution = solver()
            .solve(&plan(), &scenario_request(), ctx)
            .await
            .unwrap();

        assert_eq!(solution.assignments.len(), 3);
        assert!(solution.unassigned_students.is_empty());

        // single aircraft means no two sorties may overlap
        for (i, a) in solution.assignments.iter().enumerate() {
            for b in &solution.assignments[i + 1..] {
                assert!(
                    !a.candidate.overlaps(b.candidate.start_at, b.candidate.end_at),
                    "overlapping sorties on one aircraft"
                );
            }
        }
    }

    #[tokio::test]
    async fn unresolvable_student_lands_in_unassigned() {
        let ctx = Arc::new(scenario_context());
        let mut request = scenario_request();
        request.student_ids.push("GHOST".to_string());

        let solution = solver().solve(&plan(), &request, ctx).await.unwrap();
        assert_eq!(solution.assignments.len(), 3);
        assert_eq!(solution.unassigned_students, vec!["GHOST".to_string()]);
    }

    #[tokio::test]
    async fn student_with_no_feasible_combination_lands_in_unassigned() {
        let ctx = Arc::new(scenario_context());
        let mut request = scenario_request();
        request.student_ids = vec!["S1".to_string()];
        // the only slot falls outside every availability block
        request.time_slots = vec![TimeSlot {
            start_at: t(10, 21),
            end_at: t(10, 22),
            airport_icao: "KPAO".to_string(),
        }];

        let solution = solver().solve(&plan(), &request, ctx).await.unwrap();
        assert!(solution.assignments.is_empty());
        assert_eq!(solution.unassigned_students, vec!["S1".to_string()]);
    }

    #[tokio::test]
    async fn improvement_never_regresses_greedy_total() {
        let ctx = Arc::new(scenario_context());
        let s = solver();

        let mut greedy_only = scenario_request();
        greedy_only.max_iterations = Some(0);
        let phase1 = s.solve(&plan(), &greedy_only, ctx.clone()).await.unwrap();

        let improved = s.solve(&plan(), &scenario_request(), ctx).await.unwrap();
        assert!(
            improved.total_score >= phase1.total_score - 1e-9,
            "{} < {}",
            improved.total_score,
            phase1.total_score
        );
    }

    #[tokio::test]
    async fn identical_seeds_give_identical_solutions() {
        let ctx = Arc::new(scenario_context());
        let s = solver();
        let a = s.solve(&plan(), &scenario_request(), ctx.clone()).await.unwrap();
        let b = s.solve(&plan(), &scenario_request(), ctx).await.unwrap();
        let key = |sol: &RosterSolution| {
            sol.assignments
                .iter()
                .map(|e| {
                    (
                        e.candidate.student_id.clone(),
                        e.candidate.instructor_id.clone(),
                        e.candidate.start_at,
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&a), key(&b));
        assert!((a.total_score - b.total_score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_pools_are_rejected_before_search() {
        let ctx = Arc::new(scenario_context());
        let mut request = scenario_request();
        request.aircraft_ids.clear();
        let err = solver().solve(&plan(), &request, ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn raised_cancel_flag_stops_after_greedy() {
        let ctx = Arc::new(scenario_context());
        let flag = Arc::new(AtomicBool::new(true));
        let solution = solver()
            .solve_with_cancellation(&plan(), &scenario_request(), ctx, Some(flag))
            .await
            .unwrap();
        // cancelled before the first move was attempted
        assert_eq!(solution.assignments.len(), 3);
        assert!(solution.total_iterations <= 1);
    }
}
