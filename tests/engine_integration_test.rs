// ==========================================
// End-to-end solve through the API facade
// ==========================================
// Seeds an in-memory school, creates a plan, solves it and verifies
// the committed roster plus the single-candidate evaluation calls.
// ==========================================

mod helpers;

use flight_roster::api::{ApiError, CreatePlanRequest, RosterApi};
use flight_roster::config::SchedulingPolicy;
use flight_roster::domain::types::{AssignmentStatus, ConstraintType};
use flight_roster::domain::{CandidateAssignment, ObjectiveWeights, TimeSlot};
use flight_roster::engine::SolveRequest;
use flight_roster::repository::AssignmentRepository;
use helpers::test_data_builder::{open_test_conn, seed_standard_school, t};
use std::sync::Arc;

fn api(conn: &std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>) -> RosterApi {
    RosterApi::new(conn.clone(), Arc::new(SchedulingPolicy::default()), None)
}

fn create_plan_request() -> CreatePlanRequest {
    CreatePlanRequest {
        plan_name: "March week 2".to_string(),
        period_start: t(10, 0),
        period_end: t(12, 0),
        objective_weights: ObjectiveWeights::default(),
        created_by: "dispatcher".to_string(),
    }
}

fn five_slots() -> Vec<TimeSlot> {
    (0..5)
        .map(|i| TimeSlot {
            start_at: t(10, 7 + 2 * i),
            end_at: t(10, 8 + 2 * i),
            airport_icao: "KPAO".to_string(),
        })
        .collect()
}

fn solve_request(plan_id: &str) -> SolveRequest {
    SolveRequest {
        plan_id: plan_id.to_string(),
        student_ids: vec!["S1".to_string(), "S2".to_string(), "S3".to_string()],
        instructor_ids: vec!["I1".to_string(), "I2".to_string()],
        aircraft_ids: vec!["AC1".to_string()],
        time_slots: five_slots(),
        max_iterations: Some(200),
        seed: Some(7),
    }
}

#[tokio::test]
async fn solve_commits_full_roster() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let api = api(&conn);

    let plan = api.create_plan(create_plan_request()).await.unwrap();
    let outcome = api.solve(solve_request(&plan.plan_id)).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.assignments_created, 3);
    assert!(outcome.unassigned_students.is_empty());
    assert!(outcome.average_score > 0.0);

    // persisted with proofs and breakdowns attached
    let repo = AssignmentRepository::new(conn.clone());
    let stored = repo.find_by_plan(&plan.plan_id).unwrap();
    assert_eq!(stored.len(), 3);
    for assignment in &stored {
        assert_eq!(assignment.status, AssignmentStatus::PendingConfirm);
        assert!(assignment.feasibility_proof.feasible);
        assert!(assignment.score_breakdown.in_bounds());
    }

    // single aircraft: no pair of sorties may overlap
    for (i, a) in stored.iter().enumerate() {
        for b in &stored[i + 1..] {
            assert!(!a.as_candidate().overlaps(b.start_at, b.end_at));
        }
    }
}

#[tokio::test]
async fn feasibility_endpoint_flags_double_booking() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let api = api(&conn);

    let plan = api.create_plan(create_plan_request()).await.unwrap();
    api.solve(solve_request(&plan.plan_id)).await.unwrap();

    // grab one committed sortie and collide with its aircraft window
    let repo = AssignmentRepository::new(conn.clone());
    let committed = &repo.find_by_plan(&plan.plan_id).unwrap()[0];
    let candidate = CandidateAssignment {
        student_id: "S1".to_string(),
        instructor_id: if committed.instructor_id == "I1" { "I2" } else { "I1" }.to_string(),
        aircraft_id: committed.aircraft_id.clone(),
        lesson_id: None,
        airport_icao: "KPAO".to_string(),
        start_at: committed.start_at,
        end_at: committed.end_at,
    };

    let report = api.check_feasibility(&candidate).await.unwrap();
    assert!(!report.feasible);
    assert!(report
        .blocking_issues
        .iter()
        .any(|m| m.contains("double-booking")));
    let availability = report.result_for(ConstraintType::Availability).unwrap();
    assert!(availability.is_blocking_failure());
}

#[tokio::test]
async fn score_endpoint_returns_bounded_breakdown() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let api = api(&conn);

    let plan = api.create_plan(create_plan_request()).await.unwrap();
    let candidate = CandidateAssignment {
        student_id: "S1".to_string(),
        instructor_id: "I1".to_string(),
        aircraft_id: "AC1".to_string(),
        lesson_id: None,
        airport_icao: "KPAO".to_string(),
        start_at: t(10, 9),
        end_at: t(10, 11),
    };

    let result = api.score_assignment(&candidate, &plan.plan_id).await.unwrap();
    assert!(result.breakdown.in_bounds());
    let expected = result.breakdown.weighted_total(&plan.objective_weights);
    assert!((result.total_score - expected).abs() < 1e-6);
}

#[tokio::test]
async fn solve_rejects_unknown_plan_and_empty_pools() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let api = api(&conn);

    let err = api.solve(solve_request("nope")).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let plan = api.create_plan(create_plan_request()).await.unwrap();
    let mut request = solve_request(&plan.plan_id);
    request.student_ids.clear();
    let err = api.solve(request).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn invalid_plan_period_is_rejected() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let api = api(&conn);

    let mut request = create_plan_request();
    request.period_end = request.period_start;
    let err = api.create_plan(request).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn committed_sortie_can_be_confirmed_and_cancelled() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let api = api(&conn);
    let plan = api.create_plan(create_plan_request()).await.unwrap();
    api.solve(solve_request(&plan.plan_id)).await.unwrap();

    let repo = AssignmentRepository::new(conn.clone());
    let sortie = repo.find_by_plan(&plan.plan_id).unwrap().remove(0);
    assert_eq!(sortie.status, AssignmentStatus::PendingConfirm);

    api.update_assignment_status(
        &sortie.assignment_id,
        AssignmentStatus::Scheduled,
        sortie.revision,
    )
    .await
    .unwrap();
    let confirmed = repo.find_by_id(&sortie.assignment_id).unwrap().unwrap();
    assert_eq!(confirmed.status, AssignmentStatus::Scheduled);
    assert_eq!(confirmed.revision, sortie.revision + 1);

    // stale revision is a retryable conflict
    let err = api
        .update_assignment_status(
            &sortie.assignment_id,
            AssignmentStatus::Cancelled,
            sortie.revision,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    api.update_assignment_status(
        &sortie.assignment_id,
        AssignmentStatus::Cancelled,
        confirmed.revision,
    )
    .await
    .unwrap();
    let cancelled = repo.find_by_id(&sortie.assignment_id).unwrap().unwrap();
    assert_eq!(cancelled.status, AssignmentStatus::Cancelled);
}
