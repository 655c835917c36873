// ==========================================
// Repository layer integration tests
// ==========================================
// Atomic batch writes, the double-booking uniqueness backstop,
// optimistic-lock conflicts and the status state machines, against a
// real in-memory SQLite database.
// ==========================================

mod helpers;

use flight_roster::domain::types::{AssignmentStatus, PlanStatus};
use flight_roster::domain::{
    Assignment, CandidateAssignment, FeasibilityReport, ObjectiveWeights, Plan, ScoreBreakdown,
};
use flight_roster::repository::{
    AssignmentRepository, PlanRepository, RepositoryError,
};
use helpers::test_data_builder::{open_test_conn, seed_standard_school, t};

fn assignment(plan_id: &str, student: &str, aircraft: &str, start_h: u32) -> Assignment {
    let candidate = CandidateAssignment {
        student_id: student.to_string(),
        instructor_id: "I1".to_string(),
        aircraft_id: aircraft.to_string(),
        lesson_id: None,
        airport_icao: "KPAO".to_string(),
        start_at: t(10, start_h),
        end_at: t(10, start_h + 1),
    };
    Assignment::from_candidate(
        plan_id,
        &candidate,
        FeasibilityReport::default(),
        ScoreBreakdown::default(),
        0.5,
    )
}

fn seeded_plan(conn: &std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>) -> Plan {
    let repo = PlanRepository::new(conn.clone());
    let plan = Plan::new(
        "P1",
        "repo tests",
        t(10, 0),
        t(12, 0),
        ObjectiveWeights::default(),
        "tests",
    )
    .unwrap();
    repo.create(&plan).unwrap();
    plan
}

#[test]
fn batch_insert_is_all_or_nothing() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let plan = seeded_plan(&conn);
    let repo = AssignmentRepository::new(conn.clone());

    // second record collides with the first on (aircraft_id, start_at)
    let batch = vec![
        assignment(&plan.plan_id, "S1", "AC1", 9),
        assignment(&plan.plan_id, "S2", "AC1", 9),
    ];
    let err = repo.insert_batch(&batch).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    // nothing from the failed batch is visible
    assert!(repo.find_by_plan(&plan.plan_id).unwrap().is_empty());

    // a clean batch commits whole
    let batch = vec![
        assignment(&plan.plan_id, "S1", "AC1", 9),
        assignment(&plan.plan_id, "S2", "AC1", 11),
    ];
    assert_eq!(repo.insert_batch(&batch).unwrap(), 2);
    assert_eq!(repo.find_by_plan(&plan.plan_id).unwrap().len(), 2);
}

#[test]
fn double_booking_backstop_ignores_cancelled_rows() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let plan = seeded_plan(&conn);
    let repo = AssignmentRepository::new(conn.clone());

    let first = assignment(&plan.plan_id, "S1", "AC1", 9);
    repo.insert_batch(std::slice::from_ref(&first)).unwrap();
    repo.update_status(&first.assignment_id, AssignmentStatus::Cancelled, 0)
        .unwrap();

    // same aircraft and start time is fine once the first is cancelled
    let replacement = assignment(&plan.plan_id, "S2", "AC1", 9);
    repo.insert_batch(std::slice::from_ref(&replacement)).unwrap();
}

#[test]
fn stale_revision_is_rejected() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let plan = seeded_plan(&conn);
    let repo = AssignmentRepository::new(conn.clone());

    let record = assignment(&plan.plan_id, "S1", "AC1", 9);
    repo.insert_batch(std::slice::from_ref(&record)).unwrap();

    // first writer wins and bumps the revision
    repo.update_status(&record.assignment_id, AssignmentStatus::Scheduled, 0)
        .unwrap();

    // second writer still holds revision 0
    let err = repo
        .update_status(&record.assignment_id, AssignmentStatus::Completed, 0)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));

    // with the fresh revision it goes through
    let current = repo.find_by_id(&record.assignment_id).unwrap().unwrap();
    repo.update_status(
        &record.assignment_id,
        AssignmentStatus::Completed,
        current.revision,
    )
    .unwrap();
}

#[test]
fn assignment_status_machine_is_forward_only() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let plan = seeded_plan(&conn);
    let repo = AssignmentRepository::new(conn.clone());

    let record = assignment(&plan.plan_id, "S1", "AC1", 9);
    repo.insert_batch(std::slice::from_ref(&record)).unwrap();

    // PENDING_CONFIRM cannot complete directly
    let err = repo
        .update_status(&record.assignment_id, AssignmentStatus::Completed, 0)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

    repo.update_status(&record.assignment_id, AssignmentStatus::Scheduled, 0)
        .unwrap();
    let current = repo.find_by_id(&record.assignment_id).unwrap().unwrap();
    repo.update_status(
        &record.assignment_id,
        AssignmentStatus::Completed,
        current.revision,
    )
    .unwrap();

    // COMPLETED is terminal
    let current = repo.find_by_id(&record.assignment_id).unwrap().unwrap();
    let err = repo
        .update_status(
            &record.assignment_id,
            AssignmentStatus::Cancelled,
            current.revision,
        )
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));
}

#[test]
fn plan_status_moves_forward_only() {
    let conn = open_test_conn();
    let repo = PlanRepository::new(conn.clone());
    let plan = seeded_plan(&conn);

    repo.update_status(&plan.plan_id, PlanStatus::Active).unwrap();
    repo.update_status(&plan.plan_id, PlanStatus::Archived).unwrap();

    let err = repo
        .update_status(&plan.plan_id, PlanStatus::Draft)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

    let stored = repo.find_by_id(&plan.plan_id).unwrap().unwrap();
    assert_eq!(stored.status, PlanStatus::Archived);
}

#[test]
fn occupying_window_query_uses_half_open_overlap() {
    let conn = open_test_conn();
    seed_standard_school(&conn);
    let plan = seeded_plan(&conn);
    let repo = AssignmentRepository::new(conn.clone());

    let record = assignment(&plan.plan_id, "S1", "AC1", 9); // [09:00, 10:00)
    repo.insert_batch(std::slice::from_ref(&record)).unwrap();

    // window ending exactly at the sortie start does not overlap
    let before = repo.find_occupying_between(t(10, 8), t(10, 9)).unwrap();
    assert!(before.is_empty());

    let overlapping = repo.find_occupying_between(t(10, 8), t(10, 10)).unwrap();
    assert_eq!(overlapping.len(), 1);

    // cancelled sorties stop occupying resources
    repo.update_status(&record.assignment_id, AssignmentStatus::Cancelled, 0)
        .unwrap();
    let after = repo.find_occupying_between(t(10, 8), t(10, 10)).unwrap();
    assert!(after.is_empty());
}
