// ==========================================
// Flight Roster - assignment repository
// ==========================================
// Assignments commit in atomic batches (the solver's output is
// all-or-nothing) and carry an optimistic-lock revision for status and
// replanning updates.
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::feasibility::FeasibilityReport;
use crate::domain::score::ScoreBreakdown;
use crate::domain::types::AssignmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"assignment_id, plan_id, student_id, instructor_id, aircraft_id,
    lesson_id, airport_icao, start_at, end_at, status,
    feasibility_proof, score_breakdown, total_score, revision, created_at, updated_at"#;

pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Insert a batch of assignments in one transaction. Any failure
    /// (including the unique slot backstop) rolls back the whole batch.
    pub fn insert_batch(&self, assignments: &[Assignment]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for assignment in assignments {
            let proof_json = serde_json::to_string(&assignment.feasibility_proof)?;
            let breakdown_json = serde_json::to_string(&assignment.score_breakdown)?;

            tx.execute(
                r#"INSERT INTO assignment (
                    assignment_id, plan_id, student_id, instructor_id, aircraft_id,
                    lesson_id, airport_icao, start_at, end_at, status,
                    feasibility_proof, score_breakdown, total_score, revision,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                params![
                    &assignment.assignment_id,
                    &assignment.plan_id,
                    &assignment.student_id,
                    &assignment.instructor_id,
                    &assignment.aircraft_id,
                    &assignment.lesson_id,
                    &assignment.airport_icao,
                    assignment.start_at,
                    assignment.end_at,
                    assignment.status.to_string(),
                    proof_json,
                    breakdown_json,
                    assignment.total_score,
                    assignment.revision,
                    assignment.created_at,
                    assignment.updated_at,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(assignments.len())
    }

    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM assignment WHERE assignment_id = ?", SELECT_COLUMNS);

        match conn.query_row(&sql, params![assignment_id], map_assignment_row) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_plan(&self, plan_id: &str) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM assignment WHERE plan_id = ? ORDER BY start_at",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![plan_id], map_assignment_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Resource-occupying assignments (pending_confirm/scheduled) whose
    /// window overlaps [start, end). Context prefetch for double-booking
    /// and load aggregation.
    pub fn find_occupying_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM assignment
               WHERE status IN ('PENDING_CONFIRM', 'SCHEDULED')
                 AND start_at < ? AND end_at > ?
               ORDER BY start_at"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![end, start], map_assignment_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Completed sorties for a student, most recent first. Prerequisite
    /// and continuity context.
    pub fn find_completed_by_student(&self, student_id: &str) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM assignment
               WHERE student_id = ? AND status = 'COMPLETED'
               ORDER BY end_at DESC"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id], map_assignment_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Non-terminal assignments using the given aircraft, optionally
    /// limited to a timeframe. Replanning affected-set resolution.
    pub fn find_active_by_aircraft(
        &self,
        aircraft_id: &str,
        timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> RepositoryResult<Vec<Assignment>> {
        self.find_active_by_column("aircraft_id", aircraft_id, timeframe)
    }

    pub fn find_active_by_instructor(
        &self,
        instructor_id: &str,
        timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> RepositoryResult<Vec<Assignment>> {
        self.find_active_by_column("instructor_id", instructor_id, timeframe)
    }

    pub fn find_active_by_airport(
        &self,
        airport_icao: &str,
        timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> RepositoryResult<Vec<Assignment>> {
        self.find_active_by_column("airport_icao", airport_icao, timeframe)
    }

    fn find_active_by_column(
        &self,
        column: &str,
        value: &str,
        timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        // column is one of three fixed names above, never user input
        let mut sql = format!(
            r#"SELECT {} FROM assignment
               WHERE {} = ? AND status IN ('PENDING_CONFIRM', 'SCHEDULED')"#,
            SELECT_COLUMNS, column
        );
        if timeframe.is_some() {
            sql.push_str(" AND start_at < ? AND end_at > ?");
        }
        sql.push_str(" ORDER BY start_at");

        let mut stmt = conn.prepare(&sql)?;
        let rows = match timeframe {
            Some((start, end)) => stmt
                .query_map(params![value, end, start], map_assignment_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![value], map_assignment_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    /// (cancelled, total) counts for historical sorties at an airport.
    /// Cancellation-risk scoring context.
    pub fn cancellation_stats_by_airport(&self, airport_icao: &str) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        let (cancelled, total): (i64, i64) = conn.query_row(
            r#"SELECT
                   COALESCE(SUM(CASE WHEN status = 'CANCELLED' THEN 1 ELSE 0 END), 0),
                   COUNT(*)
               FROM assignment
               WHERE airport_icao = ? AND status IN ('CANCELLED', 'COMPLETED')"#,
            params![airport_icao],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((cancelled, total))
    }

    /// Compare-and-swap status update guarded by the revision column.
    /// A concurrent writer shows up as OptimisticLockFailure; an illegal
    /// transition as InvalidStateTransition.
    pub fn update_status(
        &self,
        assignment_id: &str,
        next: AssignmentStatus,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        let current = self
            .find_by_id(assignment_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Assignment".to_string(),
                id: assignment_id.to_string(),
            })?;

        if !current.status.can_transition_to(next) {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"UPDATE assignment
               SET status = ?, revision = revision + 1, updated_at = ?
               WHERE assignment_id = ? AND revision = ?"#,
            params![next.to_string(), Utc::now(), assignment_id, expected_revision],
        )?;

        if updated == 0 {
            return Err(RepositoryError::OptimisticLockFailure {
                entity: "Assignment".to_string(),
                id: assignment_id.to_string(),
                expected: expected_revision,
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_assignment_status(
    text: &str,
) -> Result<AssignmentStatus, Box<dyn std::error::Error + Send + Sync + 'static>> {
    match text {
        "PENDING_CONFIRM" => Ok(AssignmentStatus::PendingConfirm),
        "SCHEDULED" => Ok(AssignmentStatus::Scheduled),
        "COMPLETED" => Ok(AssignmentStatus::Completed),
        "CANCELLED" => Ok(AssignmentStatus::Cancelled),
        other => Err(format!("unknown assignment status '{}'", other).into()),
    }
}

pub(crate) fn map_assignment_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    let status_text: String = row.get(9)?;
    let status = parse_assignment_status(&status_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, e))?;

    let proof_json: String = row.get(10)?;
    let feasibility_proof: FeasibilityReport = serde_json::from_str(&proof_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let breakdown_json: String = row.get(11)?;
    let score_breakdown: ScoreBreakdown = serde_json::from_str(&breakdown_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Assignment {
        assignment_id: row.get(0)?,
        plan_id: row.get(1)?,
        student_id: row.get(2)?,
        instructor_id: row.get(3)?,
        aircraft_id: row.get(4)?,
        lesson_id: row.get(5)?,
        airport_icao: row.get(6)?,
        start_at: row.get(7)?,
        end_at: row.get(8)?,
        status,
        feasibility_proof,
        score_breakdown,
        total_score: row.get(12)?,
        revision: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}
