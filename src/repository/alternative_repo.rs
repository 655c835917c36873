// ==========================================
// Flight Roster - alternative-solution repository
// ==========================================
// Accept is the critical path: the original assignment's fields, the
// chosen alternative and its siblings must change together or not at
// all, and at most one alternative per assignment may ever be accepted.
// ==========================================

use crate::domain::alternative::AlternativeSolution;
use crate::domain::assignment::CandidateAssignment;
use crate::domain::score::ScoreBreakdown;
use crate::domain::types::{AlternativeStatus, AssignmentStatus, TriggerType};
use crate::repository::assignment_repo::parse_assignment_status;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"alternative_id, original_assignment_id, trigger_type,
    trigger_details, proposal, score_breakdown, total_score, status, generated_at, decided_at"#;

pub struct AlternativeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlternativeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, alternative: &AlternativeSolution) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let proposal_json = serde_json::to_string(&alternative.alternative_assignment)?;
        let breakdown_json = serde_json::to_string(&alternative.score_breakdown)?;

        conn.execute(
            r#"INSERT INTO alternative_solution (
                alternative_id, original_assignment_id, trigger_type, trigger_details,
                proposal, score_breakdown, total_score, status, generated_at, decided_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &alternative.alternative_id,
                &alternative.original_assignment_id,
                alternative.trigger_type.to_string(),
                &alternative.trigger_details,
                proposal_json,
                breakdown_json,
                alternative.total_score,
                alternative.status.to_string(),
                alternative.generated_at,
                alternative.decided_at,
            ],
        )?;

        Ok(alternative.alternative_id.clone())
    }

    pub fn find_by_id(&self, alternative_id: &str) -> RepositoryResult<Option<AlternativeSolution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM alternative_solution WHERE alternative_id = ?",
            SELECT_COLUMNS
        );
        match conn.query_row(&sql, params![alternative_id], map_alternative_row) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All alternatives for one original assignment, best score first.
    pub fn list_by_assignment(
        &self,
        original_assignment_id: &str,
    ) -> RepositoryResult<Vec<AlternativeSolution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM alternative_solution
               WHERE original_assignment_id = ?
               ORDER BY total_score DESC, generated_at"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![original_assignment_id], map_alternative_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Accept one alternative: overwrite the original assignment's
    /// resource/time fields, set the assignment to SCHEDULED, mark the
    /// alternative ACCEPTED and every pending sibling REJECTED — one
    /// transaction guarded by the assignment's revision and the
    /// alternative's PENDING status.
    pub fn accept(&self, alternative_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let sql = format!(
            "SELECT {} FROM alternative_solution WHERE alternative_id = ?",
            SELECT_COLUMNS
        );
        let alternative = match tx.query_row(&sql, params![alternative_id], map_alternative_row) {
            Ok(a) => a,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(RepositoryError::NotFound {
                    entity: "AlternativeSolution".to_string(),
                    id: alternative_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if alternative.status != AlternativeStatus::Pending {
            return Err(RepositoryError::InvalidStateTransition {
                from: alternative.status.to_string(),
                to: AlternativeStatus::Accepted.to_string(),
            });
        }

        let (current_status_text, revision): (String, i32) = tx.query_row(
            "SELECT status, revision FROM assignment WHERE assignment_id = ?",
            params![&alternative.original_assignment_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let current_status = parse_assignment_status(&current_status_text).map_err(|e| {
            RepositoryError::ValidationError(format!("assignment status column: {}", e))
        })?;
        if current_status.is_terminal() {
            return Err(RepositoryError::InvalidStateTransition {
                from: current_status.to_string(),
                to: AssignmentStatus::Scheduled.to_string(),
            });
        }

        let now = Utc::now();
        let proposal = &alternative.alternative_assignment;
        let updated = tx.execute(
            r#"UPDATE assignment
               SET instructor_id = ?, aircraft_id = ?, lesson_id = ?, airport_icao = ?,
                   start_at = ?, end_at = ?, status = 'SCHEDULED',
                   revision = revision + 1, updated_at = ?
               WHERE assignment_id = ? AND revision = ?"#,
            params![
                &proposal.instructor_id,
                &proposal.aircraft_id,
                &proposal.lesson_id,
                &proposal.airport_icao,
                proposal.start_at,
                proposal.end_at,
                now,
                &alternative.original_assignment_id,
                revision,
            ],
        )?;
        if updated == 0 {
            return Err(RepositoryError::OptimisticLockFailure {
                entity: "Assignment".to_string(),
                id: alternative.original_assignment_id.clone(),
                expected: revision,
            });
        }

        let accepted = tx.execute(
            r#"UPDATE alternative_solution
               SET status = 'ACCEPTED', decided_at = ?
               WHERE alternative_id = ? AND status = 'PENDING'"#,
            params![now, alternative_id],
        )?;
        if accepted == 0 {
            // raced with another accept/reject between the read above and here
            return Err(RepositoryError::VersionConflict {
                message: format!("alternative {} was decided concurrently", alternative_id),
            });
        }

        tx.execute(
            r#"UPDATE alternative_solution
               SET status = 'REJECTED', decided_at = ?
               WHERE original_assignment_id = ? AND alternative_id != ? AND status = 'PENDING'"#,
            params![now, &alternative.original_assignment_id, alternative_id],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// Reject one alternative. No effect on the original assignment or
    /// siblings.
    pub fn reject(&self, alternative_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"UPDATE alternative_solution
               SET status = 'REJECTED', decided_at = ?
               WHERE alternative_id = ? AND status = 'PENDING'"#,
            params![Utc::now(), alternative_id],
        )?;

        if updated == 0 {
            // distinguish missing from already-decided
            let existing: Option<String> = {
                match conn.query_row(
                    "SELECT status FROM alternative_solution WHERE alternative_id = ?",
                    params![alternative_id],
                    |row| row.get(0),
                ) {
                    Ok(s) => Some(s),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };
            return match existing {
                None => Err(RepositoryError::NotFound {
                    entity: "AlternativeSolution".to_string(),
                    id: alternative_id.to_string(),
                }),
                Some(status) => Err(RepositoryError::InvalidStateTransition {
                    from: status,
                    to: AlternativeStatus::Rejected.to_string(),
                }),
            };
        }
        Ok(())
    }
}

fn parse_alternative_status(
    text: &str,
) -> Result<AlternativeStatus, Box<dyn std::error::Error + Send + Sync + 'static>> {
    match text {
        "PENDING" => Ok(AlternativeStatus::Pending),
        "ACCEPTED" => Ok(AlternativeStatus::Accepted),
        "REJECTED" => Ok(AlternativeStatus::Rejected),
        other => Err(format!("unknown alternative status '{}'", other).into()),
    }
}

fn parse_trigger_type(
    text: &str,
) -> Result<TriggerType, Box<dyn std::error::Error + Send + Sync + 'static>> {
    match text {
        "WEATHER" => Ok(TriggerType::Weather),
        "NOTAM" => Ok(TriggerType::Notam),
        "AVAILABILITY" => Ok(TriggerType::Availability),
        "AIRCRAFT" => Ok(TriggerType::Aircraft),
        other => Err(format!("unknown trigger type '{}'", other).into()),
    }
}

fn map_alternative_row(row: &Row<'_>) -> rusqlite::Result<AlternativeSolution> {
    let trigger_text: String = row.get(2)?;
    let trigger_type = parse_trigger_type(&trigger_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e))?;

    let proposal_json: String = row.get(4)?;
    let alternative_assignment: CandidateAssignment = serde_json::from_str(&proposal_json)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let breakdown_json: String = row.get(5)?;
    let score_breakdown: ScoreBreakdown = serde_json::from_str(&breakdown_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status_text: String = row.get(7)?;
    let status = parse_alternative_status(&status_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, e))?;

    Ok(AlternativeSolution {
        alternative_id: row.get(0)?,
        original_assignment_id: row.get(1)?,
        trigger_type,
        trigger_details: row.get(3)?,
        alternative_assignment,
        score_breakdown,
        total_score: row.get(6)?,
        status,
        generated_at: row.get(8)?,
        decided_at: row.get(9)?,
    })
}
