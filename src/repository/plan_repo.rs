// ==========================================
// Flight Roster - plan repository
// ==========================================

use crate::domain::plan::{ObjectiveWeights, Plan};
use crate::domain::types::PlanStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create(&self, plan: &Plan) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO plan (
                plan_id, plan_name, period_start, period_end, status,
                w_weather_fit, w_instructor_balance, w_travel_min,
                w_aircraft_utilization, w_student_continuity, w_cancellation_risk,
                created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &plan.plan_id,
                &plan.plan_name,
                plan.period_start,
                plan.period_end,
                plan.status.to_string(),
                plan.objective_weights.weather_fit,
                plan.objective_weights.instructor_balance,
                plan.objective_weights.travel_min,
                plan.objective_weights.aircraft_utilization,
                plan.objective_weights.student_continuity,
                plan.objective_weights.cancellation_risk,
                &plan.created_by,
                plan.created_at,
                plan.updated_at,
            ],
        )?;

        Ok(plan.plan_id.clone())
    }

    pub fn find_by_id(&self, plan_id: &str) -> RepositoryResult<Option<Plan>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT plan_id, plan_name, period_start, period_end, status,
                      w_weather_fit, w_instructor_balance, w_travel_min,
                      w_aircraft_utilization, w_student_continuity, w_cancellation_risk,
                      created_by, created_at, updated_at
               FROM plan WHERE plan_id = ?"#,
            params![plan_id],
            map_plan_row,
        ) {
            Ok(plan) => Ok(Some(plan)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Plan>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT plan_id, plan_name, period_start, period_end, status,
                      w_weather_fit, w_instructor_balance, w_travel_min,
                      w_aircraft_utilization, w_student_continuity, w_cancellation_risk,
                      created_by, created_at, updated_at
               FROM plan ORDER BY created_at DESC"#,
        )?;

        let plans = stmt
            .query_map([], map_plan_row)?
            .collect::<Result<Vec<Plan>, _>>()?;

        Ok(plans)
    }

    /// Advance plan status. Transitions are forward-only; anything else
    /// is an InvalidStateTransition.
    pub fn update_status(&self, plan_id: &str, next: PlanStatus) -> RepositoryResult<()> {
        let current = self
            .find_by_id(plan_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Plan".to_string(),
                id: plan_id.to_string(),
            })?;

        if !current.status.can_transition_to(next) {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE plan SET status = ?, updated_at = ? WHERE plan_id = ?",
            params![next.to_string(), Utc::now(), plan_id],
        )?;

        Ok(())
    }
}

fn map_plan_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    let status_text: String = row.get(4)?;
    let status = parse_plan_status(&status_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e))?;

    Ok(Plan {
        plan_id: row.get(0)?,
        plan_name: row.get(1)?,
        period_start: row.get(2)?,
        period_end: row.get(3)?,
        status,
        objective_weights: ObjectiveWeights {
            weather_fit: row.get(5)?,
            instructor_balance: row.get(6)?,
            travel_min: row.get(7)?,
            aircraft_utilization: row.get(8)?,
            student_continuity: row.get(9)?,
            cancellation_risk: row.get(10)?,
        },
        created_by: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn parse_plan_status(
    text: &str,
) -> Result<PlanStatus, Box<dyn std::error::Error + Send + Sync + 'static>> {
    match text {
        "DRAFT" => Ok(PlanStatus::Draft),
        "ACTIVE" => Ok(PlanStatus::Active),
        "ARCHIVED" => Ok(PlanStatus::Archived),
        other => Err(format!("unknown plan status '{}'", other).into()),
    }
}
