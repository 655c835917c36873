// ==========================================
// Flight Roster - environment repository
// ==========================================
// Weather snapshots (latest per airport wins) and availability
// calendars for instructors and aircraft.
// ==========================================

use crate::domain::resources::{AvailabilityBlock, WeatherSnapshot};
use crate::domain::types::ResourceKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct EnvironmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnvironmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== Weather snapshots =====

    pub fn insert_snapshot(&self, snapshot: &WeatherSnapshot) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO weather_snapshot
               (airport_icao, observed_at, ceiling_ft, visibility_km, wind_kt,
                crosswind_kt, is_daylight, confidence)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &snapshot.airport_icao,
                snapshot.observed_at,
                snapshot.ceiling_ft,
                snapshot.visibility_km,
                snapshot.wind_kt,
                snapshot.crosswind_kt,
                snapshot.is_daylight,
                snapshot.confidence,
            ],
        )?;
        Ok(())
    }

    /// Most recent snapshot for an airport, if any.
    pub fn latest_snapshot(&self, airport_icao: &str) -> RepositoryResult<Option<WeatherSnapshot>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            r#"SELECT airport_icao, observed_at, ceiling_ft, visibility_km, wind_kt,
                      crosswind_kt, is_daylight, confidence
               FROM weather_snapshot
               WHERE airport_icao = ?
               ORDER BY observed_at DESC LIMIT 1"#,
            params![airport_icao],
            map_snapshot_row,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ===== Availability blocks =====

    pub fn insert_availability(&self, block: &AvailabilityBlock) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO availability_block (owner_kind, owner_id, start_at, end_at)
               VALUES (?, ?, ?, ?)"#,
            params![
                block.owner_kind.to_string(),
                &block.owner_id,
                block.start_at,
                block.end_at,
            ],
        )?;
        Ok(())
    }

    pub fn blocks_for(
        &self,
        owner_kind: ResourceKind,
        owner_id: &str,
    ) -> RepositoryResult<Vec<AvailabilityBlock>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT owner_kind, owner_id, start_at, end_at
               FROM availability_block
               WHERE owner_kind = ? AND owner_id = ?
               ORDER BY start_at"#,
        )?;
        let rows = stmt
            .query_map(params![owner_kind.to_string(), owner_id], map_block_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All availability blocks, for bulk context prefetch.
    pub fn list_all_blocks(&self) -> RepositoryResult<Vec<AvailabilityBlock>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT owner_kind, owner_id, start_at, end_at FROM availability_block ORDER BY start_at",
        )?;
        let rows = stmt
            .query_map([], map_block_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_snapshot_row(row: &Row<'_>) -> rusqlite::Result<WeatherSnapshot> {
    Ok(WeatherSnapshot {
        airport_icao: row.get(0)?,
        observed_at: row.get(1)?,
        ceiling_ft: row.get(2)?,
        visibility_km: row.get(3)?,
        wind_kt: row.get(4)?,
        crosswind_kt: row.get(5)?,
        is_daylight: row.get(6)?,
        confidence: row.get(7)?,
    })
}

fn map_block_row(row: &Row<'_>) -> rusqlite::Result<AvailabilityBlock> {
    let kind_text: String = row.get(0)?;
    let owner_kind = match kind_text.as_str() {
        "INSTRUCTOR" => ResourceKind::Instructor,
        "AIRCRAFT" => ResourceKind::Aircraft,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown resource kind '{}'", other).into(),
            ))
        }
    };
    Ok(AvailabilityBlock {
        owner_kind,
        owner_id: row.get(1)?,
        start_at: row.get(2)?,
        end_at: row.get(3)?,
    })
}
