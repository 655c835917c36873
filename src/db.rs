// ==========================================
// Flight Roster - SQLite connection setup
// ==========================================
// Single place for Connection::open so every connection gets the same
// PRAGMA behavior (foreign keys, busy_timeout) and the same schema.
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// Default busy_timeout (milliseconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Apply the unified PRAGMA set to a connection.
///
/// foreign_keys and busy_timeout are per-connection settings.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the unified configuration.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Open an in-memory connection with schema applied. Test support and
/// ephemeral evaluation contexts.
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create all tables and indexes if absent.
///
/// The partial unique indexes on assignment (instructor_id, start_at) and
/// (aircraft_id, start_at) are the persistence-time backstop against
/// double-booked commits; the feasibility checker is the first line.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS plan (
            plan_id                 TEXT PRIMARY KEY,
            plan_name               TEXT NOT NULL,
            period_start            TEXT NOT NULL,
            period_end              TEXT NOT NULL,
            status                  TEXT NOT NULL DEFAULT 'DRAFT',
            w_weather_fit           REAL NOT NULL,
            w_instructor_balance    REAL NOT NULL,
            w_travel_min            REAL NOT NULL,
            w_aircraft_utilization  REAL NOT NULL,
            w_student_continuity    REAL NOT NULL,
            w_cancellation_risk     REAL NOT NULL,
            created_by              TEXT NOT NULL,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS assignment (
            assignment_id      TEXT PRIMARY KEY,
            plan_id            TEXT NOT NULL REFERENCES plan(plan_id) ON DELETE CASCADE,
            student_id         TEXT NOT NULL,
            instructor_id      TEXT NOT NULL,
            aircraft_id        TEXT NOT NULL,
            lesson_id          TEXT,
            airport_icao       TEXT NOT NULL,
            start_at           TEXT NOT NULL,
            end_at             TEXT NOT NULL,
            status             TEXT NOT NULL DEFAULT 'PENDING_CONFIRM',
            feasibility_proof  TEXT NOT NULL,
            score_breakdown    TEXT NOT NULL,
            total_score        REAL NOT NULL,
            revision           INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_assignment_plan ON assignment(plan_id);
        CREATE INDEX IF NOT EXISTS idx_assignment_student ON assignment(student_id);
        CREATE INDEX IF NOT EXISTS idx_assignment_airport ON assignment(airport_icao, start_at);
        CREATE UNIQUE INDEX IF NOT EXISTS uq_assignment_instructor_slot
            ON assignment(instructor_id, start_at) WHERE status != 'CANCELLED';
        CREATE UNIQUE INDEX IF NOT EXISTS uq_assignment_aircraft_slot
            ON assignment(aircraft_id, start_at) WHERE status != 'CANCELLED';

        CREATE TABLE IF NOT EXISTS alternative_solution (
            alternative_id          TEXT PRIMARY KEY,
            original_assignment_id  TEXT NOT NULL REFERENCES assignment(assignment_id) ON DELETE CASCADE,
            trigger_type            TEXT NOT NULL,
            trigger_details         TEXT NOT NULL,
            proposal                TEXT NOT NULL,
            score_breakdown         TEXT NOT NULL,
            total_score             REAL NOT NULL,
            status                  TEXT NOT NULL DEFAULT 'PENDING',
            generated_at            TEXT NOT NULL,
            decided_at              TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_alternative_original
            ON alternative_solution(original_assignment_id);

        CREATE TABLE IF NOT EXISTS student (
            student_id        TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            home_airport_icao TEXT NOT NULL,
            enrolled_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS instructor (
            instructor_id          TEXT PRIMARY KEY,
            name                   TEXT NOT NULL,
            ratings                TEXT NOT NULL DEFAULT '[]',
            base_airport_icao      TEXT NOT NULL,
            max_daily_duty_minutes INTEGER
        );

        CREATE TABLE IF NOT EXISTS aircraft (
            aircraft_id          TEXT PRIMARY KEY,
            tail_number          TEXT NOT NULL,
            model                TEXT NOT NULL,
            capability_tags      TEXT NOT NULL DEFAULT '[]',
            status               TEXT NOT NULL DEFAULT 'AVAILABLE',
            base_airport_icao    TEXT NOT NULL,
            hours_to_maintenance REAL,
            min_runway_ft        REAL
        );

        CREATE TABLE IF NOT EXISTS lesson (
            lesson_id              TEXT PRIMARY KEY,
            code                   TEXT NOT NULL,
            name                   TEXT NOT NULL,
            required_rating        TEXT,
            required_capabilities  TEXT NOT NULL DEFAULT '[]',
            prerequisite_lesson_id TEXT,
            min_ceiling_ft         REAL,
            min_visibility_km      REAL,
            max_wind_kt            REAL,
            max_crosswind_kt       REAL,
            night_allowed          INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS airport (
            icao             TEXT PRIMARY KEY,
            name             TEXT NOT NULL,
            runway_length_ft REAL NOT NULL,
            elevation_ft     REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weather_snapshot (
            snapshot_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            airport_icao  TEXT NOT NULL,
            observed_at   TEXT NOT NULL,
            ceiling_ft    REAL NOT NULL,
            visibility_km REAL NOT NULL,
            wind_kt       REAL NOT NULL,
            crosswind_kt  REAL NOT NULL,
            is_daylight   INTEGER NOT NULL,
            confidence    REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_weather_airport
            ON weather_snapshot(airport_icao, observed_at DESC);

        CREATE TABLE IF NOT EXISTS availability_block (
            block_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_kind TEXT NOT NULL,
            owner_id   TEXT NOT NULL,
            start_at   TEXT NOT NULL,
            end_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_availability_owner
            ON availability_block(owner_kind, owner_id, start_at);
        "#,
    )
}
