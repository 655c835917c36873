// ==========================================
// Flight Roster - operational resource repository
// ==========================================
// Students, instructors, aircraft, lessons, airports. Tag/rating lists
// are JSON text columns.
// ==========================================

use crate::domain::resources::{Aircraft, Airport, Instructor, Lesson, Student, WeatherMinima};
use crate::domain::types::AircraftStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct ResourceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== Student =====

    pub fn insert_student(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO student (student_id, name, home_airport_icao, enrolled_at)
               VALUES (?, ?, ?, ?)"#,
            params![
                &student.student_id,
                &student.name,
                &student.home_airport_icao,
                student.enrolled_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_student(&self, student_id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            "SELECT student_id, name, home_airport_icao, enrolled_at FROM student WHERE student_id = ?",
            params![student_id],
            |row| {
                Ok(Student {
                    student_id: row.get(0)?,
                    name: row.get(1)?,
                    home_airport_icao: row.get(2)?,
                    enrolled_at: row.get(3)?,
                })
            },
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ===== Instructor =====

    pub fn insert_instructor(&self, instructor: &Instructor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO instructor
               (instructor_id, name, ratings, base_airport_icao, max_daily_duty_minutes)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                &instructor.instructor_id,
                &instructor.name,
                serde_json::to_string(&instructor.ratings)?,
                &instructor.base_airport_icao,
                instructor.max_daily_duty_minutes,
            ],
        )?;
        Ok(())
    }

    pub fn find_instructor(&self, instructor_id: &str) -> RepositoryResult<Option<Instructor>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            r#"SELECT instructor_id, name, ratings, base_airport_icao, max_daily_duty_minutes
               FROM instructor WHERE instructor_id = ?"#,
            params![instructor_id],
            map_instructor_row,
        ) {
            Ok(i) => Ok(Some(i)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_instructors(&self) -> RepositoryResult<Vec<Instructor>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT instructor_id, name, ratings, base_airport_icao, max_daily_duty_minutes
               FROM instructor ORDER BY instructor_id"#,
        )?;
        let rows = stmt
            .query_map([], map_instructor_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Aircraft =====

    pub fn insert_aircraft(&self, aircraft: &Aircraft) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO aircraft
               (aircraft_id, tail_number, model, capability_tags, status,
                base_airport_icao, hours_to_maintenance, min_runway_ft)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &aircraft.aircraft_id,
                &aircraft.tail_number,
                &aircraft.model,
                serde_json::to_string(&aircraft.capability_tags)?,
                aircraft.status.to_string(),
                &aircraft.base_airport_icao,
                aircraft.hours_to_maintenance,
                aircraft.min_runway_ft,
            ],
        )?;
        Ok(())
    }

    pub fn find_aircraft(&self, aircraft_id: &str) -> RepositoryResult<Option<Aircraft>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            r#"SELECT aircraft_id, tail_number, model, capability_tags, status,
                      base_airport_icao, hours_to_maintenance, min_runway_ft
               FROM aircraft WHERE aircraft_id = ?"#,
            params![aircraft_id],
            map_aircraft_row,
        ) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_aircraft(&self) -> RepositoryResult<Vec<Aircraft>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT aircraft_id, tail_number, model, capability_tags, status,
                      base_airport_icao, hours_to_maintenance, min_runway_ft
               FROM aircraft ORDER BY aircraft_id"#,
        )?;
        let rows = stmt
            .query_map([], map_aircraft_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_aircraft_status(
        &self,
        aircraft_id: &str,
        status: AircraftStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE aircraft SET status = ? WHERE aircraft_id = ?",
            params![status.to_string(), aircraft_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Aircraft".to_string(),
                id: aircraft_id.to_string(),
            });
        }
        Ok(())
    }

    // ===== Lesson =====

    pub fn insert_lesson(&self, lesson: &Lesson) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO lesson
               (lesson_id, code, name, required_rating, required_capabilities,
                prerequisite_lesson_id, min_ceiling_ft, min_visibility_km,
                max_wind_kt, max_crosswind_kt, night_allowed)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &lesson.lesson_id,
                &lesson.code,
                &lesson.name,
                &lesson.required_rating,
                serde_json::to_string(&lesson.required_capabilities)?,
                &lesson.prerequisite_lesson_id,
                lesson.minima.min_ceiling_ft,
                lesson.minima.min_visibility_km,
                lesson.minima.max_wind_kt,
                lesson.minima.max_crosswind_kt,
                lesson.minima.night_allowed,
            ],
        )?;
        Ok(())
    }

    pub fn find_lesson(&self, lesson_id: &str) -> RepositoryResult<Option<Lesson>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            r#"SELECT lesson_id, code, name, required_rating, required_capabilities,
                      prerequisite_lesson_id, min_ceiling_ft, min_visibility_km,
                      max_wind_kt, max_crosswind_kt, night_allowed
               FROM lesson WHERE lesson_id = ?"#,
            params![lesson_id],
            map_lesson_row,
        ) {
            Ok(l) => Ok(Some(l)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ===== Airport =====

    pub fn insert_airport(&self, airport: &Airport) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO airport (icao, name, runway_length_ft, elevation_ft)
               VALUES (?, ?, ?, ?)"#,
            params![
                &airport.icao,
                &airport.name,
                airport.runway_length_ft,
                airport.elevation_ft,
            ],
        )?;
        Ok(())
    }

    pub fn find_airport(&self, icao: &str) -> RepositoryResult<Option<Airport>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            "SELECT icao, name, runway_length_ft, elevation_ft FROM airport WHERE icao = ?",
            params![icao],
            |row| {
                Ok(Airport {
                    icao: row.get(0)?,
                    name: row.get(1)?,
                    runway_length_ft: row.get(2)?,
                    elevation_ft: row.get(3)?,
                })
            },
        ) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_json_list(
    text: &str,
    idx: usize,
) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_instructor_row(row: &Row<'_>) -> rusqlite::Result<Instructor> {
    let ratings_json: String = row.get(2)?;
    Ok(Instructor {
        instructor_id: row.get(0)?,
        name: row.get(1)?,
        ratings: parse_json_list(&ratings_json, 2)?,
        base_airport_icao: row.get(3)?,
        max_daily_duty_minutes: row.get(4)?,
    })
}

fn map_aircraft_row(row: &Row<'_>) -> rusqlite::Result<Aircraft> {
    let tags_json: String = row.get(3)?;
    let status_text: String = row.get(4)?;
    let status = match status_text.as_str() {
        "AVAILABLE" => AircraftStatus::Available,
        "MAINTENANCE" => AircraftStatus::Maintenance,
        "GROUNDED" => AircraftStatus::Grounded,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown aircraft status '{}'", other).into(),
            ))
        }
    };
    Ok(Aircraft {
        aircraft_id: row.get(0)?,
        tail_number: row.get(1)?,
        model: row.get(2)?,
        capability_tags: parse_json_list(&tags_json, 3)?,
        status,
        base_airport_icao: row.get(5)?,
        hours_to_maintenance: row.get(6)?,
        min_runway_ft: row.get(7)?,
    })
}

fn map_lesson_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    let caps_json: String = row.get(4)?;
    Ok(Lesson {
        lesson_id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        required_rating: row.get(3)?,
        required_capabilities: parse_json_list(&caps_json, 4)?,
        prerequisite_lesson_id: row.get(5)?,
        minima: WeatherMinima {
            min_ceiling_ft: row.get(6)?,
            min_visibility_km: row.get(7)?,
            max_wind_kt: row.get(8)?,
            max_crosswind_kt: row.get(9)?,
            night_allowed: row.get(10)?,
        },
    })
}
