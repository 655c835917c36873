// ==========================================
// Test data builders for integration tests
// ==========================================

use chrono::{DateTime, TimeZone, Utc};
use flight_roster::db;
use flight_roster::domain::resources::{
    Aircraft, Airport, AvailabilityBlock, Instructor, Lesson, Student, WeatherMinima,
    WeatherSnapshot,
};
use flight_roster::domain::types::{AircraftStatus, ResourceKind};
use flight_roster::repository::{EnvironmentRepository, ResourceRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Fresh in-memory database with the full schema applied.
pub fn open_test_conn() -> Arc<Mutex<Connection>> {
    flight_roster::logging::init_test();
    let conn = db::open_in_memory().expect("in-memory database");
    Arc::new(Mutex::new(conn))
}

/// March 2026 timestamp shorthand used across the integration tests.
pub fn t(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

// ==========================================
// Student builder
// ==========================================

pub struct StudentBuilder {
    student_id: String,
    name: Option<String>,
    home_airport_icao: Option<String>,
}

impl StudentBuilder {
    pub fn new(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            name: None,
            home_airport_icao: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn home_airport(mut self, icao: &str) -> Self {
        self.home_airport_icao = Some(icao.to_string());
        self
    }

    pub fn build(self) -> Student {
        Student {
            name: self.name.unwrap_or_else(|| self.student_id.clone()),
            home_airport_icao: self.home_airport_icao.unwrap_or_else(|| "KPAO".to_string()),
            enrolled_at: t(1, 0),
            student_id: self.student_id,
        }
    }
}

// ==========================================
// Instructor builder
// ==========================================

pub struct InstructorBuilder {
    instructor_id: String,
    ratings: Vec<String>,
    base_airport_icao: Option<String>,
    max_daily_duty_minutes: Option<i64>,
}

impl InstructorBuilder {
    pub fn new(instructor_id: &str) -> Self {
        Self {
            instructor_id: instructor_id.to_string(),
            ratings: vec!["CFI".to_string()],
            base_airport_icao: None,
            max_daily_duty_minutes: None,
        }
    }

    pub fn rating(mut self, rating: &str) -> Self {
        self.ratings.push(rating.to_string());
        self
    }

    pub fn base_airport(mut self, icao: &str) -> Self {
        self.base_airport_icao = Some(icao.to_string());
        self
    }

    pub fn duty_cap_minutes(mut self, minutes: i64) -> Self {
        self.max_daily_duty_minutes = Some(minutes);
        self
    }

    pub fn build(self) -> Instructor {
        Instructor {
            name: self.instructor_id.clone(),
            ratings: self.ratings,
            base_airport_icao: self.base_airport_icao.unwrap_or_else(|| "KPAO".to_string()),
            max_daily_duty_minutes: self.max_daily_duty_minutes,
            instructor_id: self.instructor_id,
        }
    }
}

// ==========================================
// Aircraft builder
// ==========================================

pub struct AircraftBuilder {
    aircraft_id: String,
    capability_tags: Vec<String>,
    status: AircraftStatus,
    base_airport_icao: Option<String>,
    hours_to_maintenance: Option<f64>,
    min_runway_ft: Option<f64>,
}

impl AircraftBuilder {
    pub fn new(aircraft_id: &str) -> Self {
        Self {
            aircraft_id: aircraft_id.to_string(),
            capability_tags: Vec::new(),
            status: AircraftStatus::Available,
            base_airport_icao: None,
            hours_to_maintenance: None,
            min_runway_ft: None,
        }
    }

    pub fn capability(mut self, tag: &str) -> Self {
        self.capability_tags.push(tag.to_string());
        self
    }

    pub fn status(mut self, status: AircraftStatus) -> Self {
        self.status = status;
        self
    }

    pub fn base_airport(mut self, icao: &str) -> Self {
        self.base_airport_icao = Some(icao.to_string());
        self
    }

    pub fn hours_to_maintenance(mut self, hours: f64) -> Self {
        self.hours_to_maintenance = Some(hours);
        self
    }

    pub fn build(self) -> Aircraft {
        Aircraft {
            tail_number: format!("N-{}", self.aircraft_id),
            model: "C172".to_string(),
            capability_tags: self.capability_tags,
            status: self.status,
            base_airport_icao: self.base_airport_icao.unwrap_or_else(|| "KPAO".to_string()),
            hours_to_maintenance: self.hours_to_maintenance,
            min_runway_ft: self.min_runway_ft,
            aircraft_id: self.aircraft_id,
        }
    }
}

// ==========================================
// Lesson builder
// ==========================================

pub struct LessonBuilder {
    lesson_id: String,
    required_rating: Option<String>,
    required_capabilities: Vec<String>,
    prerequisite_lesson_id: Option<String>,
    minima: WeatherMinima,
}

impl LessonBuilder {
    pub fn new(lesson_id: &str) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            required_rating: None,
            required_capabilities: Vec::new(),
            prerequisite_lesson_id: None,
            minima: WeatherMinima::default(),
        }
    }

    pub fn required_rating(mut self, rating: &str) -> Self {
        self.required_rating = Some(rating.to_string());
        self
    }

    pub fn prerequisite(mut self, lesson_id: &str) -> Self {
        self.prerequisite_lesson_id = Some(lesson_id.to_string());
        self
    }

    pub fn minima(mut self, minima: WeatherMinima) -> Self {
        self.minima = minima;
        self
    }

    pub fn build(self) -> Lesson {
        Lesson {
            code: self.lesson_id.clone(),
            name: format!("Lesson {}", self.lesson_id),
            required_rating: self.required_rating,
            required_capabilities: self.required_capabilities,
            prerequisite_lesson_id: self.prerequisite_lesson_id,
            minima: self.minima,
            lesson_id: self.lesson_id,
        }
    }
}

// ==========================================
// Scenario seeding
// ==========================================

/// All-day availability over March 10-12.
pub fn all_week_block(kind: ResourceKind, owner_id: &str) -> AvailabilityBlock {
    AvailabilityBlock {
        owner_kind: kind,
        owner_id: owner_id.to_string(),
        start_at: t(10, 0),
        end_at: t(13, 0),
    }
}

pub fn good_weather(icao: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        airport_icao: icao.to_string(),
        observed_at: t(10, 6),
        ceiling_ft: 5000.0,
        visibility_km: 12.0,
        wind_kt: 6.0,
        crosswind_kt: 3.0,
        is_daylight: true,
        confidence: 0.9,
    }
}

pub fn home_airport() -> Airport {
    Airport {
        icao: "KPAO".to_string(),
        name: "Palo Alto".to_string(),
        runway_length_ft: 2443.0,
        elevation_ft: 4.0,
    }
}

/// Seed the standard school: 3 students, 2 instructors, 2 aircraft,
/// one airport, all-week availability and benign weather.
pub fn seed_standard_school(conn: &Arc<Mutex<Connection>>) {
    let resources = ResourceRepository::new(conn.clone());
    let environment = EnvironmentRepository::new(conn.clone());

    resources.insert_airport(&home_airport()).unwrap();
    for id in ["S1", "S2", "S3"] {
        resources
            .insert_student(&StudentBuilder::new(id).build())
            .unwrap();
    }
    for id in ["I1", "I2"] {
        resources
            .insert_instructor(&InstructorBuilder::new(id).build())
            .unwrap();
        environment
            .insert_availability(&all_week_block(ResourceKind::Instructor, id))
            .unwrap();
    }
    for id in ["AC1", "AC2"] {
        resources
            .insert_aircraft(&AircraftBuilder::new(id).build())
            .unwrap();
        environment
            .insert_availability(&all_week_block(ResourceKind::Aircraft, id))
            .unwrap();
    }
    environment.insert_snapshot(&good_weather("KPAO")).unwrap();
}
