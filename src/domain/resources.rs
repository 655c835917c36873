// ==========================================
// Flight Roster - operational resource models
// ==========================================
// Students, instructors, aircraft, lessons, airports, weather snapshots
// and availability calendars: the context the feasibility checker and
// scorer resolve candidates against.
// ==========================================

use crate::domain::types::{AircraftStatus, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Student
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub home_airport_icao: String,
    pub enrolled_at: DateTime<Utc>,
}

// ==========================================
// Instructor
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub instructor_id: String,
    pub name: String,
    /// Held ratings, e.g. "CFI", "CFII", "MEI".
    pub ratings: Vec<String>,
    pub base_airport_icao: String,
    /// Per-instructor duty cap; falls back to policy when absent.
    pub max_daily_duty_minutes: Option<i64>,
}

impl Instructor {
    pub fn holds_rating(&self, rating: &str) -> bool {
        self.ratings.iter().any(|r| r == rating)
    }
}

// ==========================================
// Aircraft
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aircraft {
    pub aircraft_id: String,
    pub tail_number: String,
    pub model: String,
    /// Equipment/capability tags, e.g. "ifr", "night", "complex".
    pub capability_tags: Vec<String>,
    pub status: AircraftStatus,
    pub base_airport_icao: String,
    /// Flight hours remaining until the next scheduled maintenance.
    pub hours_to_maintenance: Option<f64>,
    /// Minimum runway this model needs, feet.
    pub min_runway_ft: Option<f64>,
}

impl Aircraft {
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capability_tags.iter().any(|t| t == tag)
    }
}

// ==========================================
// Lesson - syllabus item with weather minima
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_id: String,
    pub code: String,
    pub name: String,
    pub required_rating: Option<String>,
    pub required_capabilities: Vec<String>,
    pub prerequisite_lesson_id: Option<String>,
    pub minima: WeatherMinima,
}

/// Required weather minima for a lesson. Unset fields impose no limit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherMinima {
    pub min_ceiling_ft: Option<f64>,
    pub min_visibility_km: Option<f64>,
    pub max_wind_kt: Option<f64>,
    pub max_crosswind_kt: Option<f64>,
    /// false forbids night operations for this lesson.
    pub night_allowed: bool,
}

// ==========================================
// Airport
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub icao: String,
    pub name: String,
    pub runway_length_ft: f64,
    pub elevation_ft: f64,
}

// ==========================================
// WeatherSnapshot - latest environment reading per airport
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub airport_icao: String,
    pub observed_at: DateTime<Utc>,
    pub ceiling_ft: f64,
    pub visibility_km: f64,
    pub wind_kt: f64,
    pub crosswind_kt: f64,
    pub is_daylight: bool,
    /// Forecast confidence in [0, 1].
    pub confidence: f64,
}

// ==========================================
// AvailabilityBlock - a window an instructor/aircraft may be scheduled in
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityBlock {
    pub owner_kind: ResourceKind,
    pub owner_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl AvailabilityBlock {
    /// Whether this block fully covers [start, end).
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_at <= start && end <= self.end_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn availability_block_coverage() {
        let block = AvailabilityBlock {
            owner_kind: ResourceKind::Instructor,
            owner_id: "I1".to_string(),
            start_at: Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap(),
        };
        let s = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let e = Utc.with_ymd_and_hms(2026, 3, 10, 11, 0, 0).unwrap();
        assert!(block.covers(s, e));
        // window ending exactly at block end is covered (half-open window)
        let e17 = Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap();
        assert!(block.covers(s, e17));
        let e18 = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();
        assert!(!block.covers(s, e18));
    }
}
