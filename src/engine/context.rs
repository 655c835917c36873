// ==========================================
// Flight Roster - evaluation context
// ==========================================
// The feasibility checker and scorer run millions of times inside the
// solver's hot loop. All store reads happen once, up front, into a
// SolveContext snapshot; evaluation is then pure and lock-free.
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::resources::{
    Aircraft, Airport, AvailabilityBlock, Instructor, Lesson, Student, WeatherSnapshot,
};
use crate::domain::types::ResourceKind;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{AssignmentRepository, EnvironmentRepository, ResourceRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// ==========================================
// ContextSpec - what to prefetch
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ContextSpec {
    pub student_ids: Vec<String>,
    pub instructor_ids: Vec<String>,
    pub aircraft_ids: Vec<String>,
    pub airport_icaos: Vec<String>,
    /// Load every instructor/aircraft regardless of the id lists.
    /// Replanning needs the full pools to generate variants.
    pub all_instructors: bool,
    pub all_aircraft: bool,
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
}

// ==========================================
// SolveContext - immutable snapshot for one evaluation run
// ==========================================
#[derive(Debug, Clone)]
pub struct SolveContext {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    pub students: HashMap<String, Student>,
    pub instructors: HashMap<String, Instructor>,
    pub aircraft: HashMap<String, Aircraft>,
    pub lessons: HashMap<String, Lesson>,
    pub airports: HashMap<String, Airport>,
    /// Latest snapshot per airport; absent key means no recent weather.
    pub weather: HashMap<String, WeatherSnapshot>,
    pub availability: HashMap<(ResourceKind, String), Vec<AvailabilityBlock>>,
    /// Resource-occupying assignments committed in the horizon.
    pub committed: Vec<Assignment>,
    /// Completed sorties per student, most recent first.
    pub completed_by_student: HashMap<String, Vec<Assignment>>,
    /// (cancelled, total) historical counts per airport.
    pub cancellation_stats: HashMap<String, (i64, i64)>,
}

impl SolveContext {
    /// Empty context over a horizon. Test and builder support.
    pub fn empty(horizon_start: DateTime<Utc>, horizon_end: DateTime<Utc>) -> Self {
        Self {
            horizon_start,
            horizon_end,
            students: HashMap::new(),
            instructors: HashMap::new(),
            aircraft: HashMap::new(),
            lessons: HashMap::new(),
            airports: HashMap::new(),
            weather: HashMap::new(),
            availability: HashMap::new(),
            committed: Vec::new(),
            completed_by_student: HashMap::new(),
            cancellation_stats: HashMap::new(),
        }
    }

    pub fn student(&self, id: &str) -> EngineResult<&Student> {
        self.students
            .get(id)
            .ok_or_else(|| EngineError::resolution("Student", id))
    }

    pub fn instructor(&self, id: &str) -> EngineResult<&Instructor> {
        self.instructors
            .get(id)
            .ok_or_else(|| EngineError::resolution("Instructor", id))
    }

    pub fn aircraft_by_id(&self, id: &str) -> EngineResult<&Aircraft> {
        self.aircraft
            .get(id)
            .ok_or_else(|| EngineError::resolution("Aircraft", id))
    }

    pub fn lesson(&self, id: &str) -> EngineResult<&Lesson> {
        self.lessons
            .get(id)
            .ok_or_else(|| EngineError::resolution("Lesson", id))
    }

    pub fn airport(&self, icao: &str) -> EngineResult<&Airport> {
        self.airports
            .get(icao)
            .ok_or_else(|| EngineError::resolution("Airport", icao))
    }

    pub fn weather_for(&self, icao: &str) -> Option<&WeatherSnapshot> {
        self.weather.get(icao)
    }

    pub fn blocks_for(&self, kind: ResourceKind, owner_id: &str) -> &[AvailabilityBlock] {
        self.availability
            .get(&(kind, owner_id.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn completed_for(&self, student_id: &str) -> &[Assignment] {
        self.completed_by_student
            .get(student_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Historical cancellation rate for an airport, if any history exists.
    pub fn cancellation_rate(&self, icao: &str) -> Option<f64> {
        match self.cancellation_stats.get(icao) {
            Some((cancelled, total)) if *total > 0 => Some(*cancelled as f64 / *total as f64),
            _ => None,
        }
    }

    pub fn horizon_days(&self) -> f64 {
        ((self.horizon_end - self.horizon_start).num_minutes() as f64 / 1440.0).max(1.0)
    }
}

// ==========================================
// ContextProvider - engine-defined seam, store-implemented
// ==========================================
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn build_context(&self, spec: &ContextSpec) -> EngineResult<SolveContext>;
}

// ==========================================
// StoreContextProvider - batched reads over the repositories
// ==========================================
pub struct StoreContextProvider {
    resources: Arc<ResourceRepository>,
    environment: Arc<EnvironmentRepository>,
    assignments: Arc<AssignmentRepository>,
}

impl StoreContextProvider {
    pub fn new(
        resources: Arc<ResourceRepository>,
        environment: Arc<EnvironmentRepository>,
        assignments: Arc<AssignmentRepository>,
    ) -> Self {
        Self {
            resources,
            environment,
            assignments,
        }
    }
}

#[async_trait]
impl ContextProvider for StoreContextProvider {
    async fn build_context(&self, spec: &ContextSpec) -> EngineResult<SolveContext> {
        let mut ctx = SolveContext::empty(spec.horizon_start, spec.horizon_end);

        // A missing id is deliberately NOT an error here: the entry is
        // simply absent and candidate evaluation raises Resolution when
        // it is first touched.
        for id in &spec.student_ids {
            if let Some(student) = self.resources.find_student(id)? {
                ctx.students.insert(id.clone(), student);
            } else {
                debug!(student_id = %id, "context prefetch: student does not resolve");
            }
        }

        let instructors = if spec.all_instructors {
            self.resources.list_instructors()?
        } else {
            let mut list = Vec::with_capacity(spec.instructor_ids.len());
            for id in &spec.instructor_ids {
                if let Some(instructor) = self.resources.find_instructor(id)? {
                    list.push(instructor);
                } else {
                    debug!(instructor_id = %id, "context prefetch: instructor does not resolve");
                }
            }
            list
        };
        for instructor in instructors {
            let blocks = self
                .environment
                .blocks_for(ResourceKind::Instructor, &instructor.instructor_id)?;
            ctx.availability.insert(
                (ResourceKind::Instructor, instructor.instructor_id.clone()),
                blocks,
            );
            ctx.instructors
                .insert(instructor.instructor_id.clone(), instructor);
        }

        let aircraft = if spec.all_aircraft {
            self.resources.list_aircraft()?
        } else {
            let mut list = Vec::with_capacity(spec.aircraft_ids.len());
            for id in &spec.aircraft_ids {
                if let Some(one) = self.resources.find_aircraft(id)? {
                    list.push(one);
                } else {
                    debug!(aircraft_id = %id, "context prefetch: aircraft does not resolve");
                }
            }
            list
        };
        let mut airport_icaos = spec.airport_icaos.clone();
        for one in aircraft {
            let blocks = self
                .environment
                .blocks_for(ResourceKind::Aircraft, &one.aircraft_id)?;
            ctx.availability
                .insert((ResourceKind::Aircraft, one.aircraft_id.clone()), blocks);
            airport_icaos.push(one.base_airport_icao.clone());
            ctx.aircraft.insert(one.aircraft_id.clone(), one);
        }

        for student in ctx.students.values() {
            airport_icaos.push(student.home_airport_icao.clone());
        }
        for instructor in ctx.instructors.values() {
            airport_icaos.push(instructor.base_airport_icao.clone());
        }

        airport_icaos.sort();
        airport_icaos.dedup();
        for icao in &airport_icaos {
            if let Some(airport) = self.resources.find_airport(icao)? {
                ctx.airports.insert(icao.clone(), airport);
            }
            if let Some(snapshot) = self.environment.latest_snapshot(icao)? {
                ctx.weather.insert(icao.clone(), snapshot);
            }
            let stats = self.assignments.cancellation_stats_by_airport(icao)?;
            ctx.cancellation_stats.insert(icao.clone(), stats);
        }

        ctx.committed = self
            .assignments
            .find_occupying_between(spec.horizon_start, spec.horizon_end)?;

        let student_ids: Vec<String> = ctx.students.keys().cloned().collect();
        for student_id in student_ids {
            let history = self.assignments.find_completed_by_student(&student_id)?;
            // lessons referenced by history feed the prerequisite check
            for past in &history {
                if let Some(lesson_id) = &past.lesson_id {
                    if !ctx.lessons.contains_key(lesson_id) {
                        if let Some(lesson) = self.resources.find_lesson(lesson_id)? {
                            ctx.lessons.insert(lesson_id.clone(), lesson);
                        }
                    }
                }
            }
            ctx.completed_by_student.insert(student_id, history);
        }

        Ok(ctx)
    }
}

impl StoreContextProvider {
    /// Resolve and cache one lesson after the bulk build (candidates may
    /// name lessons outside any student's history).
    pub fn load_lesson(&self, ctx: &mut SolveContext, lesson_id: &str) -> EngineResult<()> {
        if !ctx.lessons.contains_key(lesson_id) {
            if let Some(lesson) = self.resources.find_lesson(lesson_id)? {
                ctx.lessons.insert(lesson_id.to_string(), lesson);
            }
        }
        Ok(())
    }
}
