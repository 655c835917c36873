// ==========================================
// Flight Roster - feasibility engine
// ==========================================
// Evaluates every constraint type against a candidate assignment and
// returns a FeasibilityReport. Pure and deterministic over a context
// snapshot: safe to call speculatively inside the solver's hot loop.
// No writes; every rule outputs an explicit message.
// ==========================================

use crate::config::SchedulingPolicy;
use crate::domain::assignment::{Assignment, CandidateAssignment};
use crate::domain::feasibility::{ConstraintResult, FeasibilityReport};
use crate::domain::resources::{Lesson, WeatherSnapshot};
use crate::domain::types::{ConstraintType, ResourceKind};
use crate::engine::context::SolveContext;
use crate::engine::error::EngineResult;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct FeasibilityEngine {
    policy: Arc<SchedulingPolicy>,
}

impl FeasibilityEngine {
    pub fn new(policy: Arc<SchedulingPolicy>) -> Self {
        Self { policy }
    }

    /// Evaluate all constraint types for one candidate.
    ///
    /// `working` is the solver's uncommitted in-progress solution;
    /// double-booking and duty accumulation consider it alongside the
    /// context's committed assignments. `exclude_assignment_id` drops one
    /// committed assignment from consideration — replanning evaluates
    /// replacements for an assignment that must not conflict with itself.
    #[instrument(skip(self, candidate, ctx, working), fields(student_id = %candidate.student_id))]
    pub fn check(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        working: &[CandidateAssignment],
        exclude_assignment_id: Option<&str>,
    ) -> EngineResult<FeasibilityReport> {
        if candidate.end_at <= candidate.start_at {
            return Err(crate::engine::error::EngineError::InvalidInput(format!(
                "candidate window end {} not after start {}",
                candidate.end_at, candidate.start_at
            )));
        }

        // Resolve every referenced id up front; failures here are
        // ResolutionErrors, not constraint failures.
        ctx.student(&candidate.student_id)?;
        let instructor = ctx.instructor(&candidate.instructor_id)?;
        let aircraft = ctx.aircraft_by_id(&candidate.aircraft_id)?;
        let airport = ctx.airport(&candidate.airport_icao)?;
        let lesson = match &candidate.lesson_id {
            Some(id) => Some(ctx.lesson(id)?),
            None => None,
        };

        let committed: Vec<&Assignment> = ctx
            .committed
            .iter()
            .filter(|a| {
                a.status.occupies_resources()
                    && exclude_assignment_id != Some(a.assignment_id.as_str())
            })
            .collect();

        let mut results = Vec::with_capacity(ConstraintType::ALL.len());
        results.push(self.check_availability(candidate, ctx, &committed, working));
        results.push(self.check_qualifications(candidate, lesson, instructor));
        results.push(self.check_aircraft_capabilities(lesson, aircraft));
        results.push(self.check_airport_performance(aircraft, airport));
        results.push(self.check_weather_minima(candidate, lesson, ctx.weather_for(&candidate.airport_icao)));
        results.push(self.check_duty_rules(candidate, instructor, &committed, working));
        results.push(self.check_student_prerequisites(candidate, lesson, ctx));

        Ok(FeasibilityReport::from_results(results))
    }

    // ===== availability: calendars, aircraft status, double-booking =====
    fn check_availability(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        committed: &[&Assignment],
        working: &[CandidateAssignment],
    ) -> ConstraintResult {
        let mut issues: Vec<String> = Vec::new();

        let aircraft = &ctx.aircraft[&candidate.aircraft_id];
        if !aircraft.status.is_schedulable() {
            issues.push(format!(
                "aircraft {} is {}",
                candidate.aircraft_id, aircraft.status
            ));
        }

        let instructor_blocks = ctx.blocks_for(ResourceKind::Instructor, &candidate.instructor_id);
        if !instructor_blocks
            .iter()
            .any(|b| b.covers(candidate.start_at, candidate.end_at))
        {
            issues.push(format!(
                "instructor {} has no availability covering [{}, {})",
                candidate.instructor_id, candidate.start_at, candidate.end_at
            ));
        }

        let aircraft_blocks = ctx.blocks_for(ResourceKind::Aircraft, &candidate.aircraft_id);
        if !aircraft_blocks
            .iter()
            .any(|b| b.covers(candidate.start_at, candidate.end_at))
        {
            issues.push(format!(
                "aircraft {} has no availability covering [{}, {})",
                candidate.aircraft_id, candidate.start_at, candidate.end_at
            ));
        }

        // Double-booking: shared instructor OR aircraft with half-open
        // window overlap is mutually blocking.
        for other in committed {
            if (other.instructor_id == candidate.instructor_id
                || other.aircraft_id == candidate.aircraft_id)
                && candidate.overlaps(other.start_at, other.end_at)
            {
                issues.push(format!(
                    "double-booking with assignment {} ({} / {}) over [{}, {})",
                    other.assignment_id, other.instructor_id, other.aircraft_id,
                    other.start_at, other.end_at
                ));
            }
        }
        for other in working {
            if (other.instructor_id == candidate.instructor_id
                || other.aircraft_id == candidate.aircraft_id)
                && candidate.overlaps(other.start_at, other.end_at)
            {
                issues.push(format!(
                    "double-booking with in-progress sortie for student {} ({} / {}) over [{}, {})",
                    other.student_id, other.instructor_id, other.aircraft_id,
                    other.start_at, other.end_at
                ));
            }
        }

        if issues.is_empty() {
            ConstraintResult::pass(
                ConstraintType::Availability,
                "instructor and aircraft available, no conflicting booking",
            )
        } else {
            ConstraintResult::blocking_failure(ConstraintType::Availability, issues.join("; "))
        }
    }

    // ===== qualifications: instructor rating vs lesson =====
    fn check_qualifications(
        &self,
        candidate: &CandidateAssignment,
        lesson: Option<&Lesson>,
        instructor: &crate::domain::resources::Instructor,
    ) -> ConstraintResult {
        let Some(lesson) = lesson else {
            return ConstraintResult::pass(
                ConstraintType::Qualifications,
                "no lesson-specific rating required",
            );
        };
        match &lesson.required_rating {
            Some(rating) if !instructor.holds_rating(rating) => ConstraintResult::blocking_failure(
                ConstraintType::Qualifications,
                format!(
                    "instructor {} lacks rating {} required by lesson {}",
                    candidate.instructor_id, rating, lesson.code
                ),
            )
            .with_details(json!({ "required_rating": rating, "held": instructor.ratings })),
            _ => ConstraintResult::pass(
                ConstraintType::Qualifications,
                "instructor holds the required rating",
            ),
        }
    }

    // ===== aircraft capabilities and maintenance horizon =====
    fn check_aircraft_capabilities(
        &self,
        lesson: Option<&Lesson>,
        aircraft: &crate::domain::resources::Aircraft,
    ) -> ConstraintResult {
        if let Some(lesson) = lesson {
            let missing: Vec<&String> = lesson
                .required_capabilities
                .iter()
                .filter(|cap| !aircraft.has_capability(cap))
                .collect();
            if !missing.is_empty() {
                return ConstraintResult::blocking_failure(
                    ConstraintType::AircraftCapabilities,
                    format!(
                        "aircraft {} missing capabilities required by lesson {}: {:?}",
                        aircraft.aircraft_id, lesson.code, missing
                    ),
                );
            }
        }

        if let Some(hours) = aircraft.hours_to_maintenance {
            if hours < self.policy.maintenance_warning_hours {
                return ConstraintResult::warning(
                    ConstraintType::AircraftCapabilities,
                    format!(
                        "aircraft {} maintenance due in {:.1}h",
                        aircraft.aircraft_id, hours
                    ),
                );
            }
        }

        ConstraintResult::pass(
            ConstraintType::AircraftCapabilities,
            "aircraft equipped for the lesson",
        )
    }

    // ===== airport performance: runway vs aircraft minimum =====
    fn check_airport_performance(
        &self,
        aircraft: &crate::domain::resources::Aircraft,
        airport: &crate::domain::resources::Airport,
    ) -> ConstraintResult {
        if let Some(min_runway) = aircraft.min_runway_ft {
            if airport.runway_length_ft < min_runway {
                return ConstraintResult::blocking_failure(
                    ConstraintType::AirportPerformance,
                    format!(
                        "runway {:.0}ft at {} below {:.0}ft minimum for {}",
                        airport.runway_length_ft, airport.icao, min_runway, aircraft.model
                    ),
                );
            }
        }
        ConstraintResult::pass(
            ConstraintType::AirportPerformance,
            "airport performance adequate",
        )
    }

    // ===== weather minima vs latest snapshot =====
    fn check_weather_minima(
        &self,
        candidate: &CandidateAssignment,
        lesson: Option<&Lesson>,
        snapshot: Option<&WeatherSnapshot>,
    ) -> ConstraintResult {
        let Some(snapshot) = snapshot else {
            return ConstraintResult::warning(
                ConstraintType::WeatherMinima,
                format!("no recent weather snapshot for {}", candidate.airport_icao),
            );
        };

        let mut violations: Vec<String> = Vec::new();
        if let Some(lesson) = lesson {
            let minima = &lesson.minima;
            if let Some(min_ceiling) = minima.min_ceiling_ft {
                if snapshot.ceiling_ft < min_ceiling {
                    violations.push(format!(
                        "ceiling {:.0}ft below minimum {:.0}ft",
                        snapshot.ceiling_ft, min_ceiling
                    ));
                }
            }
            if let Some(min_vis) = minima.min_visibility_km {
                if snapshot.visibility_km < min_vis {
                    violations.push(format!(
                        "visibility {:.1}km below minimum {:.1}km",
                        snapshot.visibility_km, min_vis
                    ));
                }
            }
            if let Some(max_wind) = minima.max_wind_kt {
                if snapshot.wind_kt > max_wind {
                    violations.push(format!(
                        "wind {:.0}kt above maximum {:.0}kt",
                        snapshot.wind_kt, max_wind
                    ));
                }
            }
            if let Some(max_crosswind) = minima.max_crosswind_kt {
                if snapshot.crosswind_kt > max_crosswind {
                    violations.push(format!(
                        "crosswind {:.0}kt above maximum {:.0}kt",
                        snapshot.crosswind_kt, max_crosswind
                    ));
                }
            }
            if !snapshot.is_daylight && !minima.night_allowed {
                violations.push(format!("lesson {} does not permit night operations", lesson.code));
            }
        }

        if !violations.is_empty() {
            let message = violations.join("; ");
            let details = json!({
                "airport": candidate.airport_icao,
                "observed_at": snapshot.observed_at,
                "waiver_applied": self.policy.allow_weather_waiver,
            });
            // Waiver policy demotes minima failures to advisory.
            return if self.policy.allow_weather_waiver {
                ConstraintResult::warning(ConstraintType::WeatherMinima, message)
                    .with_details(details)
            } else {
                ConstraintResult::blocking_failure(ConstraintType::WeatherMinima, message)
                    .with_details(details)
            };
        }

        if snapshot.confidence < self.policy.min_weather_confidence {
            return ConstraintResult::warning(
                ConstraintType::WeatherMinima,
                format!(
                    "forecast confidence {:.2} below {:.2}",
                    snapshot.confidence, self.policy.min_weather_confidence
                ),
            );
        }

        ConstraintResult::pass(ConstraintType::WeatherMinima, "weather above lesson minima")
    }

    // ===== duty rules: daily instructor duty cap =====
    fn check_duty_rules(
        &self,
        candidate: &CandidateAssignment,
        instructor: &crate::domain::resources::Instructor,
        committed: &[&Assignment],
        working: &[CandidateAssignment],
    ) -> ConstraintResult {
        let day = candidate.start_at.date_naive();
        let mut scheduled_minutes: i64 = 0;
        for other in committed {
            if other.instructor_id == candidate.instructor_id
                && other.start_at.date_naive() == day
            {
                scheduled_minutes += other.duration_minutes();
            }
        }
        for other in working {
            if other.instructor_id == candidate.instructor_id
                && other.start_at.date_naive() == day
            {
                scheduled_minutes += other.duration_minutes();
            }
        }

        let cap = instructor
            .max_daily_duty_minutes
            .unwrap_or(self.policy.max_daily_duty_minutes);
        let after = scheduled_minutes + candidate.duration_minutes();

        if after > cap {
            return ConstraintResult::blocking_failure(
                ConstraintType::DutyRules,
                format!(
                    "daily duty {}min exceeds cap {}min for instructor {}",
                    after, cap, candidate.instructor_id
                ),
            )
            .with_details(json!({
                "scheduled_minutes": scheduled_minutes,
                "candidate_minutes": candidate.duration_minutes(),
                "cap_minutes": cap,
            }));
        }

        if (after as f64) > (cap as f64) * self.policy.duty_warning_ratio {
            return ConstraintResult::warning(
                ConstraintType::DutyRules,
                format!(
                    "daily duty {}min approaching cap {}min for instructor {}",
                    after, cap, candidate.instructor_id
                ),
            );
        }

        ConstraintResult::pass(ConstraintType::DutyRules, "within daily duty limits")
    }

    // ===== student prerequisites: completed-lesson history =====
    fn check_student_prerequisites(
        &self,
        candidate: &CandidateAssignment,
        lesson: Option<&Lesson>,
        ctx: &SolveContext,
    ) -> ConstraintResult {
        let Some(lesson) = lesson else {
            return ConstraintResult::pass(
                ConstraintType::StudentPrerequisites,
                "no lesson prerequisites apply",
            );
        };
        let Some(prerequisite) = &lesson.prerequisite_lesson_id else {
            return ConstraintResult::pass(
                ConstraintType::StudentPrerequisites,
                "lesson has no prerequisite",
            );
        };

        let satisfied = ctx
            .completed_for(&candidate.student_id)
            .iter()
            .any(|past| past.lesson_id.as_deref() == Some(prerequisite.as_str()));

        if satisfied {
            ConstraintResult::pass(ConstraintType::StudentPrerequisites, "prerequisite completed")
        } else {
            ConstraintResult::blocking_failure(
                ConstraintType::StudentPrerequisites,
                format!(
                    "student {} has not completed prerequisite lesson {} for {}",
                    candidate.student_id, prerequisite, lesson.code
                ),
            )
        }
    }
}
