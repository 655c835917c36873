// ==========================================
// Flight Roster - scoring engine
// ==========================================
// Computes the six-dimension score breakdown for a feasible candidate.
// Each dimension lands in [0, 1]; the weighted total applies the plan's
// objective weights as given, with no re-normalization. Pure over the
// context snapshot, like the feasibility engine.
// ==========================================

use crate::config::SchedulingPolicy;
use crate::domain::assignment::CandidateAssignment;
use crate::domain::plan::ObjectiveWeights;
use crate::domain::score::{ScoreBreakdown, ScoreResult};
use crate::engine::context::SolveContext;
use crate::engine::error::EngineResult;
use std::sync::Arc;
use tracing::instrument;

/// Confidence assumed when an airport has no weather snapshot.
const NO_SNAPSHOT_CONFIDENCE: f64 = 0.3;
/// Historical cancellation rate assumed for airports with no history.
const DEFAULT_CANCELLATION_RATE: f64 = 0.1;
/// Completed sorties considered for continuity.
const CONTINUITY_WINDOW: usize = 5;

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[derive(Clone)]
pub struct ScoringEngine {
    policy: Arc<SchedulingPolicy>,
}

impl ScoringEngine {
    pub fn new(policy: Arc<SchedulingPolicy>) -> Self {
        Self { policy }
    }

    /// Score a candidate against the context and the solver's working set.
    /// `working` participates in the balance and utilization dimensions so
    /// the greedy pass sees the load it has already placed.
    #[instrument(skip(self, candidate, ctx, working, weights), fields(student_id = %candidate.student_id))]
    pub fn score(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        working: &[CandidateAssignment],
        weights: &ObjectiveWeights,
    ) -> EngineResult<ScoreResult> {
        let breakdown = self.breakdown(candidate, ctx, working)?;
        Ok(ScoreResult::new(breakdown, weights))
    }

    pub fn breakdown(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        working: &[CandidateAssignment],
    ) -> EngineResult<ScoreBreakdown> {
        // Resolve up front so every dimension can index directly.
        let student = ctx.student(&candidate.student_id)?;
        let instructor = ctx.instructor(&candidate.instructor_id)?;
        let aircraft = ctx.aircraft_by_id(&candidate.aircraft_id)?;
        let lesson = match &candidate.lesson_id {
            Some(id) => Some(ctx.lesson(id)?),
            None => None,
        };

        Ok(ScoreBreakdown {
            weather_fit: self.weather_fit(candidate, lesson.map(|l| &l.minima), ctx),
            instructor_balance: self.instructor_balance(candidate, ctx, working),
            travel_min: self.travel_min(candidate, student, instructor, aircraft),
            aircraft_utilization: self.aircraft_utilization(candidate, ctx, working),
            student_continuity: self.student_continuity(candidate, ctx),
            cancellation_risk: self.cancellation_risk(candidate, ctx),
        })
    }

    // ===== weather_fit: margin above minima, discounted by confidence =====
    // 0.0 when any hard limit is violated; without a snapshot, neutral
    // margins at the no-snapshot confidence discount.
    fn weather_fit(
        &self,
        candidate: &CandidateAssignment,
        minima: Option<&crate::domain::resources::WeatherMinima>,
        ctx: &SolveContext,
    ) -> f64 {
        let Some(snapshot) = ctx.weather_for(&candidate.airport_icao) else {
            return clamp01(0.5 * NO_SNAPSHOT_CONFIDENCE);
        };

        let mut margins: Vec<f64> = Vec::with_capacity(4);
        if let Some(minima) = minima {
            if let Some(min_ceiling) = minima.min_ceiling_ft {
                if snapshot.ceiling_ft < min_ceiling {
                    return 0.0;
                }
                if min_ceiling > 0.0 {
                    // margin ratio saturates at double the minimum
                    margins.push(clamp01((snapshot.ceiling_ft - min_ceiling) / min_ceiling));
                }
            }
            if let Some(min_vis) = minima.min_visibility_km {
                if snapshot.visibility_km < min_vis {
                    return 0.0;
                }
                if min_vis > 0.0 {
                    margins.push(clamp01((snapshot.visibility_km - min_vis) / min_vis));
                }
            }
            if let Some(max_wind) = minima.max_wind_kt {
                if snapshot.wind_kt > max_wind {
                    return 0.0;
                }
                if max_wind > 0.0 {
                    margins.push(clamp01((max_wind - snapshot.wind_kt) / max_wind));
                }
            }
            if let Some(max_crosswind) = minima.max_crosswind_kt {
                if snapshot.crosswind_kt > max_crosswind {
                    return 0.0;
                }
                if max_crosswind > 0.0 {
                    margins.push(clamp01((max_crosswind - snapshot.crosswind_kt) / max_crosswind));
                }
            }
            if !snapshot.is_daylight && !minima.night_allowed {
                return 0.0;
            }
        }

        let margin = if margins.is_empty() {
            0.5
        } else {
            margins.iter().sum::<f64>() / margins.len() as f64
        };
        clamp01(margin * clamp01(snapshot.confidence))
    }

    // ===== instructor_balance: deviation from mean projected load =====
    fn instructor_balance(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        working: &[CandidateAssignment],
    ) -> f64 {
        if ctx.instructors.is_empty() {
            return 0.0;
        }

        let mut load: std::collections::HashMap<&str, i64> = ctx
            .instructors
            .keys()
            .map(|id| (id.as_str(), 0i64))
            .collect();
        for a in ctx.committed.iter().filter(|a| a.status.occupies_resources()) {
            if let Some(minutes) = load.get_mut(a.instructor_id.as_str()) {
                *minutes += a.duration_minutes();
            }
        }
        for c in working {
            if let Some(minutes) = load.get_mut(c.instructor_id.as_str()) {
                *minutes += c.duration_minutes();
            }
        }

        let total_after: i64 =
            load.values().sum::<i64>() + candidate.duration_minutes();
        let avg_after = total_after as f64 / ctx.instructors.len() as f64;
        let load_after = load
            .get(candidate.instructor_id.as_str())
            .copied()
            .unwrap_or(0) as f64
            + candidate.duration_minutes() as f64;

        let denom = avg_after.max(1.0);
        clamp01(1.0 - (load_after - avg_after).abs() / denom)
    }

    // ===== travel_min: penalize repositioning away from home bases =====
    fn travel_min(
        &self,
        candidate: &CandidateAssignment,
        student: &crate::domain::resources::Student,
        instructor: &crate::domain::resources::Instructor,
        aircraft: &crate::domain::resources::Aircraft,
    ) -> f64 {
        let mut penalty = 0.0;
        if student.home_airport_icao != candidate.airport_icao {
            penalty += 0.5;
        }
        if aircraft.base_airport_icao != candidate.airport_icao {
            penalty += 0.25;
        }
        if instructor.base_airport_icao != candidate.airport_icao {
            penalty += 0.25;
        }
        clamp01(1.0 - penalty)
    }

    // ===== aircraft_utilization: closeness to the target duty curve =====
    fn aircraft_utilization(
        &self,
        candidate: &CandidateAssignment,
        ctx: &SolveContext,
        working: &[CandidateAssignment],
    ) -> f64 {
        let mut minutes: i64 = candidate.duration_minutes();
        for a in ctx.committed.iter().filter(|a| a.status.occupies_resources()) {
            if a.aircraft_id == candidate.aircraft_id {
                minutes += a.duration_minutes();
            }
        }
        for c in working {
            if c.aircraft_id == candidate.aircraft_id {
                minutes += c.duration_minutes();
            }
        }

        let target =
            self.policy.target_utilization_minutes_per_day * ctx.horizon_days().max(1.0);
        if target <= 0.0 {
            return 0.0;
        }
        let util = minutes as f64 / target;
        clamp01(1.0 - (1.0 - util).abs())
    }

    // ===== student_continuity: same instructor/aircraft as recent history =====
    fn student_continuity(&self, candidate: &CandidateAssignment, ctx: &SolveContext) -> f64 {
        let history = ctx.completed_for(&candidate.student_id);
        if history.is_empty() {
            // new student, nothing to be continuous with
            return 0.5;
        }
        let recent = &history[..history.len().min(CONTINUITY_WINDOW)];
        let n = recent.len() as f64;
        let same_instructor = recent
            .iter()
            .filter(|a| a.instructor_id == candidate.instructor_id)
            .count() as f64;
        let same_aircraft = recent
            .iter()
            .filter(|a| a.aircraft_id == candidate.aircraft_id)
            .count() as f64;
        clamp01(0.6 * (same_instructor / n) + 0.4 * (same_aircraft / n))
    }

    // ===== cancellation_risk: higher score means lower risk =====
    fn cancellation_risk(&self, candidate: &CandidateAssignment, ctx: &SolveContext) -> f64 {
        let confidence = ctx
            .weather_for(&candidate.airport_icao)
            .map(|s| clamp01(s.confidence))
            .unwrap_or(NO_SNAPSHOT_CONFIDENCE);
        let historical = ctx
            .cancellation_rate(&candidate.airport_icao)
            .unwrap_or(DEFAULT_CANCELLATION_RATE);
        clamp01(1.0 - (0.5 * (1.0 - confidence) + 0.5 * clamp01(historical)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resources::{
        Aircraft, Airport, Instructor, Lesson, Student, WeatherMinima, WeatherSnapshot,
    };
    use crate::domain::types::{AircraftStatus, AssignmentStatus};
    use crate::domain::{Assignment, FeasibilityReport};
    use chrono::{DateTime, TimeZone, Utc};

    const EPS: f64 = 1e-6;

    fn t(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, 0, 0).unwrap()
    }

    fn test_context() -> SolveContext {
        let mut ctx = SolveContext::empty(t(10, 0), t(11, 0));
        ctx.students.insert(
            "S1".to_string(),
            Student {
                student_id: "S1".to_string(),
                name: "Avery".to_string(),
                home_airport_icao: "KPAO".to_string(),
                enrolled_at: t(1, 0),
            },
        );
        for id in ["I1", "I2"] {
            ctx.instructors.insert(
                id.to_string(),
                Instructor {
                    instructor_id: id.to_string(),
                    name: id.to_string(),
                    ratings: vec!["CFI".to_string()],
                    base_airport_icao: "KPAO".to_string(),
                    max_daily_duty_minutes: None,
                },
            );
        }
        ctx.aircraft.insert(
            "AC1".to_string(),
            Aircraft {
                aircraft_id: "AC1".to_string(),
                tail_number: "N123AB".to_string(),
                model: "C172".to_string(),
                capability_tags: vec![],
                status: AircraftStatus::Available,
                base_airport_icao: "KPAO".to_string(),
                hours_to_maintenance: None,
                min_runway_ft: None,
            },
        );
        ctx.airports.insert(
            "KPAO".to_string(),
            Airport {
                icao: "KPAO".to_string(),
                name: "Palo Alto".to_string(),
                runway_length_ft: 2443.0,
                elevation_ft: 4.0,
            },
        );
        ctx
    }

    fn candidate() -> CandidateAssignment {
        CandidateAssignment {
            student_id: "S1".to_string(),
            instructor_id: "I1".to_string(),
            aircraft_id: "AC1".to_string(),
            lesson_id: None,
            airport_icao: "KPAO".to_string(),
            start_at: t(10, 9),
            end_at: t(10, 11),
        }
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::new(Arc::new(SchedulingPolicy::default()))
    }

    fn completed(id: &str, instructor: &str, aircraft: &str) -> Assignment {
        let mut c = candidate();
        c.instructor_id = instructor.to_string();
        c.aircraft_id = aircraft.to_string();
        let mut a = Assignment::from_candidate(
            "P1",
            &c,
            FeasibilityReport::default(),
            ScoreBreakdown::default(),
            0.5,
        );
        a.assignment_id = id.to_string();
        a.status = AssignmentStatus::Completed;
        a
    }

    #[test]
    fn all_dimensions_stay_in_bounds() {
        let ctx = test_context();
        let breakdown = engine().breakdown(&candidate(), &ctx, &[]).unwrap();
        assert!(breakdown.in_bounds(), "{:?}", breakdown);
    }

    #[test]
    fn minima_violation_zeroes_weather_fit() {
        let mut ctx = test_context();
        ctx.lessons.insert(
            "L1".to_string(),
            Lesson {
                lesson_id: "L1".to_string(),
                code: "VFR-1".to_string(),
                name: "First solo prep".to_string(),
                required_rating: None,
                required_capabilities: vec![],
                prerequisite_lesson_id: None,
                minima: WeatherMinima {
                    min_ceiling_ft: Some(3000.0),
                    ..WeatherMinima::default()
                },
            },
        );
        ctx.weather.insert(
            "KPAO".to_string(),
            WeatherSnapshot {
                airport_icao: "KPAO".to_string(),
                observed_at: t(10, 8),
                ceiling_ft: 1000.0,
                visibility_km: 10.0,
                wind_kt: 5.0,
                crosswind_kt: 2.0,
                is_daylight: true,
                confidence: 1.0,
            },
        );
        let mut c = candidate();
        c.lesson_id = Some("L1".to_string());
        let breakdown = engine().breakdown(&c, &ctx, &[]).unwrap();
        assert!(breakdown.weather_fit.abs() < EPS);
    }

    #[test]
    fn generous_margin_beats_tight_margin() {
        let minima = WeatherMinima {
            min_ceiling_ft: Some(2000.0),
            min_visibility_km: Some(5.0),
            ..WeatherMinima::default()
        };
        let lesson = Lesson {
            lesson_id: "L1".to_string(),
            code: "VFR-1".to_string(),
            name: "Pattern".to_string(),
            required_rating: None,
            required_capabilities: vec![],
            prerequisite_lesson_id: None,
            minima,
        };
        let snapshot = |ceiling: f64| WeatherSnapshot {
            airport_icao: "KPAO".to_string(),
            observed_at: t(10, 8),
            ceiling_ft: ceiling,
            visibility_km: 12.0,
            wind_kt: 5.0,
            crosswind_kt: 2.0,
            is_daylight: true,
            confidence: 0.9,
        };

        let mut ctx = test_context();
        ctx.lessons.insert("L1".to_string(), lesson);
        let mut c = candidate();
        c.lesson_id = Some("L1".to_string());

        ctx.weather.insert("KPAO".to_string(), snapshot(2100.0));
        let tight = engine().breakdown(&c, &ctx, &[]).unwrap().weather_fit;
        ctx.weather.insert("KPAO".to_string(), snapshot(5000.0));
        let generous = engine().breakdown(&c, &ctx, &[]).unwrap().weather_fit;
        assert!(generous > tight, "{generous} vs {tight}");
    }

    #[test]
    fn balance_prefers_idle_instructor() {
        let mut ctx = test_context();
        // I1 already carries two committed sorties
        for (id, (s, e)) in [("A1", (6, 8)), ("A2", (12, 14))] {
            let mut a = completed(id, "I1", "AC1");
            a.status = AssignmentStatus::Scheduled;
            a.start_at = t(10, s);
            a.end_at = t(10, e);
            ctx.committed.push(a);
        }
        let e = engine();
        let busy = e.breakdown(&candidate(), &ctx, &[]).unwrap().instructor_balance;
        let mut c = candidate();
        c.instructor_id = "I2".to_string();
        let idle = e.breakdown(&c, &ctx, &[]).unwrap().instructor_balance;
        assert!(idle > busy, "{idle} vs {busy}");
    }

    #[test]
    fn travel_penalizes_away_games() {
        let mut ctx = test_context();
        ctx.airports.insert(
            "KSQL".to_string(),
            Airport {
                icao: "KSQL".to_string(),
                name: "San Carlos".to_string(),
                runway_length_ft: 2600.0,
                elevation_ft: 5.0,
            },
        );
        let e = engine();
        let home = e.breakdown(&candidate(), &ctx, &[]).unwrap().travel_min;
        assert!((home - 1.0).abs() < EPS);

        let mut c = candidate();
        c.airport_icao = "KSQL".to_string();
        let away = e.breakdown(&c, &ctx, &[]).unwrap().travel_min;
        // student + aircraft + instructor all based elsewhere
        assert!(away.abs() < EPS);
    }

    #[test]
    fn continuity_rewards_familiar_pairings() {
        let mut ctx = test_context();
        ctx.completed_by_student.insert(
            "S1".to_string(),
            vec![
                completed("H1", "I1", "AC1"),
                completed("H2", "I1", "AC1"),
                completed("H3", "I2", "AC1"),
            ],
        );
        let e = engine();
        let familiar = e.breakdown(&candidate(), &ctx, &[]).unwrap().student_continuity;
        // 0.6 * 2/3 + 0.4 * 3/3
        assert!((familiar - (0.6 * 2.0 / 3.0 + 0.4)).abs() < EPS);

        let mut c = candidate();
        c.instructor_id = "I2".to_string();
        let less_familiar = e.breakdown(&c, &ctx, &[]).unwrap().student_continuity;
        assert!(familiar > less_familiar);
    }

    #[test]
    fn no_history_scores_neutral_continuity() {
        let ctx = test_context();
        let breakdown = engine().breakdown(&candidate(), &ctx, &[]).unwrap();
        assert!((breakdown.student_continuity - 0.5).abs() < EPS);
    }

    #[test]
    fn cancellation_risk_reflects_history_and_confidence() {
        let mut ctx = test_context();
        ctx.weather.insert(
            "KPAO".to_string(),
            WeatherSnapshot {
                airport_icao: "KPAO".to_string(),
                observed_at: t(10, 8),
                ceiling_ft: 5000.0,
                visibility_km: 10.0,
                wind_kt: 5.0,
                crosswind_kt: 2.0,
                is_daylight: true,
                confidence: 1.0,
            },
        );
        ctx.cancellation_stats.insert("KPAO".to_string(), (0, 20));
        let safe = engine().breakdown(&candidate(), &ctx, &[]).unwrap().cancellation_risk;
        assert!((safe - 1.0).abs() < EPS);

        ctx.cancellation_stats.insert("KPAO".to_string(), (10, 20));
        let risky = engine().breakdown(&candidate(), &ctx, &[]).unwrap().cancellation_risk;
        assert!(risky < safe);
        assert!((risky - 0.75).abs() < EPS);
    }

    #[test]
    fn weighted_total_respects_weights() {
        let ctx = test_context();
        let e = engine();
        let mut weights = crate::domain::ObjectiveWeights::default();
        let even = e.score(&candidate(), &ctx, &[], &weights).unwrap();
        assert!(even.total_score >= 0.0);

        // zero everything except travel; candidate is fully home-based
        weights = crate::domain::ObjectiveWeights {
            weather_fit: 0.0,
            instructor_balance: 0.0,
            travel_min: 1.0,
            aircraft_utilization: 0.0,
            student_continuity: 0.0,
            cancellation_risk: 0.0,
        };
        let travel_only = e.score(&candidate(), &ctx, &[], &weights).unwrap();
        assert!((travel_only.total_score - 1.0).abs() < EPS);
    }
}
