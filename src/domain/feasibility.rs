// ==========================================
// Flight Roster - feasibility evaluation records
// ==========================================
// Constraint failures are data, not errors: each evaluation of a
// candidate produces one ConstraintResult per constraint type and the
// aggregate FeasibilityReport. Reports are ephemeral unless attached to
// a persisted Assignment as its feasibility proof.
// ==========================================

use crate::domain::types::ConstraintType;
use serde::{Deserialize, Serialize};

// ==========================================
// ConstraintResult - one named constraint against one candidate
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub constraint: ConstraintType,
    pub passed: bool,
    /// Blocking failures make the assignment operationally invalid;
    /// non-blocking failures are advisory risk signals.
    pub blocking: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConstraintResult {
    pub fn pass(constraint: ConstraintType, message: impl Into<String>) -> Self {
        Self {
            constraint,
            passed: true,
            blocking: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn blocking_failure(constraint: ConstraintType, message: impl Into<String>) -> Self {
        Self {
            constraint,
            passed: false,
            blocking: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn warning(constraint: ConstraintType, message: impl Into<String>) -> Self {
        Self {
            constraint,
            passed: false,
            blocking: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_blocking_failure(&self) -> bool {
        self.blocking && !self.passed
    }
}

// ==========================================
// FeasibilityReport - aggregate over all constraints for one candidate
// ==========================================
// feasible == true iff no result is a blocking failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub feasible: bool,
    pub constraints: Vec<ConstraintResult>,
    pub blocking_issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl FeasibilityReport {
    /// Aggregate constraint results, deriving feasible / blocking_issues /
    /// warnings from the blocking flags.
    pub fn from_results(constraints: Vec<ConstraintResult>) -> Self {
        let blocking_issues: Vec<String> = constraints
            .iter()
            .filter(|c| c.is_blocking_failure())
            .map(|c| c.message.clone())
            .collect();
        let warnings: Vec<String> = constraints
            .iter()
            .filter(|c| !c.passed && !c.blocking)
            .map(|c| c.message.clone())
            .collect();
        Self {
            feasible: blocking_issues.is_empty(),
            constraints,
            blocking_issues,
            warnings,
        }
    }

    pub fn result_for(&self, constraint: ConstraintType) -> Option<&ConstraintResult> {
        self.constraints.iter().find(|c| c.constraint == constraint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feasible_iff_no_blocking_failures() {
        let report = FeasibilityReport::from_results(vec![
            ConstraintResult::pass(ConstraintType::Availability, "instructor and aircraft free"),
            ConstraintResult::warning(ConstraintType::AircraftCapabilities, "maintenance due in 4.0h"),
        ]);
        assert!(report.feasible);
        assert!(report.blocking_issues.is_empty());
        assert_eq!(report.warnings.len(), 1);

        let report = FeasibilityReport::from_results(vec![
            ConstraintResult::pass(ConstraintType::Availability, "ok"),
            ConstraintResult::blocking_failure(ConstraintType::WeatherMinima, "ceiling 1500ft below minimum 3000ft"),
        ]);
        assert!(!report.feasible);
        assert_eq!(report.blocking_issues.len(), 1);
    }

    #[test]
    fn proof_serializes_round_trip() {
        let report = FeasibilityReport::from_results(vec![ConstraintResult::blocking_failure(
            ConstraintType::DutyRules,
            "daily duty 510min exceeds cap 480min",
        )
        .with_details(serde_json::json!({"scheduled_minutes": 390, "candidate_minutes": 120}))]);
        let json = serde_json::to_string(&report).unwrap();
        let back: FeasibilityReport = serde_json::from_str(&json).unwrap();
        assert!(!back.feasible);
        assert_eq!(back.constraints[0].constraint, ConstraintType::DutyRules);
        assert!(back.constraints[0].details.is_some());
    }
}
