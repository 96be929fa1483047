//! Per-case verdicts and run aggregation.

use serde::{Deserialize, Serialize};

/// Final category of a classified case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Panic,
    Timeout,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Panic => "panic",
            Self::Timeout => "timeout",
        }
    }
}

/// Result of running a single case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseVerdict {
    /// Name of the case.
    pub case_name: String,
    /// Whether the case passed.
    pub passed: bool,
    /// Classified outcome.
    pub outcome: Outcome,
    /// Human-readable message (`PASS: "name"`, `FAIL: "name" ...`).
    pub message: String,
    /// Wall-clock time from dispatch to classification.
    pub duration_ms: u64,
}

/// Aggregate of one run over every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total cases run.
    pub total: usize,
    /// Cases passed.
    pub passed: usize,
    /// Cases failed (including panics and timeouts).
    pub failed: usize,
    /// Individual verdicts, ordered by case name.
    pub results: Vec<CaseVerdict>,
}

impl RunSummary {
    /// Build a summary from a list of verdicts.
    #[must_use]
    pub fn from_results(mut results: Vec<CaseVerdict>) -> Self {
        results.sort_by(|a, b| a.case_name.cmp(&b.case_name));
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        Self {
            total,
            passed,
            failed,
            results,
        }
    }

    /// Returns true if all cases passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseVerdict> {
        self.results.iter().filter(|r| !r.passed)
    }

    #[must_use]
    pub fn get(&self, case_name: &str) -> Option<&CaseVerdict> {
        self.results.iter().find(|r| r.case_name == case_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(name: &str, outcome: Outcome) -> CaseVerdict {
        CaseVerdict {
            case_name: name.to_string(),
            passed: outcome == Outcome::Pass,
            outcome,
            message: String::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn summary_counts_and_orders() {
        let summary = RunSummary::from_results(vec![
            verdict("b", Outcome::Timeout),
            verdict("a", Outcome::Pass),
            verdict("c", Outcome::Panic),
        ]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert!(!summary.all_passed());
        let names: Vec<&str> = summary.results.iter().map(|r| r.case_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(summary.failures().count(), 2);
        assert_eq!(summary.get("b").map(|r| r.outcome), Some(Outcome::Timeout));
    }

    #[test]
    fn outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Outcome::Timeout).unwrap(), "\"timeout\"");
        assert_eq!(Outcome::Panic.as_str(), "panic");
    }
}
