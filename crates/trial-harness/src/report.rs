//! Run reports.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::verdict::RunSummary;

/// A rendered view of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    /// Report title.
    pub title: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Run summary.
    pub summary: RunSummary,
}

impl TrialReport {
    #[must_use]
    pub fn new(title: impl Into<String>, timestamp: impl Into<String>, summary: RunSummary) -> Self {
        Self {
            title: title.into(),
            timestamp: timestamp.into(),
            summary,
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.title);
        let _ = writeln!(out, "- Timestamp: {}", self.timestamp);
        let _ = writeln!(out, "- Total: {}", self.summary.total);
        let _ = writeln!(out, "- Passed: {}", self.summary.passed);
        let _ = writeln!(out, "- Failed: {}", self.summary.failed);
        let _ = writeln!(out, "- Fingerprint: {}\n", self.fingerprint());

        out.push_str("| Case | Outcome | Duration (ms) |\n");
        out.push_str("|------|---------|---------------|\n");
        for r in &self.summary.results {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                r.case_name.replace('|', "\\|"),
                r.outcome.as_str(),
                r.duration_ms
            );
        }

        if !self.summary.all_passed() {
            out.push_str("\n## Failures\n");
            for r in self.summary.failures() {
                let _ = write!(out, "\n### {}\n\n```text\n{}\n```\n", r.case_name, r.message);
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// SHA-256 over each case's name, outcome and message.
    ///
    /// Timestamps and durations are left out, so two runs with the same
    /// verdicts share a fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for r in &self.summary.results {
            hasher.update(r.case_name.as_bytes());
            hasher.update([0_u8]);
            hasher.update(r.outcome.as_str().as_bytes());
            hasher.update([0_u8]);
            hasher.update(r.message.as_bytes());
            hasher.update([0xff_u8]);
        }
        hex_lower(&hasher.finalize())
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::{CaseVerdict, Outcome};

    fn summary(duration_ms: u64) -> RunSummary {
        RunSummary::from_results(vec![
            CaseVerdict {
                case_name: "ok".to_string(),
                passed: true,
                outcome: Outcome::Pass,
                message: "PASS: \"ok\"".to_string(),
                duration_ms,
            },
            CaseVerdict {
                case_name: "slow".to_string(),
                passed: false,
                outcome: Outcome::Timeout,
                message: "FAIL: \"slow\" timeout after 1ms".to_string(),
                duration_ms,
            },
        ])
    }

    #[test]
    fn markdown_lists_every_case_and_failure() {
        let report = TrialReport::new("divide", "2026-01-01T00:00:00.000Z", summary(1));
        let md = report.to_markdown();
        assert!(md.starts_with("# divide\n"));
        assert!(md.contains("- Total: 2"));
        assert!(md.contains("| ok | pass | 1 |"));
        assert!(md.contains("| slow | timeout | 1 |"));
        assert!(md.contains("## Failures"));
        assert!(md.contains("FAIL: \"slow\" timeout after 1ms"));
    }

    #[test]
    fn json_roundtrips() {
        let report = TrialReport::new("divide", "t", summary(0));
        let restored: TrialReport = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(restored.summary, report.summary);
    }

    #[test]
    fn fingerprint_ignores_timing() {
        let a = TrialReport::new("divide", "t1", summary(1));
        let b = TrialReport::new("divide", "t2", summary(900));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut changed = summary(1);
        changed.results[0].message.push('!');
        assert_ne!(
            a.fingerprint(),
            TrialReport::new("divide", "t1", changed).fingerprint()
        );
    }
}
