//! Table-driven trial harness.
//!
//! This crate provides:
//! - Cases: named inputs with expected values, errors or panics
//! - Execution: each case on its own thread with panic capture and deadlines
//! - Classification: stable `PASS:` / `FAIL:` / `PANIC:` verdict messages
//! - Reporting: reporter trait, structured JSONL log, markdown/JSON reports
//!
//! Comparison is done by [`trial_diff`]; its entry points are re-exported.

#![forbid(unsafe_code)]

pub mod case;
pub mod config;
mod engine;
pub mod error;
pub mod harness;
mod panic;
pub mod report;
pub mod reporter;
pub mod structured_log;
pub mod verdict;

pub use case::{Case, CaseError, Cases, ErrorMatcher};
pub use config::{Schedule, TrialConfig};
pub use error::TrialError;
pub use harness::Trial;
pub use panic::{clean_stack, panic_message};
pub use report::TrialReport;
pub use reporter::{CollectingReporter, ConsoleReporter, LogReporter, ReportEntry, Reporter};
pub use structured_log::{LogEmitter, LogEntry, LogHandle, LogLevel};
pub use verdict::{CaseVerdict, Outcome, RunSummary};

pub use trial_diff::{contains, equal, equal_with, EqualOptions, Input, Textual};
