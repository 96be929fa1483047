//! The trial: a case table bound to a function under test.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use trial_diff::EqualOptions;

use crate::case::{Case, CaseError, Cases};
use crate::config::{Schedule, TrialConfig};
use crate::engine::{self, CompareFn, Execution, TestFn};
use crate::error::TrialError;
use crate::reporter::{paint_red, ConsoleReporter, Reporter};
use crate::structured_log::{LogEntry, LogHandle, LogLevel};
use crate::verdict::{CaseVerdict, Outcome, RunSummary};

/// A table of named cases run against one function.
///
/// ```
/// use trial_harness::{Case, CollectingReporter, Trial};
///
/// fn divide((a, b): (i32, i32)) -> Result<i32, String> {
///     if b == 0 {
///         return Err("divide by zero".to_string());
///     }
///     Ok(a / b)
/// }
///
/// let trial = Trial::new(divide, [
///     ("ok", Case::new((10, 2), 5)),
///     ("by zero", Case::new((1, 0), 0).should_err()),
/// ]);
/// let summary = trial.run_all(&CollectingReporter::new());
/// assert!(summary.all_passed());
/// ```
pub struct Trial<In, Out> {
    name: String,
    cases: Cases<In, Out>,
    func: TestFn<In, Out>,
    compare: CompareFn<Out>,
    config: TrialConfig,
    log: Option<LogHandle>,
}

impl<In, Out> Trial<In, Out>
where
    In: Clone + Send + Sync + 'static,
    Out: Serialize + Send + Sync + 'static,
{
    /// Bind `func` to `cases`; values are compared with [`trial_diff::equal`].
    ///
    /// Settings start from [`TrialConfig::from_env`].
    #[must_use]
    pub fn new<F, E, I, S>(func: F, cases: I) -> Self
    where
        F: Fn(In) -> Result<Out, E> + Send + Sync + 'static,
        E: Into<CaseError>,
        I: IntoIterator<Item = (S, Case<In, Out>)>,
        S: Into<String>,
    {
        Self::with_compare(
            func,
            |actual: &Out, expected: &Out| trial_diff::equal(actual, expected),
            cases,
        )
    }

    /// Compare with [`trial_diff::equal_with`] under `options`.
    #[must_use]
    pub fn with_options(self, options: EqualOptions) -> Self {
        self.with_comparator(move |actual: &Out, expected: &Out| options.equal(actual, expected))
    }

    /// Compare with [`trial_diff::contains`]: the expected value only needs
    /// to be contained in the produced one.
    #[must_use]
    pub fn with_containment(self) -> Self {
        self.with_comparator(|actual: &Out, expected: &Out| trial_diff::contains(actual, expected))
    }
}

impl<In, Out> Trial<In, Out>
where
    In: Clone + Send + Sync + 'static,
    Out: Send + Sync + 'static,
{
    /// Bind `func` to `cases`, comparing produced values with `compare`.
    ///
    /// `Out` need not be `Serialize` here; `compare` returns
    /// `(equal, diff)` like [`trial_diff::equal`].
    #[must_use]
    pub fn with_compare<F, E, C, I, S>(func: F, compare: C, cases: I) -> Self
    where
        F: Fn(In) -> Result<Out, E> + Send + Sync + 'static,
        E: Into<CaseError>,
        C: Fn(&Out, &Out) -> (bool, String) + Send + Sync + 'static,
        I: IntoIterator<Item = (S, Case<In, Out>)>,
        S: Into<String>,
    {
        Self {
            name: "trial".to_string(),
            cases: cases
                .into_iter()
                .map(|(name, case)| (name.into(), case))
                .collect(),
            func: Arc::new(move |input: In| -> Result<Out, CaseError> {
                func(input).map_err(Into::into)
            }),
            compare: Arc::new(compare),
            config: TrialConfig::from_env(),
            log: None,
        }
    }

    /// Replace the comparator used on produced values.
    ///
    /// It returns `(equal, diff)`; the diff text ends up in the failure
    /// message.
    #[must_use]
    pub fn with_comparator<C>(mut self, compare: C) -> Self
    where
        C: Fn(&Out, &Out) -> (bool, String) + Send + Sync + 'static,
    {
        self.compare = Arc::new(compare);
        self
    }

    /// Fail any case that has not finished within `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Replace every setting at once.
    ///
    /// The last call wins: a timeout or schedule set earlier through
    /// [`Trial::with_timeout`] or [`Trial::parallel`] is overwritten, while
    /// those builders applied afterwards adjust the new configuration.
    #[must_use]
    pub fn with_config(mut self, config: TrialConfig) -> Self {
        self.config = config;
        self
    }

    /// Emit `run_start`, `case_pass` / `case_fail` and `run_end` events.
    #[must_use]
    pub fn with_log(mut self, log: LogHandle) -> Self {
        self.log = Some(log);
        self
    }

    /// Name used in log entries and reports.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Dispatch every case at once.
    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.config.schedule = Schedule::Parallel;
        self
    }

    /// Add or replace one case.
    #[must_use]
    pub fn case(mut self, name: impl Into<String>, case: Case<In, Out>) -> Self {
        self.cases.insert(name.into(), case);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    #[must_use]
    pub fn case_names(&self) -> Vec<&str> {
        self.cases.keys().map(String::as_str).collect()
    }

    /// Run a single case by name.
    pub fn run_case(&self, name: &str) -> Result<CaseVerdict, TrialError> {
        let case = self
            .cases
            .get(name)
            .ok_or_else(|| TrialError::UnknownCase(name.to_string()))?;
        let verdict = self.verdict(name, case);
        self.log_verdict(&verdict);
        Ok(verdict)
    }

    /// Run every case; passes go to [`Reporter::log`], failures to
    /// [`Reporter::fail`]. Never stops early.
    pub fn run_all(&self, reporter: &dyn Reporter) -> RunSummary {
        self.run(&|verdict: &CaseVerdict| {
            if verdict.passed {
                reporter.log(&verdict.message);
            } else {
                reporter.fail(&self.painted(&verdict.message));
            }
        })
    }

    /// Run every case as its own [`Reporter::unit`], named after the case.
    ///
    /// Failure text inside the unit omits the quoted case name and the
    /// `FAIL:` prefix, which the unit name already conveys.
    pub fn run_all_isolated(&self, reporter: &dyn Reporter) -> RunSummary {
        self.run(&|verdict: &CaseVerdict| {
            reporter.unit(&verdict.case_name, &mut |unit: &dyn Reporter| {
                if !verdict.passed {
                    unit.fail(&self.painted(&isolated_message(verdict)));
                }
            });
        })
    }

    /// Run every case and panic at the caller listing each failure.
    #[track_caller]
    pub fn test(&self) {
        let summary = self.run_all(&ConsoleReporter::new());
        if !summary.all_passed() {
            panic!("{}", failure_listing(&self.name, &summary));
        }
    }

    /// [`Trial::test`] with each case reported as its own unit.
    #[track_caller]
    pub fn subtest(&self) {
        let summary = self.run_all_isolated(&ConsoleReporter::new());
        if !summary.all_passed() {
            panic!("{}", failure_listing(&self.name, &summary));
        }
    }

    /// Flush the structured log, if one is configured.
    pub fn flush_log(&self) -> Result<(), TrialError> {
        if let Some(log) = &self.log {
            log.flush()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn run(&self, report: &(dyn Fn(&CaseVerdict) + Sync)) -> RunSummary {
        self.log_entry(
            LogEntry::new("", LogLevel::Info, "run_start").with_details(serde_json::json!({
                "cases": self.cases.len(),
                "schedule": self.config.schedule.as_str(),
            })),
        );

        let deliver = |verdict: CaseVerdict| {
            self.log_verdict(&verdict);
            report(&verdict);
            verdict
        };

        let verdicts: Vec<CaseVerdict> = match self.config.schedule {
            Schedule::Sequential => self
                .cases
                .iter()
                .map(|(name, case)| deliver(self.verdict(name, case)))
                .collect(),
            Schedule::Parallel => thread::scope(|scope| {
                let deliver = &deliver;
                let pending: Vec<_> = self
                    .cases
                    .iter()
                    .map(|(name, case)| {
                        let spawned = thread::Builder::new()
                            .name(format!("trial-dispatch:{name}"))
                            .spawn_scoped(scope, move || deliver(self.verdict(name, case)));
                        (name, spawned)
                    })
                    .collect();
                pending
                    .into_iter()
                    .map(|(name, spawned)| match spawned {
                        Ok(handle) => handle.join().unwrap_or_else(|payload| {
                            self.aborted(
                                name,
                                format!(
                                    "reporter panicked: {}",
                                    crate::panic::panic_message(payload.as_ref())
                                ),
                            )
                        }),
                        Err(err) => deliver(self.aborted(name, TrialError::Spawn(err).to_string())),
                    })
                    .collect::<Vec<_>>()
            }),
        };

        let summary = RunSummary::from_results(verdicts);
        self.log_entry(
            LogEntry::new("", LogLevel::Info, "run_end").with_details(serde_json::json!({
                "total": summary.total,
                "passed": summary.passed,
                "failed": summary.failed,
            })),
        );
        summary
    }

    fn verdict(&self, name: &str, case: &Case<In, Out>) -> CaseVerdict {
        let started = Instant::now();
        let execution: Execution<Out> =
            engine::execute(name, &self.func, case.input.clone(), self.config.timeout);
        let (outcome, message) =
            engine::classify(name, case, execution, &self.compare, &self.config);
        CaseVerdict {
            case_name: name.to_string(),
            passed: outcome == Outcome::Pass,
            outcome,
            message,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn aborted(&self, name: &str, detail: String) -> CaseVerdict {
        CaseVerdict {
            case_name: name.to_string(),
            passed: false,
            outcome: Outcome::Fail,
            message: format!("FAIL: {name:?} {detail}"),
            duration_ms: 0,
        }
    }

    fn painted(&self, message: &str) -> String {
        if self.config.color {
            paint_red(message)
        } else {
            message.to_string()
        }
    }

    fn log_verdict(&self, verdict: &CaseVerdict) {
        let (level, event) = if verdict.passed {
            (LogLevel::Info, "case_pass")
        } else {
            (LogLevel::Error, "case_fail")
        };
        self.log_entry(
            LogEntry::new("", level, event)
                .with_case(&verdict.case_name)
                .with_outcome(verdict.outcome)
                .with_duration_ms(verdict.duration_ms)
                .with_message(&verdict.message),
        );
    }

    fn log_entry(&self, entry: LogEntry) {
        if let Some(log) = &self.log {
            // A broken log sink loses lines, never verdicts.
            let _ = log.emit_entry(entry.with_trial(&self.name));
        }
    }
}

/// Failure text as shown inside a per-case unit.
fn isolated_message(verdict: &CaseVerdict) -> String {
    let quoted = format!("{:?}", verdict.case_name);
    let message = verdict.message.replacen(&quoted, "", 1);
    let message = message.replacen("FAIL:", "", 1);
    message.trim_start_matches([' ', '\n']).to_string()
}

fn failure_listing(trial: &str, summary: &RunSummary) -> String {
    let mut out = format!(
        "{trial}: {} of {} cases failed",
        summary.failed, summary.total
    );
    for verdict in summary.failures() {
        out.push('\n');
        out.push_str(&verdict.message);
    }
    out
}
