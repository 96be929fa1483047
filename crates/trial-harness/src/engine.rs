//! Case execution engine.
//!
//! A case runs `Pending -> Running -> {Completed, Panicked, TimedOut}` and is
//! then classified into a verdict message. The function under test runs on
//! its own named thread inside `catch_unwind`; with a deadline the harness
//! waits on the result channel and abandons the worker when it expires.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::case::{Case, CaseError};
use crate::config::TrialConfig;
use crate::error::TrialError;
use crate::panic::{self, PanicReport};
use crate::verdict::Outcome;

pub(crate) type TestFn<In, Out> = Arc<dyn Fn(In) -> Result<Out, CaseError> + Send + Sync>;
pub(crate) type CompareFn<Out> = Arc<dyn Fn(&Out, &Out) -> (bool, String) + Send + Sync>;

/// How an invocation ended, before classification.
pub(crate) enum Execution<Out> {
    Completed(Result<Out, CaseError>),
    Panicked(PanicReport),
    TimedOut,
    Aborted(TrialError),
}

/// Run `func(input)` on a fresh thread named `trial-case:<name>`.
pub(crate) fn execute<In, Out>(
    name: &str,
    func: &TestFn<In, Out>,
    input: In,
    timeout: Option<Duration>,
) -> Execution<Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    panic::install_hook();
    let (tx, rx) = mpsc::channel();
    let func = Arc::clone(func);
    let spawned = thread::Builder::new()
        .name(format!("trial-case:{name}"))
        .spawn(move || {
            panic::mark_case_thread();
            let execution = match catch_unwind(AssertUnwindSafe(|| func(input))) {
                Ok(result) => Execution::Completed(result),
                Err(payload) => Execution::Panicked(PanicReport::take(payload.as_ref())),
            };
            // The receiver is gone once the deadline passed.
            let _ = tx.send(execution);
        });
    if let Err(err) = spawned {
        return Execution::Aborted(TrialError::Spawn(err));
    }

    match timeout {
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(execution) => execution,
            Err(RecvTimeoutError::Timeout) => Execution::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Execution::Aborted(TrialError::WorkerLost),
        },
        None => rx
            .recv()
            .unwrap_or(Execution::Aborted(TrialError::WorkerLost)),
    }
}

/// Apply the classification precedence to a finished execution.
pub(crate) fn classify<In, Out>(
    name: &str,
    case: &Case<In, Out>,
    execution: Execution<Out>,
    compare: &CompareFn<Out>,
    config: &TrialConfig,
) -> (Outcome, String) {
    let fail = |detail: String| (Outcome::Fail, format!("FAIL: {name:?} {detail}"));
    let pass = || (Outcome::Pass, format!("PASS: {name:?}"));

    match execution {
        Execution::TimedOut => {
            let limit = config.timeout.unwrap_or_default();
            (
                Outcome::Timeout,
                format!("FAIL: {name:?} timeout after {limit:?}"),
            )
        }
        Execution::Aborted(err) => fail(err.to_string()),
        Execution::Panicked(report) if !case.should_panic => (
            Outcome::Panic,
            format!(
                "PANIC: {name:?} {}\n{}",
                report.message,
                report.stack(config.keep_harness_frames)
            ),
        ),
        Execution::Panicked(_) => pass(),
        Execution::Completed(_) if case.should_panic => fail("did not panic".to_string()),
        Execution::Completed(Ok(_)) if case.expects_error() => fail("should error".to_string()),
        Execution::Completed(Ok(actual)) => {
            let compared = catch_unwind(AssertUnwindSafe(|| compare(&actual, &case.expected)));
            match compared {
                Ok((true, _)) => pass(),
                Ok((false, diff)) => fail(format!("\n{diff}")),
                Err(payload) => fail(format!(
                    "comparator panicked: {}",
                    panic::panic_message(payload.as_ref())
                )),
            }
        }
        Execution::Completed(Err(err)) => match &case.expected_err {
            Some(matcher) if matcher.matches(err.as_ref()) => pass(),
            Some(matcher) => fail(format!(
                "error {:?} does not match expected {matcher}",
                err.to_string()
            )),
            None if case.should_err => pass(),
            None => fail(format!("unexpected error '{err}'")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::ErrorMatcher;

    fn divide() -> TestFn<(i32, i32), i32> {
        Arc::new(|(a, b): (i32, i32)| -> Result<i32, CaseError> {
            if b == 0 {
                return Err("divide by zero".into());
            }
            Ok(a / b)
        })
    }

    fn equality() -> CompareFn<i32> {
        Arc::new(|a: &i32, e: &i32| trial_diff::equal(a, e))
    }

    fn run(case: &Case<(i32, i32), i32>) -> (Outcome, String) {
        let execution = execute("case", &divide(), case.input, None);
        classify("case", case, execution, &equality(), &TrialConfig::default())
    }

    #[test]
    fn matching_value_passes() {
        assert_eq!(
            run(&Case::new((10, 2), 5)),
            (Outcome::Pass, "PASS: \"case\"".to_string())
        );
    }

    #[test]
    fn mismatching_value_shows_diff() {
        let (outcome, message) = run(&Case::new((10, 2), 10));
        assert_eq!(outcome, Outcome::Fail);
        assert_eq!(message, "FAIL: \"case\" \ni64:\n + 5\n - 10");
    }

    #[test]
    fn error_expectations() {
        assert_eq!(run(&Case::new((1, 0), 0).should_err()).0, Outcome::Pass);
        assert_eq!(
            run(&Case::new((1, 0), 0)).1,
            "FAIL: \"case\" unexpected error 'divide by zero'"
        );
        assert_eq!(
            run(&Case::new((1, 1), 1).should_err()).1,
            "FAIL: \"case\" should error"
        );
        assert_eq!(
            run(&Case::new((1, 0), 0).expect_err("test error")).1,
            "FAIL: \"case\" error \"divide by zero\" does not match expected \"test error\""
        );
        assert_eq!(
            run(&Case::new((1, 0), 0).expect_err(ErrorMatcher::message("zero"))).0,
            Outcome::Pass
        );
    }

    #[test]
    fn panic_expectations() {
        let boom: TestFn<(), ()> = Arc::new(|()| -> Result<(), CaseError> { panic!("boom") });
        let compare: CompareFn<()> = Arc::new(|_: &(), _: &()| (true, String::new()));
        let config = TrialConfig::default();

        let expected = Case::new((), ()).should_panic();
        let execution = execute("p", &boom, (), None);
        assert_eq!(
            classify("p", &expected, execution, &compare, &config).0,
            Outcome::Pass
        );

        let unexpected = Case::new((), ());
        let execution = execute("p", &boom, (), None);
        let (outcome, message) = classify("p", &unexpected, execution, &compare, &config);
        assert_eq!(outcome, Outcome::Panic);
        assert!(message.starts_with("PANIC: \"p\" boom\n"), "{message}");

        let calm: TestFn<(), ()> = Arc::new(|()| -> Result<(), CaseError> { Ok(()) });
        let execution = execute("p", &calm, (), None);
        assert_eq!(
            classify("p", &expected, execution, &compare, &config).1,
            "FAIL: \"p\" did not panic"
        );
    }

    #[test]
    fn deadline_abandons_worker() {
        let slow: TestFn<(), ()> = Arc::new(|()| -> Result<(), CaseError> {
            thread::sleep(Duration::from_secs(1));
            Ok(())
        });
        let compare: CompareFn<()> = Arc::new(|_: &(), _: &()| (true, String::new()));
        let config = TrialConfig::default().with_timeout(Duration::from_millis(1));
        let execution = execute("slow", &slow, (), config.timeout);
        let (outcome, message) = classify("slow", &Case::new((), ()), execution, &compare, &config);
        assert_eq!(outcome, Outcome::Timeout);
        assert_eq!(message, "FAIL: \"slow\" timeout after 1ms");
    }
}
