//! Descriptor-level capture of the process streams.
//!
//! The test runner may print its own progress to stdout while a capture is
//! active, so stdout assertions look for the written lines rather than
//! comparing the whole capture.

use std::io::Write;

use trial_capture::{Capture, CaptureError, Stream};

fn write_stdout(text: &str) {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes()).unwrap();
    out.flush().unwrap();
}

fn write_stderr(text: &str) {
    let mut err = std::io::stderr().lock();
    err.write_all(text.as_bytes()).unwrap();
    err.flush().unwrap();
}

#[test]
fn stdout_single_line() {
    let mut capture = Capture::start(Stream::Stdout).unwrap();
    write_stdout("trial stdout line\n");
    let lines = capture.read_lines().unwrap();
    assert!(lines.iter().any(|line| line == "trial stdout line"), "{lines:?}");

    // Restored: later writes no longer reach the capture.
    write_stdout("trial stdout after\n");
    let again = capture.read_lines().unwrap();
    assert_eq!(again, lines);
}

#[test]
fn stdout_multiple_lines_keep_order() {
    let mut capture = Capture::start(Stream::Stdout).unwrap();
    write_stdout("trial-a\ntrial-b\n");
    write_stdout("trial-c\n");
    let lines: Vec<String> = capture
        .read_lines()
        .unwrap()
        .into_iter()
        .filter(|line| line.starts_with("trial-"))
        .collect();
    assert_eq!(lines, ["trial-a", "trial-b", "trial-c"]);
}

#[test]
fn stderr_without_trailing_newline() {
    let mut capture = Capture::start(Stream::Stderr).unwrap();
    write_stderr("log line");
    assert!(capture.read_all().unwrap().contains("log line"));
    write_stderr("");
    assert!(!capture.is_active());
}

#[test]
fn drop_restores_stream() {
    {
        let _capture = Capture::start(Stream::Stderr).unwrap();
        write_stderr("discarded\n");
    }
    let mut capture = Capture::start(Stream::Stderr).unwrap();
    write_stderr("trial stderr kept\n");
    let text = capture.read_all().unwrap();
    assert!(text.contains("trial stderr kept"));
    assert!(!text.contains("discarded"));
}

#[test]
fn empty_capture_reads_nothing() {
    let mut capture = Capture::start(Stream::Stderr).unwrap();
    let text = capture.read_all().unwrap();
    assert!(!text.contains("trial"));
}

#[test]
fn same_thread_recapture_fails_fast() {
    let mut outer = Capture::start(Stream::Stderr).unwrap();
    let Err(err) = Capture::start(Stream::Stderr) else {
        panic!("second capture of stderr on one thread must fail");
    };
    assert!(matches!(err, CaptureError::AlreadyCapturing(Stream::Stderr)));
    assert_eq!(err.to_string(), "Stderr is already captured on this thread");

    let mut other = Capture::start(Stream::Stdout).unwrap();
    other.read_all().unwrap();

    write_stderr("outer still active\n");
    assert!(outer.read_all().unwrap().contains("outer still active"));

    let mut again = Capture::start(Stream::Stderr).unwrap();
    write_stderr("after restore\n");
    assert!(again.read_all().unwrap().contains("after restore"));
}
