//! Panic capture for case threads.
//!
//! A process-wide hook is installed once. On threads marked as case threads
//! it records the panic location and a backtrace instead of printing; every
//! other thread keeps the previous hook's behaviour.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::sync::Once;

struct Captured {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    static CASE_THREAD: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

pub(crate) fn install_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if CASE_THREAD.with(Cell::get) {
                let captured = Captured {
                    location: info.location().map(ToString::to_string),
                    backtrace: Backtrace::force_capture().to_string(),
                };
                LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(captured));
            } else {
                previous(info);
            }
        }));
    });
}

/// Mark the current thread as running a case.
pub(crate) fn mark_case_thread() {
    CASE_THREAD.with(|flag| flag.set(true));
}

/// What a caught panic left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PanicReport {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: String,
}

impl PanicReport {
    /// Build from a `catch_unwind` payload on the panicking thread.
    pub(crate) fn take(payload: &(dyn Any + Send)) -> Self {
        let captured = LAST_PANIC.with(|slot| slot.borrow_mut().take());
        let (location, backtrace) = captured
            .map(|c| (c.location, c.backtrace))
            .unwrap_or_default();
        Self {
            message: panic_message(payload),
            location,
            backtrace,
        }
    }

    /// Location line followed by the cleaned stack.
    pub(crate) fn stack(&self, keep_harness_frames: bool) -> String {
        let cleaned = clean_stack(&self.backtrace, keep_harness_frames);
        match &self.location {
            Some(location) => format!("at {location}\n{cleaned}"),
            None => cleaned,
        }
    }
}

/// Extract the text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

// Frames of the unwinding machinery and thread start-up.
const RUNTIME_FRAMES: &[&str] = &[
    "std::backtrace",
    "std::panicking",
    "std::panic::",
    "std::sys::",
    "std::rt::",
    "std::thread::",
    "core::panicking",
    "core::panic::",
    "core::ops::function::",
    "core::result::unwrap_failed",
    "core::option::expect_failed",
    "rust_begin_unwind",
    "__rust_",
    "<alloc::boxed::Box<F,A> as core::ops::function::",
    "start_thread",
    "clone3",
    "__clone",
    "__libc_start",
    "_start",
];

const HARNESS_FRAMES: &[&str] = &["trial_harness::", "trial_diff::"];

/// Drop runtime frames always and harness frames unless asked to keep them.
///
/// A frame is its `N: symbol` line plus the `at file:line` lines after it.
#[must_use]
pub fn clean_stack(trace: &str, keep_harness_frames: bool) -> String {
    let mut kept = Vec::new();
    let mut keep = true;
    for line in trace.lines() {
        if let Some(symbol) = frame_symbol(line) {
            keep = !RUNTIME_FRAMES.iter().any(|p| symbol.starts_with(p))
                && (keep_harness_frames || !HARNESS_FRAMES.iter().any(|p| symbol.contains(p)));
        }
        if keep {
            kept.push(line);
        }
    }
    kept.join("\n")
}

fn frame_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.trim_start().split_once(':')?;
    (!index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())).then(|| symbol.trim())
}
