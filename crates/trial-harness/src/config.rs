//! Trial configuration.
//!
//! Defaults are explicit in code; [`TrialConfig::from_env`] layers these
//! environment variables on top:
//! - `TRIAL_TIMEOUT_MS`: per-case deadline in milliseconds (`0` disables).
//! - `TRIAL_SCHEDULE`: `sequential` (default) or `parallel`.
//! - `TRIAL_KEEP_FRAMES`: keep the harness's own frames in panic stacks.
//! - `TRIAL_COLOR`: paint failure messages red.

use std::time::Duration;

pub const TIMEOUT_ENV: &str = "TRIAL_TIMEOUT_MS";
pub const SCHEDULE_ENV: &str = "TRIAL_SCHEDULE";
pub const KEEP_FRAMES_ENV: &str = "TRIAL_KEEP_FRAMES";
pub const COLOR_ENV: &str = "TRIAL_COLOR";

/// How cases of one run are dispatched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    /// One case at a time, in name order.
    #[default]
    Sequential,
    /// Every case at once, each on its own thread.
    Parallel,
}

impl Schedule {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" | "concurrent" | "par" => Self::Parallel,
            _ => Self::Sequential,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialConfig {
    /// Per-case deadline; `None` waits forever.
    pub timeout: Option<Duration>,
    pub schedule: Schedule,
    /// Keep `trial_harness` frames in reported panic stacks.
    pub keep_harness_frames: bool,
    /// Wrap failure messages in red ANSI escapes.
    pub color: bool,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            schedule: Schedule::Sequential,
            keep_harness_frames: false,
            color: false,
        }
    }
}

impl TrialConfig {
    /// Defaults overridden by the `TRIAL_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; unset or unparseable keys keep
    /// the current value.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(TIMEOUT_ENV)
            && let Ok(ms) = raw.trim().parse::<u64>()
        {
            self.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(raw) = lookup(SCHEDULE_ENV) {
            self.schedule = Schedule::from_str_loose(&raw);
        }
        if let Some(keep) = lookup(KEEP_FRAMES_ENV).and_then(|raw| parse_flag(&raw)) {
            self.keep_harness_frames = keep;
        }
        if let Some(color) = lookup(COLOR_ENV).and_then(|raw| parse_flag(&raw)) {
            self.color = color;
        }
        self
    }

    /// A zero duration disables the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    #[must_use]
    pub fn with_harness_frames(mut self, keep: bool) -> Self {
        self.keep_harness_frames = keep;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
