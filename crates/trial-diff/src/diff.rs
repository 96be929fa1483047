//! Structured diff and its text rendering.

use std::fmt;

use crate::value::Value;

/// Outcome of a single map key in a containment diff.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyDiff {
    Missing,
    Nested(Diff),
}

/// Intermediate result of a failed comparison.
///
/// Rendering is deterministic: keyed children and present/absent items are
/// sorted by their text, whatever order they were recorded in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    header: Option<String>,
    messages: Vec<String>,
    present: Vec<String>,
    absent: Vec<String>,
    keys: Vec<(String, KeyDiff)>,
    blocks: Vec<Diff>,
}

impl Diff {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `type mismatch <actual> <expected>`.
    #[must_use]
    pub fn type_mismatch(actual: &Value, expected: &Value) -> Self {
        Self::new().with_message(format!(
            "type mismatch {} {}",
            actual.type_name(),
            expected.type_name()
        ))
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn push_present(&mut self, item: impl Into<String>) {
        self.present.push(item.into());
    }

    pub fn push_absent(&mut self, item: impl Into<String>) {
        self.absent.push(item.into());
    }

    pub fn push_missing_key(&mut self, key: impl Into<String>) {
        self.keys.push((key.into(), KeyDiff::Missing));
    }

    pub fn push_nested(&mut self, key: impl Into<String>, child: Diff) {
        self.keys.push((key.into(), KeyDiff::Nested(child)));
    }

    pub fn push_block(&mut self, block: Diff) {
        self.blocks.push(block);
    }

    #[must_use]
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    #[must_use]
    pub fn present(&self) -> &[String] {
        &self.present
    }

    #[must_use]
    pub fn absent(&self) -> &[String] {
        &self.absent
    }

    #[must_use]
    pub fn keys(&self) -> &[(String, KeyDiff)] {
        &self.keys
    }

    /// No difference was recorded. A header alone is not a difference.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.absent.is_empty()
            && self.keys.is_empty()
            && self.blocks.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        if let Some(header) = &self.header {
            lines.push(header.clone());
        }
        lines.extend(self.messages.iter().cloned());
        if !self.present.is_empty() {
            lines.push(format!(" + {}", sorted(&self.present).join(", ")));
        }
        if !self.absent.is_empty() {
            lines.push(format!(" - {}", sorted(&self.absent).join(", ")));
        }
        let mut keys: Vec<&(String, KeyDiff)> = self.keys.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, child) in keys {
            match child {
                KeyDiff::Missing => lines.push(format!(" [{key}]: missing key")),
                KeyDiff::Nested(diff) => lines.push(format!(
                    " [{key}]: {}",
                    diff.render().replace('\n', "\n    ")
                )),
            }
        }
        lines.extend(self.blocks.iter().map(Diff::render));
        lines.join("\n")
    }
}

fn sorted(items: &[String]) -> Vec<&str> {
    let mut items: Vec<&str> = items.iter().map(String::as_str).collect();
    items.sort_unstable();
    items
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
