//! Structural equality with configurable options.

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Serialize;

use crate::diff::Diff;
use crate::ser::to_value;
use crate::value::{Record, Value};

/// Options for [`equal_with`].
///
/// The default treats empty sequences, empty maps and `None` as equal to
/// each other; [`EqualOptions::strict`] does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualOptions {
    equate_empty: bool,
    ignore_fields: BTreeSet<String>,
    ignore_types: BTreeSet<String>,
    approx_time: Option<Duration>,
}

impl Default for EqualOptions {
    fn default() -> Self {
        Self {
            equate_empty: true,
            ignore_fields: BTreeSet::new(),
            ignore_types: BTreeSet::new(),
            approx_time: None,
        }
    }
}

impl EqualOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No empty-equivalence, no ignores.
    #[must_use]
    pub fn strict() -> Self {
        Self::default().equate_empty(false)
    }

    #[must_use]
    pub fn equate_empty(mut self, enabled: bool) -> Self {
        self.equate_empty = enabled;
        self
    }

    /// Skip record fields and string-keyed map entries by dotted path from
    /// the root (`"child.value"`).
    #[must_use]
    pub fn ignore_fields<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_fields.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Skip values whose [`Value::type_name`] is listed.
    #[must_use]
    pub fn ignore_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_types.extend(names.into_iter().map(Into::into));
        self
    }

    /// Two `SystemTime` values within `margin` of each other are equal.
    #[must_use]
    pub fn approx_time(mut self, margin: Duration) -> Self {
        self.approx_time = Some(margin);
        self
    }

    /// `None` when the values are equal under these options.
    #[must_use]
    pub fn diff(&self, actual: &Value, expected: &Value) -> Option<Diff> {
        let mut walker = Walker {
            options: self,
            root: actual,
            root_name: OnceCell::new(),
            diff: Diff::new(),
        };
        walker.walk(actual, expected, &Location::default());
        (!walker.diff.is_empty()).then_some(walker.diff)
    }

    pub fn equal_values(&self, actual: &Value, expected: &Value) -> (bool, String) {
        match self.diff(actual, expected) {
            None => (true, String::new()),
            Some(diff) => (false, diff.render()),
        }
    }

    pub fn equal<A, E>(&self, actual: &A, expected: &E) -> (bool, String)
    where
        A: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        match (to_value(actual), to_value(expected)) {
            (Ok(actual), Ok(expected)) => self.equal_values(&actual, &expected),
            (Err(err), _) => (false, format!("cannot inspect actual value: {err}")),
            (_, Err(err)) => (false, format!("cannot inspect expected value: {err}")),
        }
    }
}

/// Deep equality with the default options.
///
/// Returns `(true, "")` or `(false, rendered_diff)`.
pub fn equal<A, E>(actual: &A, expected: &E) -> (bool, String)
where
    A: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    EqualOptions::default().equal(actual, expected)
}

pub fn equal_with<A, E>(options: &EqualOptions, actual: &A, expected: &E) -> (bool, String)
where
    A: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    options.equal(actual, expected)
}

pub fn equal_values(actual: &Value, expected: &Value) -> (bool, String) {
    EqualOptions::default().equal_values(actual, expected)
}

/// Structural identity used for map key lookup.
pub(crate) fn same(a: &Value, b: &Value) -> bool {
    EqualOptions::strict().diff(a, b).is_none()
}

pub(crate) fn lookup<'a>(entries: &'a [(Value, Value)], key: &Value) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(candidate, _)| same(candidate, key))
        .map(|(_, value)| value)
}

/// Map entries indexed by the rendered text of their keys.
///
/// Keys that compare equal render the same text, so a lookup only confirms
/// the few entries sharing the looked-up key's text. Composite keys whose text may
/// still differ (records with a display form) fall back to a scan.
pub(crate) struct KeyIndex<'a> {
    entries: &'a [(Value, Value)],
    by_text: BTreeMap<String, Vec<usize>>,
}

impl<'a> KeyIndex<'a> {
    pub(crate) fn new(entries: &'a [(Value, Value)]) -> Self {
        let mut by_text: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (at, (key, _)) in entries.iter().enumerate() {
            by_text.entry(key.nested()).or_default().push(at);
        }
        Self { entries, by_text }
    }

    pub(crate) fn get(&self, key: &Value) -> Option<&'a Value> {
        self.get_rendered(key, &key.nested())
    }

    fn get_rendered(&self, key: &Value, text: &str) -> Option<&'a Value> {
        let entries = self.entries;
        let hit = self.by_text.get(text).and_then(|candidates| {
            candidates
                .iter()
                .map(|&at| &entries[at])
                .find(|(candidate, _)| same(candidate, key))
        });
        match hit {
            Some((_, value)) => Some(value),
            None if key.kind().is_scalar() => None,
            None => lookup(entries, key),
        }
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Location {
    suffix: String,
    fields: Vec<String>,
}

impl Location {
    fn index(&self, index: usize) -> Self {
        Self {
            suffix: format!("{}[{index}]", self.suffix),
            fields: self.fields.clone(),
        }
    }

    // String keys extend the field path so JSON objects can be ignored too.
    fn key(&self, key: &Value) -> Self {
        let mut fields = self.fields.clone();
        if let Value::Str(name) = key {
            fields.push(name.clone());
        }
        Self {
            suffix: format!("{}[{}]", self.suffix, key.nested()),
            fields,
        }
    }

    fn field(&self, name: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.push(name.to_string());
        Self {
            suffix: format!("{}.{name}", self.suffix),
            fields,
        }
    }
}

struct Walker<'a> {
    options: &'a EqualOptions,
    root: &'a Value,
    root_name: OnceCell<String>,
    diff: Diff,
}

impl Walker<'_> {
    fn root_name(&self) -> &str {
        self.root_name.get_or_init(|| self.root.type_name())
    }

    fn walk(&mut self, actual: &Value, expected: &Value, at: &Location) {
        if self.skipped(actual, expected, at) {
            return;
        }
        if let Some(margin) = self.options.approx_time
            && let (Some(a), Some(e)) = (system_time_nanos(actual), system_time_nanos(expected))
        {
            if a.abs_diff(e) > margin.as_nanos() {
                self.mismatch(at, actual, expected);
            }
            return;
        }
        match (actual, expected) {
            (Value::Absent, Value::Absent) => {}
            (Value::Int(_) | Value::Uint(_), Value::Int(_) | Value::Uint(_)) => {
                if !integers_equal(actual, expected) {
                    self.mismatch(at, actual, expected);
                }
            }
            (Value::Float(a), Value::Float(e)) => {
                if !(a == e || (a.is_nan() && e.is_nan())) {
                    self.mismatch(at, actual, expected);
                }
            }
            (Value::Str(a), Value::Str(e)) if a == e => {}
            (Value::Bool(a), Value::Bool(e)) if a == e => {}
            (Value::Seq(a), Value::Seq(e)) => self.walk_seq(a, e, at),
            (Value::Map(a), Value::Map(e)) => self.walk_map(a, e, at),
            (Value::Record(a), Value::Record(e)) if a.name == e.name => {
                self.walk_record(a, e, at);
            }
            (Value::Ref(a), Value::Ref(e)) => self.walk(a, e, at),
            (Value::Record(_), Value::Record(_)) => self.type_mismatch(at, actual, expected),
            _ if actual.kind() == expected.kind() => self.mismatch(at, actual, expected),
            _ => self.type_mismatch(at, actual, expected),
        }
    }

    fn skipped(&self, actual: &Value, expected: &Value, at: &Location) -> bool {
        let options = self.options;
        if !at.fields.is_empty() && options.ignore_fields.contains(&at.fields.join(".")) {
            return true;
        }
        if !options.ignore_types.is_empty()
            && options.ignore_types.contains(&actual.type_name())
            && options.ignore_types.contains(&expected.type_name())
        {
            return true;
        }
        options.equate_empty && empty_equivalent(actual, expected)
    }

    fn walk_seq(&mut self, actual: &[Value], expected: &[Value], at: &Location) {
        for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
            self.walk(a, e, &at.index(index));
        }
        for (index, extra) in actual.iter().enumerate().skip(expected.len()) {
            self.extra(&at.index(index), extra);
        }
        for (index, missing) in expected.iter().enumerate().skip(actual.len()) {
            self.missing(&at.index(index), missing);
        }
    }

    fn walk_map(&mut self, actual: &[(Value, Value)], expected: &[(Value, Value)], at: &Location) {
        let actual_index = KeyIndex::new(actual);
        let expected_index = KeyIndex::new(expected);
        let mut keys: Vec<(String, &Value)> =
            actual.iter().map(|(key, _)| (key.nested(), key)).collect();
        for (key, _) in expected {
            let text = key.nested();
            if actual_index.get_rendered(key, &text).is_none() {
                keys.push((text, key));
            }
        }
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        for (text, key) in keys {
            let here = at.key(key);
            match (
                actual_index.get_rendered(key, &text),
                expected_index.get_rendered(key, &text),
            ) {
                (Some(a), Some(e)) => self.walk(a, e, &here),
                (Some(a), None) => self.extra(&here, a),
                (None, Some(e)) => self.missing(&here, e),
                (None, None) => {}
            }
        }
    }

    fn walk_record(&mut self, actual: &Record, expected: &Record, at: &Location) {
        for (name, a) in &actual.fields {
            let here = at.field(name);
            match expected.field(name) {
                Some(e) => self.walk(a, e, &here),
                None => self.extra(&here, a),
            }
        }
        for (name, e) in &expected.fields {
            if actual.field(name).is_none() {
                self.missing(&at.field(name), e);
            }
        }
    }

    fn label(&self, at: &Location, type_name: &str) -> String {
        if at.suffix.is_empty() {
            format!("{type_name}:")
        } else {
            format!("{}{} ({type_name}):", self.root_name(), at.suffix)
        }
    }

    fn mismatch(&mut self, at: &Location, actual: &Value, expected: &Value) {
        let mut block = Diff::new().with_header(self.label(at, &expected.type_name()));
        block.push_present(actual.nested());
        block.push_absent(expected.nested());
        self.diff.push_block(block);
    }

    fn extra(&mut self, at: &Location, actual: &Value) {
        let mut block = Diff::new().with_header(self.label(at, &actual.type_name()));
        block.push_present(actual.nested());
        self.diff.push_block(block);
    }

    fn missing(&mut self, at: &Location, expected: &Value) {
        let mut block = Diff::new().with_header(self.label(at, &expected.type_name()));
        block.push_absent(expected.nested());
        self.diff.push_block(block);
    }

    fn type_mismatch(&mut self, at: &Location, actual: &Value, expected: &Value) {
        let mismatch = Diff::type_mismatch(actual, expected).render();
        let line = if at.suffix.is_empty() {
            mismatch
        } else {
            format!("{}{}: {mismatch}", self.root_name(), at.suffix)
        };
        self.diff.push_block(Diff::new().with_message(line));
    }
}

fn integers_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Uint(x), Value::Uint(y)) => x == y,
        (Value::Int(x), Value::Uint(y)) | (Value::Uint(y), Value::Int(x)) => {
            u64::try_from(*x).is_ok_and(|x| x == *y)
        }
        _ => false,
    }
}

fn empty_equivalent(a: &Value, b: &Value) -> bool {
    if !(a.is_empty_like() && b.is_empty_like()) {
        return false;
    }
    let (a, b) = (strip_refs(a), strip_refs(b));
    a.is_absent() || b.is_absent() || a.kind() == b.kind()
}

fn strip_refs(mut value: &Value) -> &Value {
    while let Value::Ref(inner) = value {
        value = inner;
    }
    value
}

/// `SystemTime` serializes as `{ secs_since_epoch, nanos_since_epoch }`.
fn system_time_nanos(value: &Value) -> Option<i128> {
    let Value::Record(record) = value else {
        return None;
    };
    if record.name != "SystemTime" {
        return None;
    }
    let secs = match record.field("secs_since_epoch")? {
        Value::Uint(n) => i128::from(*n),
        Value::Int(n) => i128::from(*n),
        _ => return None,
    };
    let nanos = match record.field("nanos_since_epoch")? {
        Value::Uint(n) => i128::from(*n),
        Value::Int(n) => i128::from(*n),
        _ => return None,
    };
    Some(secs * 1_000_000_000 + nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::Seq(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn root_scalar_mismatch_block() {
        let (ok, diff) = equal_values(&Value::Int(5), &Value::Int(10));
        assert!(!ok);
        assert_eq!(diff, "i64:\n + 5\n - 10");
    }

    #[test]
    fn signed_and_unsigned_compare_numerically() {
        assert!(equal_values(&Value::Int(3), &Value::Uint(3)).0);
        assert!(!equal_values(&Value::Int(-1), &Value::Uint(u64::MAX)).0);
    }

    #[test]
    fn nan_equals_itself() {
        assert!(equal_values(&Value::Float(f64::NAN), &Value::Float(f64::NAN)).0);
    }

    #[test]
    fn sequence_tail_reports_extra_and_missing() {
        let (ok, diff) = equal_values(&ints(&[1, 2, 3]), &ints(&[1, 2]));
        assert!(!ok);
        assert!(diff.contains("Vec<i64>[2] (i64):\n + 3"), "{diff}");
        let (ok, diff) = equal_values(&ints(&[1]), &ints(&[1, 9]));
        assert!(!ok);
        assert!(diff.contains("Vec<i64>[1] (i64):\n - 9"), "{diff}");
    }

    #[test]
    fn map_order_is_irrelevant() {
        let a = Value::Map(vec![
            (Value::Str("a".into()), Value::Int(1)),
            (Value::Str("b".into()), Value::Int(2)),
        ]);
        let b = Value::Map(vec![
            (Value::Str("b".into()), Value::Int(2)),
            (Value::Str("a".into()), Value::Int(1)),
        ]);
        assert!(equal_values(&a, &b).0);
    }

    #[test]
    fn key_index_confirms_structurally() {
        let entries = vec![
            (Value::Int(1), Value::Str("int".into())),
            (Value::Str("1".into()), Value::Str("text".into())),
            (
                Value::Record(Record::new("Id").with_field("0", Value::Int(7)).with_text("seven")),
                Value::Str("record".into()),
            ),
        ];
        let index = KeyIndex::new(&entries);
        assert_eq!(index.get(&Value::Uint(1)), Some(&Value::Str("int".into())));
        assert_eq!(index.get(&Value::Str("1".into())), Some(&Value::Str("text".into())));
        assert_eq!(index.get(&Value::Int(2)), None);
        let relabelled =
            Value::Record(Record::new("Id").with_field("0", Value::Int(7)).with_text("7"));
        assert_eq!(index.get(&relabelled), Some(&Value::Str("record".into())));
    }

    #[test]
    fn large_maps_compare_by_key() {
        let build = |reverse: bool| {
            let mut entries: Vec<(Value, Value)> = (0..5_000_u64)
                .map(|n| (Value::Uint(n), Value::Uint(n * 2)))
                .collect();
            if reverse {
                entries.reverse();
            }
            Value::Map(entries)
        };
        assert!(equal_values(&build(false), &build(true)).0);
    }

    #[test]
    fn empty_equivalence_toggle() {
        let empty = Value::Seq(vec![]);
        assert!(equal_values(&empty, &Value::Absent).0);
        assert!(!EqualOptions::strict().equal_values(&empty, &Value::Absent).0);
        assert!(!equal_values(&Value::Seq(vec![]), &Value::Map(vec![])).0);
    }

    #[test]
    fn ignored_field_path() {
        let a = Value::Record(
            Record::new("Outer")
                .with_field("id", Value::Int(1))
                .with_field(
                    "child",
                    Value::Record(Record::new("Inner").with_field("value", Value::Int(1))),
                ),
        );
        let b = Value::Record(
            Record::new("Outer")
                .with_field("id", Value::Int(1))
                .with_field(
                    "child",
                    Value::Record(Record::new("Inner").with_field("value", Value::Int(2))),
                ),
        );
        let (ok, diff) = equal_values(&a, &b);
        assert!(!ok);
        assert!(diff.starts_with("Outer.child.value (i64):"), "{diff}");
        let options = EqualOptions::new().ignore_fields(["child.value"]);
        assert!(options.equal_values(&a, &b).0);
    }

    #[test]
    fn ignored_map_key_path() {
        let doc = |value: i64| {
            Value::Map(vec![(
                Value::Str("meta".into()),
                Value::Map(vec![(Value::Str("stamp".into()), Value::Int(value))]),
            )])
        };
        assert!(!equal_values(&doc(1), &doc(2)).0);
        let options = EqualOptions::new().ignore_fields(["meta.stamp"]);
        assert!(options.equal_values(&doc(1), &doc(2)).0);
    }

    #[test]
    fn ignored_types() {
        let a = Value::Record(Record::new("Token").with_field("0", Value::Int(1)));
        let b = Value::Record(Record::new("Token").with_field("0", Value::Int(2)));
        assert!(!equal_values(&a, &b).0);
        assert!(EqualOptions::new().ignore_types(["Token"]).equal_values(&a, &b).0);
    }

    #[test]
    fn approximate_times() {
        let at = |secs: u64, nanos: u64| {
            Value::Record(
                Record::new("SystemTime")
                    .with_field("secs_since_epoch", Value::Uint(secs))
                    .with_field("nanos_since_epoch", Value::Uint(nanos)),
            )
        };
        let options = EqualOptions::new().approx_time(Duration::from_millis(5));
        assert!(options.equal_values(&at(10, 0), &at(10, 4_000_000)).0);
        assert!(!options.equal_values(&at(10, 0), &at(10, 6_000_000)).0);
        assert!(!equal_values(&at(10, 0), &at(10, 1)).0);
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let (ok, diff) = equal_values(&Value::Str("1".into()), &Value::Int(1));
        assert!(!ok);
        assert_eq!(diff, "type mismatch String i64");
    }
}
