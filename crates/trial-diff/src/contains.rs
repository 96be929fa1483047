//! Containment: is the content of `expected` present within `actual`.

use serde::Serialize;

use crate::diff::Diff;
use crate::equal::{EqualOptions, KeyIndex};
use crate::ser::to_value;
use crate::value::{Record, Value};

/// Asymmetric subset check.
///
/// Strings contain substrings (and the display form of [`crate::Textual`]
/// values), sequences contain every expected element somewhere, maps contain
/// every expected key with a contained value. Everything else falls back to
/// [`crate::equal`].
pub fn contains<A, E>(actual: &A, expected: &E) -> (bool, String)
where
    A: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    match (to_value(actual), to_value(expected)) {
        (Ok(actual), Ok(expected)) => contains_values(&actual, &expected),
        (Err(err), _) => (false, format!("cannot inspect actual value: {err}")),
        (_, Err(err)) => (false, format!("cannot inspect expected value: {err}")),
    }
}

pub fn contains_values(actual: &Value, expected: &Value) -> (bool, String) {
    match contained(actual, expected) {
        None => (true, String::new()),
        Some(diff) => (false, diff.render()),
    }
}

fn header(actual: &Value, expected: &Value) -> String {
    format!("{} ⊇ {}", actual.type_name(), expected.type_name())
}

/// `None` when `expected` is contained in `actual`.
fn contained(actual: &Value, expected: &Value) -> Option<Diff> {
    if expected.is_absent() {
        return None;
    }
    match actual {
        Value::Str(text) => contained_in_str(actual, text, expected),
        Value::Seq(pool) => {
            let wanted = match expected {
                Value::Seq(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            in_seq(pool, wanted).map(|diff| diff.with_header(header(actual, expected)))
        }
        Value::Map(pool) => match expected {
            Value::Map(wanted) => {
                in_map(pool, wanted).map(|diff| diff.with_header(header(actual, expected)))
            }
            _ => Some(Diff::type_mismatch(actual, expected)),
        },
        Value::Ref(inner) => match expected {
            Value::Ref(wanted) => contained(inner, wanted),
            _ => EqualOptions::default().diff(actual, expected),
        },
        _ => EqualOptions::default().diff(actual, expected),
    }
}

fn contained_in_str(actual: &Value, text: &str, expected: &Value) -> Option<Diff> {
    let needle = match expected {
        Value::Str(needle) => needle.as_str(),
        Value::Record(Record {
            text: Some(needle), ..
        }) => needle.as_str(),
        Value::Seq(items) if items.iter().all(|item| matches!(item, Value::Str(_))) => {
            return in_seq(std::slice::from_ref(actual), items)
                .map(|diff| diff.with_header(header(actual, expected)));
        }
        _ => return Some(Diff::type_mismatch(actual, expected)),
    };
    if text.contains(needle) {
        return None;
    }
    let mut diff = Diff::new().with_header(header(actual, expected));
    diff.push_present(text);
    diff.push_absent(needle);
    Some(diff)
}

/// Every wanted item must be contained in some pool item.
fn in_seq(pool: &[Value], wanted: &[Value]) -> Option<Diff> {
    let mut diff = Diff::new();
    for item in wanted {
        if pool.iter().any(|candidate| contained(candidate, item).is_none()) {
            diff.push_present(item.to_string());
        } else {
            diff.push_absent(item.to_string());
        }
    }
    (!diff.is_empty()).then_some(diff)
}

fn in_map(pool: &[(Value, Value)], wanted: &[(Value, Value)]) -> Option<Diff> {
    let pool = KeyIndex::new(pool);
    let mut diff = Diff::new();
    for (key, item) in wanted {
        match pool.get(key) {
            None => diff.push_missing_key(key.to_string()),
            Some(found) => {
                if let Some(child) = contained(found, item) {
                    diff.push_nested(key.to_string(), child);
                }
            }
        }
    }
    (!diff.is_empty()).then_some(diff)
}
