//! Runtime value model shared by the introspector and the comparator.
//!
//! Every value handed to the comparison engine is first lowered into a
//! [`Value`] through [`crate::to_value`]. The model is closed: scalars,
//! sequences, maps, named records and present indirections (`Some(x)`).
//! Hash sets are lowered with their elements in canonical order, so two
//! equal sets produce the same sequence.

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Struct name used to carry a [`Record`] through serde unchanged.
pub(crate) const RECORD_TOKEN: &str = "$trial_diff::private::Record";
/// Struct name used by [`Textual`] to attach a display form.
pub(crate) const TEXTUAL_TOKEN: &str = "$trial_diff::private::Textual";

/// Coarse classification of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Absent,
    Str,
    Bool,
    Int,
    Uint,
    Float,
    Seq,
    Map,
    Record,
    Ref,
}

impl Kind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Seq => "sequence",
            Self::Map => "map",
            Self::Record => "record",
            Self::Ref => "reference",
        }
    }

    /// Scalars convert to text; composites do not.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Str | Self::Bool | Self::Int | Self::Uint | Self::Float
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named composite with ordered fields.
///
/// `text` is the textual-representation capability: when present it is the
/// value's canonical string form (see [`Textual`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub name: String,
    pub fields: Vec<(String, Value)>,
    pub text: Option<String>,
}

impl Record {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            text: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

/// A runtime value.
///
/// The derived `PartialEq` is plain structural identity. The comparison
/// relation used by the engine is [`crate::equal_values`], which also treats
/// `Int(1)` and `Uint(1)` as equal and NaN as equal to itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Absent,
    Str(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Seq(Vec<Value>),
    /// Entries in serialization order; lookups are structural.
    Map(Vec<(Value, Value)>),
    Record(Record),
    Ref(Box<Value>),
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Absent => Kind::Absent,
            Self::Str(_) => Kind::Str,
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Uint(_) => Kind::Uint,
            Self::Float(_) => Kind::Float,
            Self::Seq(_) => Kind::Seq,
            Self::Map(_) => Kind::Map,
            Self::Record(_) => Kind::Record,
            Self::Ref(_) => Kind::Ref,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Rust-flavoured name of the value's type, used in diff headers.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Absent => "None".to_string(),
            Self::Str(_) => "String".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::Int(_) => "i64".to_string(),
            Self::Uint(_) => "u64".to_string(),
            Self::Float(_) => "f64".to_string(),
            Self::Seq(items) => format!("Vec<{}>", common_type(items.iter())),
            Self::Map(entries) => format!(
                "Map<{}, {}>",
                common_type(entries.iter().map(|(key, _)| key)),
                common_type(entries.iter().map(|(_, value)| value)),
            ),
            Self::Record(record) => record.name.clone(),
            Self::Ref(inner) => format!("Option<{}>", inner.type_name()),
        }
    }

    /// The textual-representation capability, if the value has one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Record(record) => record.text.as_deref(),
            _ => None,
        }
    }

    /// Follow one level of indirection.
    #[must_use]
    pub fn deref_once(&self) -> &Value {
        match self {
            Self::Ref(inner) => inner,
            other => other,
        }
    }

    /// Zero-length sequence or map, absent, or a reference to one of those.
    #[must_use]
    pub fn is_empty_like(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Seq(items) => items.is_empty(),
            Self::Map(entries) => entries.is_empty(),
            Self::Ref(inner) => inner.is_empty_like(),
            _ => false,
        }
    }

    /// `Display`, except nested strings are quoted.
    pub(crate) fn nested(&self) -> String {
        match self {
            Self::Str(text) => format!("{text:?}"),
            other => other.to_string(),
        }
    }
}

fn common_type<'a>(mut values: impl Iterator<Item = &'a Value>) -> String {
    let Some(first) = values.next() else {
        return "_".to_string();
    };
    let name = first.type_name();
    if values.all(|value| value.type_name() == name) {
        name
    } else {
        "Value".to_string()
    }
}

/// Total order used to lay out unordered collections deterministically.
///
/// Values are grouped by kind (booleans, integers, floats, strings, then
/// composites); integers compare numerically across signedness and
/// composites by rendered text.
pub(crate) fn canonical_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(_) | Value::Uint(_), Value::Int(_) | Value::Uint(_)) => {
            wide(a).cmp(&wide(b))
        }
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.nested().cmp(&b.nested())),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) | Value::Uint(_) => 1,
        Value::Float(_) => 2,
        Value::Str(_) => 3,
        _ => 4,
    }
}

fn wide(value: &Value) -> i128 {
    match value {
        Value::Int(n) => i128::from(*n),
        Value::Uint(n) => i128::from(*n),
        _ => 0,
    }
}

/// Whether `type_name` names a hash-ordered set, possibly behind a
/// reference or smart pointer. Such sets iterate in a per-instance order.
pub(crate) fn is_hash_set(type_name: &str) -> bool {
    let mut name = type_name.trim_start_matches('&').trim_start_matches("mut ");
    for wrapper in ["alloc::boxed::Box<", "alloc::rc::Rc<", "alloc::sync::Arc<"] {
        if let Some(inner) = name.strip_prefix(wrapper) {
            name = inner.trim_start_matches('&').trim_start_matches("mut ");
        }
    }
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next() == Some("HashSet")
}

/// Strip module paths from a `std::any::type_name` result, keeping generics.
pub(crate) fn short_type_name(full: &str) -> String {
    let (base, generics) = match full.find('<') {
        Some(at) => full.split_at(at),
        None => (full, ""),
    };
    let base = base.rsplit("::").next().unwrap_or(base);
    format!("{base}{generics}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("None"),
            Self::Str(text) => f.write_str(text),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Uint(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Seq(items) => {
                let rendered: Vec<String> = items.iter().map(Value::nested).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Map(entries) => {
                let mut rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.nested(), value.nested()))
                    .collect();
                rendered.sort();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Self::Record(record) => {
                if let Some(text) = &record.text {
                    return f.write_str(text);
                }
                if record.fields.is_empty() {
                    return f.write_str(&record.name);
                }
                let rendered: Vec<String> = record
                    .fields
                    .iter()
                    .map(|(name, value)| format!("{name}: {}", value.nested()))
                    .collect();
                write!(f, "{} {{ {} }}", record.name, rendered.join(", "))
            }
            Self::Ref(inner) => inner.fmt(f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Str(text) => serializer.serialize_str(text),
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Uint(n) => serializer.serialize_u64(*n),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Seq(items) => serializer.collect_seq(items),
            Self::Map(entries) => {
                serializer.collect_map(entries.iter().map(|(key, value)| (key, value)))
            }
            Self::Record(record) => record.serialize(serializer),
            Self::Ref(inner) => serializer.serialize_some(inner.as_ref()),
        }
    }
}

struct Fields<'a>(&'a [(String, Value)]);

impl Serialize for Fields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, value)| (name, value)))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct(RECORD_TOKEN, 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("fields", &Fields(&self.fields))?;
        state.serialize_field("text", &self.text)?;
        state.end()
    }
}

/// Attaches the `Display` output of `T` to its value as the textual
/// capability, so a string can be checked for containing it.
///
/// ```
/// use trial_diff::{contains, Textual};
///
/// let port = Textual(std::net::Ipv4Addr::LOCALHOST);
/// assert!(contains(&"listening on 127.0.0.1:80", &port).0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Textual<T>(pub T);

impl<T: fmt::Display + Serialize> Serialize for Textual<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct(TEXTUAL_TOKEN, 3)?;
        state.serialize_field("type", &short_type_name(std::any::type_name::<T>()))?;
        state.serialize_field("text", &self.0.to_string())?;
        state.serialize_field("value", &self.0)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_follow_rust_spelling() {
        assert_eq!(Value::Int(1).type_name(), "i64");
        assert_eq!(Value::Seq(vec![]).type_name(), "Vec<_>");
        assert_eq!(
            Value::Seq(vec![Value::Int(1), Value::Str("a".into())]).type_name(),
            "Vec<Value>"
        );
        let map = Value::Map(vec![(Value::Str("k".into()), Value::Bool(true))]);
        assert_eq!(map.type_name(), "Map<String, bool>");
        assert_eq!(
            Value::Ref(Box::new(Value::Float(1.5))).type_name(),
            "Option<f64>"
        );
    }

    #[test]
    fn display_sorts_map_entries_and_quotes_nested_strings() {
        let map = Value::Map(vec![
            (Value::Str("b".into()), Value::Int(2)),
            (Value::Str("a".into()), Value::Str("x".into())),
        ]);
        assert_eq!(map.to_string(), r#"{"a": "x", "b": 2}"#);
        assert_eq!(Value::Str("raw".into()).to_string(), "raw");
    }

    #[test]
    fn record_display_prefers_text() {
        let record = Record::new("Point")
            .with_field("x", Value::Int(1))
            .with_field("y", Value::Int(2));
        assert_eq!(Value::Record(record.clone()).to_string(), "Point { x: 1, y: 2 }");
        assert_eq!(
            Value::Record(record.with_text("(1, 2)")).to_string(),
            "(1, 2)"
        );
    }

    #[test]
    fn short_type_name_keeps_generics() {
        assert_eq!(short_type_name("core::net::ip_addr::Ipv4Addr"), "Ipv4Addr");
        assert_eq!(
            short_type_name("alloc::vec::Vec<alloc::string::String>"),
            "Vec<alloc::string::String>"
        );
        assert_eq!(short_type_name("u8"), "u8");
    }

    #[test]
    fn canonical_order_groups_kinds() {
        let mut items = vec![
            Value::Float(2.5),
            Value::Uint(10),
            Value::Str("b".into()),
            Value::Int(-1),
            Value::Seq(vec![Value::Int(1)]),
            Value::Int(3),
            Value::Str("a".into()),
            Value::Bool(true),
        ];
        items.sort_by(canonical_cmp);
        assert_eq!(
            Value::Seq(items).to_string(),
            r#"[true, -1, 3, 10, 2.5, "a", "b", [1]]"#
        );
    }

    #[test]
    fn hash_sets_are_recognised_through_wrappers() {
        assert!(is_hash_set("std::collections::hash::set::HashSet<i32>"));
        assert!(is_hash_set(
            "&std::collections::hash::set::HashSet<alloc::string::String, std::hash::random::RandomState>"
        ));
        assert!(is_hash_set("alloc::sync::Arc<hashbrown::set::HashSet<u8>>"));
        assert!(!is_hash_set("alloc::collections::btree::set::BTreeSet<i32>"));
        assert!(!is_hash_set("alloc::vec::Vec<std::collections::hash::set::HashSet<i32>>"));
    }

    #[test]
    fn empty_like_sees_through_refs() {
        assert!(Value::Absent.is_empty_like());
        assert!(Value::Ref(Box::new(Value::Seq(vec![]))).is_empty_like());
        assert!(!Value::Str(String::new()).is_empty_like());
    }
}
