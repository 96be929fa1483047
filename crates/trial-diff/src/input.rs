//! Runtime-polymorphic accessor over a case input.
//!
//! Each accessor has a fallible `try_*` form and a plain form that panics
//! with the error message. Inside a trial the panic is caught and reported
//! against the case that misused its input.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::equal::lookup;
use crate::error::InputError;
use crate::ser::to_value;
use crate::value::{Kind, Value};

/// A case input of any shape.
///
/// ```
/// use trial_diff::Input;
///
/// let args = Input::args(&(10, "2"));
/// assert_eq!(args.element_at(0).as_int(), 10);
/// assert_eq!(args.element_at(1).as_int(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Input {
    value: Value,
}

impl Input {
    /// Wrap any serializable value.
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be lowered (see [`Input::try_new`]).
    #[must_use]
    #[track_caller]
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::try_new(value).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_new<T: Serialize + ?Sized>(value: &T) -> Result<Self, InputError> {
        Ok(Self {
            value: to_value(value)?,
        })
    }

    /// Wrap several arguments given as a tuple; they become a sequence.
    ///
    /// A one-element tuple `(x,)` wraps `x` itself.
    #[must_use]
    #[track_caller]
    pub fn args<T: Serialize + ?Sized>(args: &T) -> Self {
        let mut input = Self::new(args);
        if is_single_tuple(std::any::type_name::<T>())
            && let Value::Seq(items) = &mut input.value
            && items.len() == 1
        {
            input.value = items.remove(0);
        }
        input
    }

    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// The underlying value; [`Value::Absent`] for an empty input.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    pub fn try_as_string(&self) -> Result<String, InputError> {
        match &self.value {
            Value::Str(text) => Ok(text.clone()),
            Value::Bool(_) | Value::Int(_) | Value::Uint(_) | Value::Float(_) => {
                Ok(self.value.to_string())
            }
            other => Err(InputError::UnsupportedConversion {
                kind: other.kind().to_string(),
            }),
        }
    }

    pub fn try_as_bool(&self) -> Result<bool, InputError> {
        match &self.value {
            Value::Bool(flag) => Ok(*flag),
            _ => {
                let text = self.try_as_string()?;
                text.trim()
                    .parse()
                    .map_err(|_| InputError::InvalidBool(text))
            }
        }
    }

    pub fn try_as_int(&self) -> Result<i64, InputError> {
        match &self.value {
            Value::Int(n) => Ok(*n),
            Value::Uint(n) => i64::try_from(*n).map_err(|_| InputError::InvalidInt(n.to_string())),
            _ => {
                let text = self.try_as_string()?;
                text.trim()
                    .parse()
                    .map_err(|_| InputError::InvalidInt(text))
            }
        }
    }

    pub fn try_as_uint(&self) -> Result<u64, InputError> {
        match &self.value {
            Value::Uint(n) => Ok(*n),
            Value::Int(n) => u64::try_from(*n).map_err(|_| InputError::InvalidInt(n.to_string())),
            _ => {
                let text = self.try_as_string()?;
                text.trim()
                    .parse()
                    .map_err(|_| InputError::InvalidInt(text))
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn try_as_float64(&self) -> Result<f64, InputError> {
        match &self.value {
            Value::Float(x) => Ok(*x),
            Value::Int(n) => Ok(*n as f64),
            Value::Uint(n) => Ok(*n as f64),
            _ => {
                let text = self.try_as_string()?;
                text.trim()
                    .parse()
                    .map_err(|_| InputError::InvalidFloat(text))
            }
        }
    }

    /// Element `index` of a sequence input, with one level of `Some` removed.
    pub fn try_element_at(&self, index: usize) -> Result<Input, InputError> {
        let Value::Seq(items) = &self.value else {
            return Err(InputError::InvalidKey(format!(
                "{} is not a sequence",
                self.value.type_name()
            )));
        };
        items
            .get(index)
            .map(|item| Input::from_value(item.deref_once().clone()))
            .ok_or(InputError::IndexOutOfRange {
                index,
                len: items.len(),
            })
    }

    /// Value stored under `key` in a map input, with one level of `Some`
    /// removed. Keys are compared structurally.
    pub fn try_value_at<K: Serialize + ?Sized>(&self, key: &K) -> Result<Input, InputError> {
        let Value::Map(entries) = &self.value else {
            return Err(InputError::InvalidKey(format!(
                "{} is not a map",
                self.value.type_name()
            )));
        };
        let key = to_value(key)?;
        lookup(entries, &key)
            .map(|found| Input::from_value(found.deref_once().clone()))
            .ok_or_else(|| InputError::InvalidKey(format!("no entry for {}", key.nested())))
    }

    #[must_use]
    #[track_caller]
    pub fn as_string(&self) -> String {
        self.try_as_string().unwrap_or_else(|err| panic!("{err}"))
    }

    #[must_use]
    #[track_caller]
    pub fn as_bool(&self) -> bool {
        self.try_as_bool().unwrap_or_else(|err| panic!("{err}"))
    }

    #[must_use]
    #[track_caller]
    pub fn as_int(&self) -> i64 {
        self.try_as_int().unwrap_or_else(|err| panic!("{err}"))
    }

    #[must_use]
    #[track_caller]
    pub fn as_uint(&self) -> u64 {
        self.try_as_uint().unwrap_or_else(|err| panic!("{err}"))
    }

    #[must_use]
    #[track_caller]
    pub fn as_float64(&self) -> f64 {
        self.try_as_float64().unwrap_or_else(|err| panic!("{err}"))
    }

    #[must_use]
    #[track_caller]
    pub fn element_at(&self, index: usize) -> Input {
        self.try_element_at(index)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    #[must_use]
    #[track_caller]
    pub fn value_at<K: Serialize + ?Sized>(&self, key: &K) -> Input {
        self.try_value_at(key).unwrap_or_else(|err| panic!("{err}"))
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl Serialize for Input {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// `(T,)`, as spelled by `std::any::type_name`.
fn is_single_tuple(type_name: &str) -> bool {
    let Some(inner) = type_name
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(",)"))
    else {
        return false;
    };
    // A comma outside any brackets means more than one element.
    let mut depth = 0_i32;
    for ch in inner.chars() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn scalars_convert_to_text() {
        assert_eq!(Input::new(&12).as_string(), "12");
        assert_eq!(Input::new(&true).as_string(), "true");
        assert_eq!(Input::new(&1.5).as_string(), "1.5");
        assert_eq!(Input::new("abc").as_string(), "abc");
    }

    #[test]
    fn single_argument_unwraps() {
        assert_eq!(Input::args(&(5,)).raw(), &Value::Int(5));
        assert_eq!(
            Input::args(&(vec![1, 2],)).raw(),
            &Value::Seq(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(Input::args(&(1, 2)).element_at(1).as_int(), 2);
        assert_eq!(Input::args(&vec![7]).raw(), &Value::Seq(vec![Value::Int(7)]));
        assert!(is_single_tuple("(alloc::vec::Vec<(i32, i32)>,)"));
        assert!(!is_single_tuple("(i32, i32)"));
        assert!(!is_single_tuple("alloc::vec::Vec<i32>"));
    }

    #[test]
    fn composites_do_not_convert() {
        let err = Input::new(&vec![1, 2]).try_as_string().unwrap_err();
        assert_eq!(
            err,
            InputError::UnsupportedConversion {
                kind: "sequence".to_string()
            }
        );
        assert!(Input::default().try_as_string().is_err());
        assert!(Input::new(&Some(1)).try_as_int().is_err());
    }

    #[test]
    fn text_parses_into_numbers() {
        assert_eq!(Input::new("42").as_int(), 42);
        assert_eq!(Input::new("42").as_uint(), 42);
        assert!((Input::new("2.5").as_float64() - 2.5).abs() < f64::EPSILON);
        assert!((Input::new(&3).as_float64() - 3.0).abs() < f64::EPSILON);
        assert!(Input::new("false").try_as_bool().is_ok_and(|flag| !flag));
        assert_eq!(
            Input::new("nope").try_as_int(),
            Err(InputError::InvalidInt("nope".to_string()))
        );
        assert_eq!(
            Input::new("maybe").try_as_bool(),
            Err(InputError::InvalidBool("maybe".to_string()))
        );
        assert_eq!(
            Input::new("x").try_as_float64(),
            Err(InputError::InvalidFloat("x".to_string()))
        );
    }

    #[test]
    fn signedness_is_checked() {
        assert!(Input::new(&-1).try_as_uint().is_err());
        assert!(Input::new(&u64::MAX).try_as_int().is_err());
        assert_eq!(Input::new(&7_u8).as_int(), 7);
    }

    #[test]
    fn element_access() {
        let input = Input::args(&(1, Some("x")));
        assert_eq!(input.element_at(1).as_string(), "x");
        assert_eq!(
            input.try_element_at(2),
            Err(InputError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(matches!(
            Input::new(&5).try_element_at(0),
            Err(InputError::InvalidKey(_))
        ));
    }

    #[test]
    fn map_access() {
        let mut map = BTreeMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        let input = Input::new(&map);
        assert_eq!(input.value_at("b").as_int(), 2);
        assert!(matches!(
            input.try_value_at("z"),
            Err(InputError::InvalidKey(_))
        ));
        assert!(matches!(
            Input::new(&[1]).try_value_at("a"),
            Err(InputError::InvalidKey(_))
        ));
    }

    #[test]
    fn raw_of_empty_input_is_absent() {
        assert_eq!(Input::default().raw(), &Value::Absent);
    }

    #[test]
    #[should_panic(expected = "invalid int")]
    fn plain_accessor_panics() {
        let _ = Input::new("ten").as_int();
    }
}
