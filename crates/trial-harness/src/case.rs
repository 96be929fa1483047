//! Case definitions and expected-error matching.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Error type every function under test is converted into.
pub type CaseError = Box<dyn Error + Send + Sync + 'static>;

/// Named cases; names are unique and reports are ordered by name.
pub type Cases<In, Out> = BTreeMap<String, Case<In, Out>>;

/// One named scenario: input, expected output and failure expectations.
///
/// ```
/// use trial_harness::{Case, ErrorMatcher};
///
/// let ok = Case::new((10, 2), 5);
/// let err = Case::new((1, 0), 0).expect_err(ErrorMatcher::message("divide by zero"));
/// let boom: Case<(i32, i32), i32> = Case { input: (0, 0), should_panic: true, ..Case::default() };
/// # let _ = (ok, err, boom);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Case<In, Out> {
    pub input: In,
    pub expected: Out,
    /// An error is required; its content is not checked.
    pub should_err: bool,
    /// An error is required and must match.
    pub expected_err: Option<ErrorMatcher>,
    /// A panic is required; nothing else is checked.
    pub should_panic: bool,
}

impl<In, Out> Case<In, Out> {
    #[must_use]
    pub fn new(input: In, expected: Out) -> Self {
        Self {
            input,
            expected,
            should_err: false,
            expected_err: None,
            should_panic: false,
        }
    }

    #[must_use]
    pub fn should_err(mut self) -> Self {
        self.should_err = true;
        self
    }

    #[must_use]
    pub fn expect_err(mut self, matcher: impl Into<ErrorMatcher>) -> Self {
        self.expected_err = Some(matcher.into());
        self
    }

    #[must_use]
    pub fn should_panic(mut self) -> Self {
        self.should_panic = true;
        self
    }

    /// Either error flag is set.
    #[must_use]
    pub fn expects_error(&self) -> bool {
        self.should_err || self.expected_err.is_some()
    }
}

type TypeCheck = fn(&(dyn Error + Send + Sync + 'static)) -> bool;

fn is_type<T: Error + 'static>(err: &(dyn Error + Send + Sync + 'static)) -> bool {
    err.is::<T>()
}

/// How an expected error is matched against the produced one.
#[derive(Clone)]
pub enum ErrorMatcher {
    /// Substring of the produced error's `Display` output.
    Message(String),
    /// Concrete error type; the message is ignored.
    Type { name: String, check: TypeCheck },
}

impl ErrorMatcher {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Match any error whose `Display` contains `err`'s message.
    #[must_use]
    pub fn like(err: &dyn Error) -> Self {
        Self::Message(err.to_string())
    }

    /// Match by concrete type (downcast), ignoring the message.
    #[must_use]
    pub fn of_type<T: Error + 'static>() -> Self {
        let full = std::any::type_name::<T>();
        Self::Type {
            name: full.rsplit("::").next().unwrap_or(full).to_string(),
            check: is_type::<T>,
        }
    }

    #[must_use]
    pub fn matches(&self, err: &(dyn Error + Send + Sync + 'static)) -> bool {
        match self {
            Self::Message(message) => err.to_string().contains(message.as_str()),
            Self::Type { check, .. } => check(err),
        }
    }
}

impl fmt::Debug for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Self::Type { name, .. } => f.debug_struct("Type").field("name", name).finish(),
        }
    }
}

impl fmt::Display for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message:?}"),
            Self::Type { name, .. } => write!(f, "type {name}"),
        }
    }
}

impl From<&str> for ErrorMatcher {
    fn from(message: &str) -> Self {
        Self::message(message)
    }
}

impl From<String> for ErrorMatcher {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}
