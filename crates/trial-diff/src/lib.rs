//! Structural comparison engine for table-driven trials.
//!
//! Values of any `serde::Serialize` type are lowered into a closed [`Value`]
//! model and compared by:
//! - [`equal`] / [`equal_with`]: deep equality with [`EqualOptions`].
//! - [`contains`]: asymmetric containment (substring, subset, sub-map).
//! - [`Diff`]: the structured mismatch behind the rendered text.
//! - [`Input`]: runtime accessor used to unpack case inputs.

#![forbid(unsafe_code)]

pub mod contains;
pub mod diff;
pub mod equal;
pub mod error;
pub mod input;
pub mod ser;
pub mod value;

pub use contains::{contains, contains_values};
pub use diff::{Diff, KeyDiff};
pub use equal::{equal, equal_values, equal_with, EqualOptions};
pub use error::{InputError, ValueError};
pub use input::Input;
pub use ser::to_value;
pub use value::{Kind, Record, Textual, Value};
