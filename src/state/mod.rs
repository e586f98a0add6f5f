//! State module for a job's chain of results
//!
//! # Components
//!
//! - `ResultKind`: tags which shape of value a job holds (document, elements, strings, ...)
//! - `Payload`: the tagged value itself, with the allowed transitions between kinds
//! - `Value`: one item passed to `map`, `filter`, `replace` and returned by `get`

mod payload;
mod result_kind;
mod value;

// Re-export main types
pub use payload::Payload;
pub use result_kind::ResultKind;
pub use value::{FromValue, Value};
