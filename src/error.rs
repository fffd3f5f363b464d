//! Unified error type.

use thiserror::Error;

/// The error type returned by the fallible composition entry points.
///
/// Errors here are wiring mistakes, surfaced once at startup. A composed
/// [`HandlerFunc`](crate::HandlerFunc) never fails because of composition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A dynamic element matched none of the recognized middleware or
    /// terminal shapes.
    #[error("invalid argument: can't process value with type: {type_name}")]
    UnrecognizedShape { type_name: &'static str },

    /// A chain configuration named an element missing from the registry.
    #[error("unknown chain element `{name}`")]
    UnknownElement { name: String },
}
