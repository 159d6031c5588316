//! Reflection error types.

/// Errors raised while dumping, serialising or deserialising a value through
/// its type descriptor.
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// A record's `"type"` tag does not name the descriptor reading it.
    #[error("type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch {
        /// The descriptor's registered name.
        expected: String,
        /// The tag found in the record.
        found: String,
    },

    /// The value handed to a descriptor is not the Rust type it describes.
    #[error("value passed to the '{type_name}' descriptor has a different Rust type")]
    WrongRustType {
        /// The descriptor's registered name.
        type_name: String,
    },

    /// A record is missing a required field (`"type"` or `"data"`).
    #[error("record is missing the '{0}' field")]
    MissingField(&'static str),

    /// The record's payload could not be converted into the described type.
    #[error("invalid data for '{type_name}': {message}")]
    InvalidData {
        /// The descriptor's registered name.
        type_name: String,
        /// What went wrong.
        message: String,
    },

    /// No descriptor is registered under this name.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// JSON encoding or parsing failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
