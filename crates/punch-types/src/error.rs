use thiserror::Error;

/// Errors produced while rebuilding a record from its stored fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// A required key is absent.
    #[error("missing required key `{key}`")]
    Missing { key: String },

    /// A key is present but its value cannot be coerced to the field's type.
    #[error("malformed value for `{key}` ({value:?}): {reason}")]
    Malformed {
        key: String,
        value: String,
        reason: String,
    },
}

/// Convenience alias for field decoding.
pub type Result<T> = std::result::Result<T, FieldError>;
