#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("unsupported value type combination: {0}")]
    UnsupportedValueType(String),

    #[error("ambiguous ascii tree: {0}")]
    AmbiguousAscii(String),

    #[error("key mismatch: expected {expected:?}, got {got:?}")]
    KeyMismatch { expected: String, got: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
