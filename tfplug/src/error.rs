//! Errors raised while reading or writing dynamic values

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, TfplugError>;

impl TfplugError {
    /// True when the error only says the attribute is absent or null
    pub fn is_missing(&self) -> bool {
        matches!(self, TfplugError::AttributeNotFound(_))
    }
}
