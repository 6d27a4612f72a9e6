/// Domain errors raised by the lower-third engine and its service layer.
///
/// Every variant maps to a stable snake_case code via [`CoreError::code`],
/// which is what callers surface to template authors and end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid SVG: {0}")]
    InvalidSvg(String),

    #[error("Invalid text: {0}")]
    InvalidText(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Validation failed: {message}")]
    Validation { code: &'static str, message: String },

    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Entity is archived: {entity} {key}")]
    Archived { entity: &'static str, key: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidDescriptor(_) => "invalid_descriptor",
            CoreError::InvalidSvg(_) => "invalid_svg",
            CoreError::InvalidText(_) => "invalid_text",
            CoreError::InvalidColor(_) => "invalid_color",
            CoreError::Validation { code, .. } => *code,
            CoreError::NotFound { .. } => "not_found",
            CoreError::Archived { .. } => "archived",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Internal(_) => "internal",
        }
    }

    pub(crate) fn validation(code: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            code,
            message: message.into(),
        }
    }
}
