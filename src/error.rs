// Error types module

/// Result alias used throughout the synthesizer
pub type Result<T> = std::result::Result<T, SynthError>;

/// Broad error categories
///
/// Schema errors are caused by operator-supplied values, structural errors
/// by the assembly logic itself, reference errors by names that do not
/// resolve to a condition or attribute, and config errors by the
/// deployment file or environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Schema,
    Structural,
    Reference,
    Config,
}

/// Centralized error type for a synthesis pass
///
/// Every variant aborts the pass; nothing is partially rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    // === Schema violations ===
    #[error("Parameter '{parameter}' value '{value}' is not one of: {allowed}")]
    ValueNotAllowed {
        parameter: String,
        value: String,
        allowed: String,
    },

    #[error("Parameter '{parameter}' value '{value}' does not match pattern '{pattern}'")]
    PatternMismatch {
        parameter: String,
        value: String,
        pattern: String,
    },

    #[error("Parameter '{parameter}' expects a number, got '{value}'")]
    NotANumber { parameter: String, value: String },

    #[error("Parameter '{0}' has no default and no value was supplied")]
    MissingValue(String),

    #[error("Value supplied for unknown parameter '{0}'")]
    UnknownParameterValue(String),

    // === Structural violations ===
    #[error("Duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: &'static str, id: String },

    #[error("Reference to undeclared parameter '{0}'")]
    UndeclaredParameter(String),

    #[error("Reference to undeclared resource '{0}'")]
    UndeclaredResource(String),

    #[error("Parameter '{parameter}' has invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        parameter: String,
        pattern: String,
        message: String,
    },

    // === Reference violations ===
    #[error("Condition '{0}' is not declared by any component")]
    UnknownCondition(String),

    #[error("Attribute '{0}' is not exposed by any component")]
    UnknownAttribute(String),

    #[error("Attribute '{0}' has no value at deploy time")]
    UnresolvedAttribute(String),

    #[error("Mapping entry '{0}' is not declared")]
    UnknownMapping(String),

    // === Configuration ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SynthError {
    /// Maps an error to its category
    pub fn category(&self) -> ErrorCategory {
        match self {
            SynthError::ValueNotAllowed { .. }
            | SynthError::PatternMismatch { .. }
            | SynthError::NotANumber { .. }
            | SynthError::MissingValue(_)
            | SynthError::UnknownParameterValue(_) => ErrorCategory::Schema,

            SynthError::DuplicateIdentifier { .. }
            | SynthError::UndeclaredParameter(_)
            | SynthError::UndeclaredResource(_)
            | SynthError::InvalidPattern { .. } => ErrorCategory::Structural,

            SynthError::UnknownCondition(_)
            | SynthError::UnknownAttribute(_)
            | SynthError::UnresolvedAttribute(_)
            | SynthError::UnknownMapping(_) => ErrorCategory::Reference,

            SynthError::Config(_) => ErrorCategory::Config,
        }
    }

    pub fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        SynthError::DuplicateIdentifier {
            kind,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SynthError::Config(message.into())
    }
}

impl From<serde_yaml::Error> for SynthError {
    fn from(err: serde_yaml::Error) -> Self {
        SynthError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SynthError {
    fn from(err: std::io::Error) -> Self {
        SynthError::Config(err.to_string())
    }
}
