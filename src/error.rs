//! Error types for autograde

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Autograde errors
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("no generator registered for language='{language}', style='{style}'")]
    GeneratorMissing { language: String, style: String },

    #[error("ambiguous runtime for language='{language}'; candidates: {}", .candidates.join(", "))]
    MultipleRuntimes {
        language: String,
        candidates: Vec<String>,
    },

    #[error("unknown runtime '{0}'")]
    UnknownRuntime(String),

    #[error("unknown problem '{0}'")]
    UnknownProblem(String),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl Error {
    /// Structured input errors carry exit code 2 when surfaced by the CLI;
    /// everything else is an internal failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Spec(_)
                | Error::GeneratorMissing { .. }
                | Error::MultipleRuntimes { .. }
                | Error::UnknownRuntime(_)
                | Error::UnknownProblem(_)
        )
    }
}

/// Validation/normalization error with a helpful path + message.
///
/// The path points at the offending node in the problem document, e.g.
/// `tests[2].args.n`. A `None` path means the document itself failed to
/// parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecError {
    pub message: String,
    pub path: Option<String>,
}

impl SpecError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// An error with no path, for document-level failures.
    pub fn document(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for SpecError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_error_display() {
        let err = SpecError::new("must be a string", "tests[2].args.n");
        assert_eq!(err.to_string(), "tests[2].args.n: must be a string");

        let err = SpecError::document("YAML parse error");
        assert_eq!(err.to_string(), "YAML parse error");
    }

    #[test]
    fn test_input_error_classification() {
        assert!(Error::Spec(SpecError::document("bad")).is_input_error());
        assert!(Error::GeneratorMissing {
            language: "python".into(),
            style: "function".into(),
        }
        .is_input_error());
        assert!(!Error::Sandbox("boom".into()).is_input_error());
    }
}
