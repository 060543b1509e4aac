use std::fmt;

use thiserror::Error;

/// A single way in which a request or response fails to conform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no operation matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("method {method} is not allowed on {path} (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<String>,
    },

    #[error("missing required parameter '{name}' in {location}")]
    MissingRequiredParameter { name: String, location: String },

    #[error("invalid parameter '{name}' in {location}: {reason}")]
    InvalidParameter {
        name: String,
        location: String,
        reason: String,
    },

    #[error("missing required request body")]
    MissingRequiredBody,

    #[error("unsupported content-type: {0:?}")]
    UnsupportedContentType(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("response status {0} is not declared by the operation")]
    UnexpectedStatus(String),

    #[error("missing required response header '{0}'")]
    MissingResponseHeader(String),

    #[error("invalid response header '{name}': {reason}")]
    InvalidResponseHeader { name: String, reason: String },

    #[error("invalid response body: {0}")]
    InvalidResponseBody(String),
}

/// The diagnostic carried by a failed validation: one or more violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    errors: Vec<ValidationError>,
}

impl Diagnostic {
    /// Never empty.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub(crate) fn from_errors(errors: Vec<ValidationError>) -> Self {
        debug_assert!(!errors.is_empty(), "a diagnostic needs at least one error");
        Self { errors }
    }
}

impl From<ValidationError> for Diagnostic {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}
