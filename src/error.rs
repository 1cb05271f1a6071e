//! Error types for crmql.

use std::fmt;

use thiserror::Error;

/// The main error type for query building and execution.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A filter, selection or order key is not declared in the model's field map.
    #[error("Unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    /// The provider tag is not one crmql knows about.
    #[error("Unknown provider: '{0}'")]
    UnknownProvider(String),

    /// No executor was registered for the model's provider.
    #[error("No executor configured for provider '{0}'")]
    ExecutorNotConfigured(String),

    /// The filter document could not be turned into a typed filter.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The dialect cannot render this query.
    #[error("{dialect} dialect does not support {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },

    /// A returned record did not match the selected schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The provider answered with a non-success status.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    /// Create an unknown field error.
    pub fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            model: model.into(),
            field: field.into(),
        }
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }
}

/// Result type alias for crmql operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Typed provider failure, keyed by the HTTP-like status the transport reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Other { status: u16, message: String },
}

impl ProviderError {
    /// The status code this error was created from.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::RateLimited { .. } => 429,
            Self::Server { status, .. } | Self::Other { status, .. } => *status,
        }
    }

    /// Retry hint for rate-limited responses.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

/// Map a non-success status code onto a [`ProviderError`].
///
/// `retry_after_ms` is only kept for 429 responses.
pub fn map_http_status(
    status: u16,
    message: impl Into<String>,
    retry_after_ms: Option<u64>,
) -> ProviderError {
    let message = message.into();
    match status {
        400 => ProviderError::BadRequest(message),
        401 => ProviderError::Unauthorized(message),
        403 => ProviderError::Forbidden(message),
        404 => ProviderError::NotFound(message),
        405 => ProviderError::MethodNotAllowed(message),
        429 => ProviderError::RateLimited {
            message,
            retry_after_ms,
        },
        s if s >= 500 => ProviderError::Server { status: s, message },
        s => ProviderError::Other { status: s, message },
    }
}

/// One field of one record that failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

/// A record could not be coerced into the selected schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    /// Position of the offending record in the provider response.
    pub record: usize,
    pub issues: Vec<FieldIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record {} failed validation:", self.record)?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, " {}: {}", issue.field, issue.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::unknown_field("Opportunity", "nmae");
        assert_eq!(err.to_string(), "Unknown field 'nmae' on model 'Opportunity'");
    }

    #[test]
    fn test_status_table() {
        assert_eq!(map_http_status(400, "x", None), ProviderError::BadRequest("x".into()));
        assert_eq!(map_http_status(401, "x", None), ProviderError::Unauthorized("x".into()));
        assert_eq!(map_http_status(403, "x", None), ProviderError::Forbidden("x".into()));
        assert_eq!(map_http_status(404, "x", None), ProviderError::NotFound("x".into()));
        assert_eq!(map_http_status(405, "x", None), ProviderError::MethodNotAllowed("x".into()));
        assert_eq!(
            map_http_status(503, "x", None),
            ProviderError::Server { status: 503, message: "x".into() }
        );
        assert_eq!(
            map_http_status(418, "x", None),
            ProviderError::Other { status: 418, message: "x".into() }
        );
    }

    #[test]
    fn test_rate_limit_keeps_retry_hint() {
        let err = map_http_status(429, "slow down", Some(2000));
        assert_eq!(err.status(), 429);
        assert_eq!(err.retry_after_ms(), Some(2000));
        assert_eq!(map_http_status(400, "x", Some(2000)).retry_after_ms(), None);
    }

    #[test]
    fn test_validation_display() {
        let err = ValidationError {
            record: 2,
            issues: vec![
                FieldIssue { field: "amount".into(), reason: "expected number".into() },
                FieldIssue { field: "name".into(), reason: "required".into() },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Record 2 failed validation: amount: expected number; name: required"
        );
    }
}
