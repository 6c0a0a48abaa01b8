//! Error types for the wallet service.

/// Upstream statuses that are passed through to callers unchanged.
pub const PASSTHROUGH_STATUSES: [u16; 4] = [401, 422, 429, 503];

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Amount must be a finite number")]
    InvalidAmount,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Failures while acquiring rates from the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// Missing or unusable provider configuration. Not worth retrying.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The upstream call did not succeed. `status` is `None` for transport
    /// failures and timeouts.
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed upstream response: {0}")]
    Parse(String),
}

impl RateError {
    /// HTTP status reported to callers when no cached rates can be served.
    pub fn status_code(&self) -> u16 {
        match self {
            RateError::Upstream {
                status: Some(status),
                ..
            } if PASSTHROUGH_STATUSES.contains(status) => *status,
            _ => 500,
        }
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Remote store error: {0}")]
    Remote(String),
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    RatesUnavailable { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        AppError::RatesUnavailable {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::Database(e) | RepoError::Serialization(e) | RepoError::Remote(e) => {
                AppError::Internal(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: Option<u16>) -> RateError {
        RateError::Upstream {
            status,
            message: "boom".into(),
        }
    }

    #[test]
    fn test_known_statuses_pass_through() {
        for status in PASSTHROUGH_STATUSES {
            assert_eq!(upstream(Some(status)).status_code(), status);
        }
    }

    #[test]
    fn test_other_failures_map_to_500() {
        assert_eq!(upstream(Some(418)).status_code(), 500);
        assert_eq!(upstream(Some(404)).status_code(), 500);
        assert_eq!(upstream(None).status_code(), 500);
        assert_eq!(RateError::Config("no key".into()).status_code(), 500);
        assert_eq!(RateError::Parse("not json".into()).status_code(), 500);
    }

    #[test]
    fn test_rate_error_into_app_error() {
        let app: AppError = upstream(Some(429)).into();
        assert!(matches!(
            app,
            AppError::RatesUnavailable { status: 429, ref message } if message == "boom"
        ));
    }
}
