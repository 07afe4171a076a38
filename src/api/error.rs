//! Failure descriptor attached to rejected queries and mutations.

use serde_json::Value;
use thiserror::Error;

/// Every network-level failure collapses into one of these variants.
///
/// Values are `Clone + PartialEq` because they live inside state snapshots.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Server answered with a non-2xx status.
    #[error("HTTP {status}: {data}")]
    Http { status: u16, data: Value },

    /// Connection could not be established or was interrupted.
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    /// Body was not valid JSON or did not match the expected shape.
    #[error("Failed to parse response (HTTP {original_status}): {message}")]
    Parsing {
        original_status: u16,
        data: String,
        message: String,
    },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP status associated with the failure, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Parsing {
                original_status, ..
            } => Some(*original_status),
            ApiError::Fetch { .. } | ApiError::Timeout { .. } | ApiError::Cancelled => None,
        }
    }

    /// Get error type string for display and logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Http { .. } => "http_error",
            ApiError::Fetch { .. } => "fetch_error",
            ApiError::Parsing { .. } => "parsing_error",
            ApiError::Timeout { .. } => "timeout_error",
            ApiError::Cancelled => "cancelled",
        }
    }

    /// Rejection used when there is no Tokio runtime to run a request on.
    pub(crate) fn no_runtime() -> Self {
        ApiError::Fetch {
            message: "no Tokio runtime available to run the request".to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                seconds: timeout_seconds,
            }
        } else {
            ApiError::Fetch {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_error_status_code() {
        let err = ApiError::Http {
            status: 404,
            data: json!({"message": "not found"}),
        };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.error_type(), "http_error");
    }

    #[test]
    fn test_fetch_error_has_no_status() {
        let err = ApiError::Fetch {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Fetch failed: connection refused");
    }

    #[test]
    fn test_parsing_error_keeps_original_status() {
        let err = ApiError::Parsing {
            original_status: 200,
            data: "<html>".to_string(),
            message: "expected value".to_string(),
        };
        assert_eq!(err.status_code(), Some(200));
        assert_eq!(err.error_type(), "parsing_error");
    }
}
