//! Error types for control-plane operations.
//!
//! Errors are categorized so the retry layer knows what is transient and the
//! CLI can print something actionable. Only [`ErrorCategory::Network`] is ever
//! retried: transport failures and HTTP 5xx responses. Every 4xx is final.

use deployment::ComponentKind;
use std::fmt;
use std::time::Duration;

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure or server-side error (transient, retryable).
    Network,
    /// Deployment does not exist.
    NotFound,
    /// The control plane rejected the request.
    Validation,
    /// Local validation failed before any request was sent.
    Local,
    /// The change did not settle before the deadline.
    Timeout,
    /// The control plane reported the change as failed.
    PlanFailed,
    /// The caller cancelled the operation.
    Cancelled,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Deployment not found",
            Self::Validation => "Request rejected by the control plane",
            Self::Local => "Invalid desired state",
            Self::Timeout => "Change did not settle in time",
            Self::PlanFailed => "Change failed remotely",
            Self::Cancelled => "Operation cancelled",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your connection and the API endpoint, then try again",
            Self::NotFound => "Verify the deployment id",
            Self::Validation => "Check the desired state against the API error message",
            Self::Local => "Fix the desired-state file and run the command again",
            Self::Timeout => "The change may still be applying; check with `show` or raise the timeout",
            Self::PlanFailed => "Inspect the remote plan error and adjust the desired state",
            Self::Cancelled => "Run the command again to resume waiting",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the control plane.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if a response was received.
        status: Option<u16>,
    },

    /// Deployment does not exist.
    #[error("deployment not found: {id}")]
    NotFound {
        /// Deployment id.
        id: String,
    },

    /// The control plane rejected the request.
    #[error("request rejected: {message}")]
    Validation {
        /// Message returned by the API.
        message: String,
    },

    /// Local reconciliation failure.
    #[error(transparent)]
    Deployment(#[from] deployment::Error),

    /// Poll deadline exceeded.
    #[error("deployment {id} did not settle within {}s", .elapsed.as_secs())]
    Timeout {
        /// Deployment id.
        id: String,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// A pending plan reported failure.
    #[error("plan for {kind} in deployment {id} failed: {detail}")]
    PlanFailed {
        /// Deployment id.
        id: String,
        /// Component whose plan failed.
        kind: ComponentKind,
        /// Error detail reported by the control plane.
        detail: String,
    },

    /// Cancelled through a [`CancelToken`](crate::poller::CancelToken).
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Map an unsuccessful HTTP status for deployment `id` to an error.
    pub fn from_status(status: u16, body: impl Into<String>, id: &str) -> Self {
        let body = body.into();
        match status {
            404 => Self::NotFound { id: id.to_string() },
            400 | 409 | 422 => Self::Validation {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
            },
            _ => Self::Http {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                None => ErrorCategory::Network,
                Some(code) if *code >= 500 => ErrorCategory::Network,
                Some(_) => ErrorCategory::Other,
            },
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Deployment(_) => ErrorCategory::Local,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::PlanFailed { .. } => ErrorCategory::PlanFailed,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::InvalidResponse(_) => ErrorCategory::Other,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the deployment is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::Local.is_retryable());
        assert!(!ErrorCategory::Timeout.is_retryable());
        assert!(!ErrorCategory::PlanFailed.is_retryable());
        assert!(!ErrorCategory::Cancelled.is_retryable());
        assert!(!ErrorCategory::Other.is_retryable());
    }

    #[test]
    fn test_error_category_description_and_advice() {
        assert!(!ErrorCategory::Network.description().is_empty());
        assert!(!ErrorCategory::Timeout.advice().is_empty());
        assert!(format!("{}", ErrorCategory::Network).contains("Network"));
    }

    #[test]
    fn test_transport_and_5xx_are_retryable() {
        assert!(Error::http("connection reset", None).is_retryable());
        assert!(Error::http("unavailable", Some(503)).is_retryable());
        assert!(Error::from_status(502, "", "abc").is_retryable());
    }

    #[test]
    fn test_4xx_is_fatal() {
        assert!(!Error::http("forbidden", Some(403)).is_retryable());
        assert!(!Error::from_status(401, "", "abc").is_retryable());
        assert!(!Error::from_status(429, "", "abc").is_retryable());
    }

    #[test]
    fn test_from_status_mapping() {
        let err = Error::from_status(404, "", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "deployment not found: abc");

        let err = Error::from_status(400, "bad topology", "abc");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "request rejected: bad topology");

        let err = Error::from_status(422, "", "abc");
        assert_eq!(err.to_string(), "request rejected: HTTP 422");

        let err = Error::from_status(500, "boom", "abc");
        assert_eq!(err.to_string(), "HTTP request failed: HTTP 500: boom");
    }

    #[test]
    fn test_local_error_surfaces_verbatim() {
        let local = deployment::Error::InvalidCapacityFormat {
            value: "1.5g".to_string(),
        };
        let message = local.to_string();
        let err: Error = local.into();
        assert_eq!(err.category(), ErrorCategory::Local);
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_plan_failed_carries_detail() {
        let err = Error::PlanFailed {
            id: "abc".to_string(),
            kind: ComponentKind::Kibana,
            detail: "capacity exhausted".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("capacity exhausted"));
        assert!(err.to_string().contains("kibana"));
    }
}
