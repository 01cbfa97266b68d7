use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified upstream failure.
///
/// Every non-2xx response, transport failure and decode failure from the
/// stats provider is mapped onto one of these variants. The variant decides
/// retryability: a terminal error returns immediately from the retry engine,
/// a retryable one is attempted again within the policy budget.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Floor for the next backoff delay, from a Retry-After header.
        retry_after: Option<Duration>,
    },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unknown upstream error: {0}")]
    Unknown(String),
}

impl UpstreamError {
    /// Create a new NotFound error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a new RateLimited error with an optional Retry-After hint
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    /// Create a new Timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a new Malformed error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create a new Unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Whether another attempt could succeed.
    ///
    /// `NotFound` and `Malformed` are terminal: the resource does not exist,
    /// or re-requesting cannot repair a parse failure. `Unknown` is treated
    /// as terminal so unclassified failures do not burn the retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Unavailable(_)
        )
    }

    /// Retry-After hint, when the upstream supplied one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Stable kind tag for logging and the wire-level `DataSourceError`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Timeout(m)
            | Self::Unavailable(m)
            | Self::Malformed(m)
            | Self::Unknown(m) => m,
            Self::RateLimited { message, .. } => message,
        }
    }
}

/// Error kind tags, serialized for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    RateLimited,
    Timeout,
    Unavailable,
    Malformed,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Malformed => write!(f, "malformed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Terminal failures of a whole profile fetch.
///
/// Partial dataset failures never surface here; they degrade the affected
/// dataset and the profile is still returned. The fetch as a whole fails
/// only when the player identity cannot be established or the overall
/// deadline lapses.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("profile fetch exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("identity lookup failed: {0}")]
    IdentityLookup(#[source] UpstreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_verdicts() {
        assert!(UpstreamError::rate_limited("slow down", None).is_retryable());
        assert!(UpstreamError::timeout("deadline").is_retryable());
        assert!(UpstreamError::unavailable("503").is_retryable());

        assert!(!UpstreamError::not_found("no such player").is_retryable());
        assert!(!UpstreamError::malformed("bad json").is_retryable());
        assert!(!UpstreamError::unknown("teapot").is_retryable());
    }

    #[test]
    fn test_retry_after_hint() {
        let hinted =
            UpstreamError::rate_limited("slow down", Some(Duration::from_secs(7)));
        assert_eq!(hinted.retry_after(), Some(Duration::from_secs(7)));

        let unhinted = UpstreamError::rate_limited("slow down", None);
        assert_eq!(unhinted.retry_after(), None);

        assert_eq!(UpstreamError::timeout("deadline").retry_after(), None);
    }

    #[test]
    fn test_kind_and_message() {
        let err = UpstreamError::unavailable("connection refused");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.message(), "connection refused");
        assert_eq!(err.to_string(), "upstream unavailable: connection refused");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
        assert_eq!(ErrorKind::Unavailable.to_string(), "unavailable");
        assert_eq!(ErrorKind::Malformed.to_string(), "malformed");
        assert_eq!(ErrorKind::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
    }

    #[test]
    fn test_profile_error_display() {
        let err = ProfileError::PlayerNotFound("76561198000000000".into());
        assert_eq!(err.to_string(), "player not found: 76561198000000000");

        let err = ProfileError::DeadlineExceeded(Duration::from_secs(10));
        assert!(err.to_string().contains("deadline"));
    }
}
