//! Structured error model for connector operations.
//!
//! [`ConnectorError`] carries a category, retry metadata and optional
//! diagnostic details. Construct via the category factory methods.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad classification of a connector error.
///
/// Determines default retry behavior and how the engine maps the error
/// onto a pipeline fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid connector configuration.
    Config,
    /// Rate limit exceeded (retryable).
    RateLimit,
    /// Transient network error (retryable).
    TransientNetwork,
    /// Transient database error (retryable).
    TransientDb,
    /// Remote service answered with a non-retryable failure.
    Upstream,
    /// Invalid or corrupt data.
    Data,
    /// Schema mismatch or incompatibility.
    Schema,
    /// Internal connector error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::RateLimit => "rate_limit",
            Self::TransientNetwork => "transient_network",
            Self::TransientDb => "transient_db",
            Self::Upstream => "upstream",
            Self::Data => "data",
            Self::Schema => "schema",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Retry backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffClass {
    /// Second-scale retry.
    Normal,
    /// Minute-scale retry.
    Slow,
}

/// Transaction commit state at the time of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    /// Error occurred before any commit attempt.
    BeforeCommit,
    /// Commit was attempted but outcome is unknown.
    AfterCommitUnknown,
}

/// Validation check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Success,
    Failed,
}

/// Result of a connector connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: String,
}

impl ValidationResult {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Failed,
            message: message.into(),
        }
    }
}

/// Structured error from a connector operation.
///
/// Construct via category-specific factory methods (e.g. [`ConnectorError::config`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct ConnectorError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    pub backoff_class: BackoffClass,
    pub safe_to_retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_state: Option<CommitState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectorError {
    fn new(
        category: ErrorCategory,
        retryable: bool,
        backoff_class: BackoffClass,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retryable,
            retry_after_ms: None,
            backoff_class,
            safe_to_retry: retryable,
            commit_state: None,
            details: None,
        }
    }

    /// Configuration error (not retryable).
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, false, BackoffClass::Normal, code, message)
    }

    /// Rate limit error (retryable, slow backoff).
    #[must_use]
    pub fn rate_limit(
        code: impl Into<String>,
        message: impl Into<String>,
        retry_after_ms: Option<u64>,
    ) -> Self {
        let mut err = Self::new(ErrorCategory::RateLimit, true, BackoffClass::Slow, code, message);
        err.retry_after_ms = retry_after_ms;
        err
    }

    /// Transient network error (retryable, normal backoff).
    #[must_use]
    pub fn transient_network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientNetwork, true, BackoffClass::Normal, code, message)
    }

    /// Transient database error (retryable, normal backoff).
    #[must_use]
    pub fn transient_db(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientDb, true, BackoffClass::Normal, code, message)
    }

    /// Remote service refused the request (not retryable).
    #[must_use]
    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Upstream, false, BackoffClass::Normal, code, message)
    }

    /// Data validation error (not retryable).
    #[must_use]
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Data, false, BackoffClass::Normal, code, message)
    }

    /// Schema mismatch error (not retryable).
    #[must_use]
    pub fn schema(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Schema, false, BackoffClass::Normal, code, message)
    }

    /// Internal connector error (not retryable).
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, false, BackoffClass::Normal, code, message)
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record transaction commit state at time of error.
    ///
    /// Setting [`CommitState::AfterCommitUnknown`] also sets `safe_to_retry = false`.
    #[must_use]
    pub fn with_commit_state(mut self, state: CommitState) -> Self {
        if state == CommitState::AfterCommitUnknown {
            self.safe_to_retry = false;
        }
        self.commit_state = Some(state);
        self
    }

    /// Whether the engine may run the same operation again.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.retryable && self.safe_to_retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_defaults() {
        let err = ConnectorError::config("MISSING_HOST", "host is required");
        assert_eq!(err.category, ErrorCategory::Config);
        assert!(!err.retryable);
        assert!(!err.safe_to_retry);
        assert_eq!(err.backoff_class, BackoffClass::Normal);
    }

    #[test]
    fn transient_errors_are_retryable() {
        let net = ConnectorError::transient_network("TIMEOUT", "timed out");
        assert!(net.can_retry());

        let db = ConnectorError::transient_db("DEADLOCK", "deadlock");
        assert!(db.can_retry());
    }

    #[test]
    fn upstream_is_not_retryable() {
        let err = ConnectorError::upstream("HTTP_404", "not found");
        assert_eq!(err.category, ErrorCategory::Upstream);
        assert!(!err.can_retry());
    }

    #[test]
    fn after_commit_unknown_disables_safe_retry() {
        let err = ConnectorError::transient_db("COMMIT_FAILED", "commit unknown")
            .with_commit_state(CommitState::AfterCommitUnknown);
        assert!(err.retryable);
        assert!(!err.safe_to_retry);
        assert!(!err.can_retry());
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let err = ConnectorError::rate_limit("HTTP_429", "slow down", Some(2_000))
            .with_details(serde_json::json!({"endpoint": "/api_challenge_junior"}));
        assert_eq!(err.retry_after_ms, Some(2_000));
        assert_eq!(err.backoff_class, BackoffClass::Slow);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["category"], "rate_limit");
        assert_eq!(json["details"]["endpoint"], "/api_challenge_junior");
    }

    #[test]
    fn display_format() {
        let err = ConnectorError::config("BAD_PORT", "port must be positive");
        assert_eq!(err.to_string(), "[config] BAD_PORT: port must be positive");
    }
}
