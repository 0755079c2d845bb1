//! GitHub API error types.
//!
//! Distinguishes transient from permanent GitHub API failures:
//!
//! - **Transient** errors may resolve on a later cycle (5xx, rate limits,
//!   network failures)
//! - **Permanent** errors will not (bad credentials, missing repository,
//!   malformed data)
//!
//! The bridge never retries inline either way; the categorization exists
//! for log readers and for callers that want to alert on permanent errors.

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Transient: safe to expect the next poll cycle to succeed.
    Transient,

    /// Permanent: requires configuration or human intervention.
    Permanent,
}

/// A GitHub API error with categorization.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    /// The kind of error.
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } => {
                let code = source.status_code.as_u16();
                let message = source.message.clone();
                let kind = if code == 429
                    || (500..600).contains(&code)
                    || (code == 403 && is_rate_limit_message(&message))
                {
                    GitHubErrorKind::Transient
                } else {
                    GitHubErrorKind::Permanent
                };

                Self {
                    kind,
                    status_code: Some(code),
                    message,
                    source: Some(err),
                }
            }
            _ => {
                let message = err.to_string();
                let kind = if is_network_message(&message) {
                    GitHubErrorKind::Transient
                } else {
                    GitHubErrorKind::Permanent
                };

                Self {
                    kind,
                    status_code: None,
                    message,
                    source: Some(err),
                }
            }
        }
    }

    /// A response that arrived but was missing data the bridge needs.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("rate limit") || message.contains("abuse detection")
}

/// Checks if an error message indicates a network-level failure.
fn is_network_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("timeout")
        || message.contains("timed out")
        || message.contains("connection")
        || message.contains("dns")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit_message("API rate limit exceeded"));
        assert!(is_rate_limit_message("abuse detection mechanism triggered"));
        assert!(!is_rate_limit_message("Permission denied"));
    }

    #[test]
    fn network_message_detection() {
        assert!(is_network_message("connection refused"));
        assert!(is_network_message("request timed out"));
        assert!(is_network_message("DNS resolution failed"));
        assert!(!is_network_message("Not found"));
    }

    #[test]
    fn malformed_is_permanent() {
        let err = GitHubApiError::malformed("pull request has no author");
        assert_eq!(err.kind, GitHubErrorKind::Permanent);
        assert!(format!("{}", err).contains("no author"));
    }
}
