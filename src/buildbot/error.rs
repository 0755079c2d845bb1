//! Buildbot API error types.
//!
//! Distinguishes transient failures (the next poll cycle may succeed) from
//! permanent ones (bad credentials, bad configuration). Nothing here is
//! fatal to the process: callers log the error and leave their cache state
//! for the next cycle.

use std::fmt;
use thiserror::Error;

/// The kind of Buildbot API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildbotErrorKind {
    /// Transient: server errors, timeouts, connection failures.
    Transient,

    /// Permanent: authentication or configuration problems that will not
    /// resolve on their own.
    Permanent,
}

/// A Buildbot API error with categorization.
#[derive(Debug, Error)]
pub struct BuildbotApiError {
    /// The kind of error.
    pub kind: BuildbotErrorKind,

    /// The HTTP status code, if the request got far enough to have one.
    pub status_code: Option<u16>,

    /// A human-readable description.
    pub message: String,

    /// The underlying transport error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for BuildbotApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "Buildbot API error (HTTP {}): {}", code, self.message),
            None => write!(f, "Buildbot API error: {}", self.message),
        }
    }
}

impl BuildbotApiError {
    /// Categorizes a transport-level error from reqwest.
    ///
    /// Timeouts and connection failures are transient; anything carrying a
    /// status code is categorized by [`BuildbotApiError::from_status`].
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let mut categorized = Self::from_status(status);
            categorized.source = Some(err);
            return categorized;
        }

        let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
            BuildbotErrorKind::Transient
        } else {
            BuildbotErrorKind::Permanent
        };

        Self {
            kind,
            status_code: None,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Categorizes a non-success HTTP status.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        let kind = if status.is_server_error() || status.as_u16() == 429 {
            BuildbotErrorKind::Transient
        } else {
            BuildbotErrorKind::Permanent
        };

        Self {
            kind,
            status_code: Some(status.as_u16()),
            message: format!("unexpected status {}", status),
            source: None,
        }
    }

    /// An unparseable response body.
    pub fn malformed_body(err: reqwest::Error) -> Self {
        Self {
            kind: BuildbotErrorKind::Permanent,
            status_code: None,
            message: format!("malformed response body: {}", err),
            source: Some(err),
        }
    }
}
