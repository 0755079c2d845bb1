//! Observed CI builds and their correlation properties.
//!
//! When the bridge requests a build, it attaches the pull request number and
//! head revision to the change as opaque build properties. Buildbot carries
//! those properties through to the finished build record, which is how a
//! completed build is matched back to the request cache without any shared
//! database.

use serde::{Deserialize, Serialize};

use super::ids::{BuildNumber, CorrelationKey, PrNumber, Sha};

/// Name of the build property carrying the pull request number.
pub const PROP_PULL_REQUEST_ID: &str = "pull-request-id";

/// Name of the build property carrying the head revision.
pub const PROP_REVISION: &str = "revision";

/// A build reported by the CI server's build list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedBuild {
    /// The build number within its builder.
    pub number: BuildNumber,

    /// Build properties as (name, value) pairs.
    ///
    /// Property names are matched case-insensitively; Buildbot preserves
    /// whatever casing the change submitter used.
    pub properties: Vec<(String, String)>,

    /// The build's status text, joined into one line (e.g., "build successful").
    pub text: String,

    /// The branch the build ran on, if reported.
    pub branch: Option<String>,

    /// The name of the builder that produced this build.
    pub builder_name: String,
}

impl ObservedBuild {
    /// Looks up a property value by name, case-insensitively.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Extracts the correlation identity embedded in the build properties.
    ///
    /// Returns `None` when either property is missing or the pull request
    /// number does not parse; such builds were not requested by this bridge
    /// (or the properties were mangled) and are dropped by the caller.
    pub fn correlation(&self) -> Option<(PrNumber, Sha)> {
        let pr: u64 = self.property(PROP_PULL_REQUEST_ID)?.parse().ok()?;
        let revision = Sha::new(self.property(PROP_REVISION)?);
        Some((PrNumber(pr), revision))
    }

    /// Derives the correlation key for this build, if it carries one.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        self.correlation()
            .map(|(pr, revision)| CorrelationKey::new(pr, &revision))
    }
}
