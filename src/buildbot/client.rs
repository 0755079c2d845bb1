//! HTTP client for the Buildbot master.
//!
//! Two endpoints matter to the bridge:
//!
//! - the change hook (`POST <change_hook_path>`), which accepts a
//!   form-encoded change and schedules a build for it;
//! - the builder status feed (`GET /json/builders/<builder>/builds/_all`),
//!   which lists the builder's recent builds with their properties and
//!   status text.
//!
//! The change hook carries the pull request number and revision as build
//! properties, which Buildbot copies onto the resulting build record. That
//! round trip is the only correlation mechanism between a request and its
//! completed build.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::engine::{BuildRequester, CHANGE_COMMENTS, ChangeRequest};
use crate::types::{BuildNumber, ObservedBuild, PROP_PULL_REQUEST_ID, PROP_REVISION};

use super::error::BuildbotApiError;

/// Default request timeout for Buildbot calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A client scoped to one Buildbot master and one builder.
#[derive(Clone)]
pub struct BuildbotClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
    change_hook_path: String,
    builder_name: String,
}

impl BuildbotClient {
    /// Creates a client for the given master.
    ///
    /// `base_url` includes the scheme and port (e.g.,
    /// `http://buildbot.example.com:8010`); `change_hook_path` is the
    /// server-side path of the change hook (conventionally
    /// `/change_hook/base`).
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<(String, String)>,
        change_hook_path: impl Into<String>,
        builder_name: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(BuildbotClient {
            http,
            base_url,
            auth,
            change_hook_path: change_hook_path.into(),
            builder_name: builder_name.into(),
        })
    }

    /// Returns the builder this client polls.
    pub fn builder_name(&self) -> &str {
        &self.builder_name
    }

    /// Submits a change to the change hook, scheduling a build.
    pub async fn send_changes(&self, change: &ChangeRequest) -> Result<(), BuildbotApiError> {
        let url = format!("{}{}", self.base_url, self.change_hook_path);
        let properties = correlation_properties(change);

        let form = [
            ("project", change.project.as_str()),
            ("repository", change.repository.as_str()),
            ("revision", change.revision.as_str()),
            ("who", change.who.as_str()),
            ("branch", change.branch.as_str()),
            ("category", change.category.as_str()),
            ("comments", CHANGE_COMMENTS),
            ("properties", properties.as_str()),
        ];

        let mut request = self.http.post(&url).form(&form);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await.map_err(BuildbotApiError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(BuildbotApiError::from_status(response.status()));
        }

        Ok(())
    }

    /// Fetches the builder's recent builds, oldest first.
    pub async fn recent_builds(&self) -> Result<Vec<ObservedBuild>, BuildbotApiError> {
        let url = format!(
            "{}/json/builders/{}/builds/_all",
            self.base_url, self.builder_name
        );

        let mut request = self.http.get(&url);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await.map_err(BuildbotApiError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(BuildbotApiError::from_status(response.status()));
        }

        let body: HashMap<String, WireBuild> = response
            .json()
            .await
            .map_err(BuildbotApiError::malformed_body)?;

        let mut builds: Vec<ObservedBuild> = body
            .into_values()
            .map(|wire| wire.into_observed(&self.builder_name))
            .collect();
        builds.sort_by_key(|build| build.number);

        Ok(builds)
    }
}

impl std::fmt::Debug for BuildbotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildbotClient")
            .field("base_url", &self.base_url)
            .field("builder_name", &self.builder_name)
            .finish_non_exhaustive()
    }
}

impl BuildRequester for BuildbotClient {
    type Error = BuildbotApiError;

    async fn request_build(&self, change: ChangeRequest) -> Result<(), BuildbotApiError> {
        self.send_changes(&change).await
    }
}

/// Renders the JSON property blob attached to a change request.
fn correlation_properties(change: &ChangeRequest) -> String {
    let mut properties = serde_json::Map::new();
    properties.insert(
        PROP_PULL_REQUEST_ID.to_string(),
        Value::String(change.pull_request_id.0.to_string()),
    );
    properties.insert(
        PROP_REVISION.to_string(),
        Value::String(change.revision.as_str().to_string()),
    );
    Value::Object(properties).to_string()
}

// ─── Wire Types ───────────────────────────────────────────────────────────────

/// A build as serialized by the builder status feed.
///
/// Properties arrive as `[name, value, source]` triples, and the status
/// text as a list of words (e.g., `["build", "successful"]`).
#[derive(Debug, Clone, Deserialize)]
struct WireBuild {
    number: u64,

    #[serde(default)]
    properties: Vec<(String, Value, String)>,

    #[serde(default)]
    text: Vec<String>,

    #[serde(default, rename = "builderName")]
    builder_name: Option<String>,

    #[serde(default)]
    branch: Option<String>,
}

impl WireBuild {
    fn into_observed(self, default_builder: &str) -> ObservedBuild {
        let builder_name = self
            .builder_name
            .unwrap_or_else(|| default_builder.to_string());

        let properties = self
            .properties
            .into_iter()
            .filter_map(|(name, value, _source)| {
                property_value_to_string(&value).map(|value| (name, value))
            })
            .collect();

        ObservedBuild {
            number: BuildNumber(self.number),
            properties,
            text: self.text.join(" "),
            branch: self.branch,
            builder_name,
        }
    }
}

/// Coerces a JSON property value to a string.
///
/// Buildbot property values are arbitrary JSON; the ones this bridge cares
/// about are strings or numbers. Structured values have no string form and
/// are dropped.
fn property_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrNumber, Sha};

    #[test]
    fn correlation_properties_round_trip_through_json() {
        let change = ChangeRequest {
            pull_request_id: PrNumber(42),
            revision: Sha::new("abc123"),
            who: "alice".to_string(),
            project: "widget".to_string(),
            repository: "git://example.com/widget.git".to_string(),
            branch: "feature".to_string(),
            category: "pull_request".to_string(),
        };

        let parsed: Value = serde_json::from_str(&correlation_properties(&change)).unwrap();
        assert_eq!(parsed[PROP_PULL_REQUEST_ID], "42");
        assert_eq!(parsed[PROP_REVISION], "abc123");
    }

    #[test]
    fn wire_build_parses_builder_status_json() {
        let json = r#"{
            "number": 7,
            "properties": [
                ["pull-request-id", "42", "Change"],
                ["revision", "abc123", "Change"],
                ["buildnumber", 7, "Build"]
            ],
            "text": ["build", "successful"],
            "builderName": "pull-requests",
            "branch": "feature"
        }"#;

        let wire: WireBuild = serde_json::from_str(json).unwrap();
        let build = wire.into_observed("fallback");

        assert_eq!(build.number, BuildNumber(7));
        assert_eq!(build.text, "build successful");
        assert_eq!(build.builder_name, "pull-requests");
        assert_eq!(build.branch.as_deref(), Some("feature"));
        assert_eq!(build.property("pull-request-id"), Some("42"));
        // Numeric property values are coerced to strings.
        assert_eq!(build.property("buildnumber"), Some("7"));
    }

    #[test]
    fn wire_build_tolerates_missing_optional_fields() {
        let wire: WireBuild = serde_json::from_str(r#"{"number": 3}"#).unwrap();
        let build = wire.into_observed("pull-requests");

        assert_eq!(build.number, BuildNumber(3));
        assert_eq!(build.text, "");
        assert_eq!(build.builder_name, "pull-requests");
        assert!(build.properties.is_empty());
    }

    #[test]
    fn structured_property_values_are_dropped() {
        assert_eq!(property_value_to_string(&serde_json::json!([1, 2])), None);
        assert_eq!(
            property_value_to_string(&serde_json::json!("abc")),
            Some("abc".to_string())
        );
    }
}
