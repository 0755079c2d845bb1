//! Environment-driven configuration.
//!
//! Everything the bridge needs is read from `BRIDGE_*` environment
//! variables at startup. Required variables produce a [`ConfigError`] when
//! absent; everything else has a default. Poll intervals live in
//! [`crate::poller::PollConfig`], which reads its own variables.

use std::net::SocketAddr;

use thiserror::Error;

use crate::poller::PollConfig;
use crate::trigger::EmptyDiscussionPolicy;
use crate::types::RepoId;

/// Default comment body that requests a build.
const DEFAULT_TRIGGER_STRING: &str = "buildbot, test this";

/// Default server-side path of the Buildbot change hook.
const DEFAULT_CHANGE_HOOK_PATH: &str = "/change_hook/base";

/// Default webhook listener bind address.
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// A configuration problem detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

/// GitHub-side settings.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Personal access token used for API calls and posting comments.
    pub token: String,

    /// The repository to watch.
    pub repo: RepoId,

    /// The bridge's own login; comments by this user never trigger builds
    /// and mark a PR as acknowledged.
    pub bot_login: String,

    /// The exact comment body that requests a build.
    pub trigger_string: String,

    /// What to do with a PR whose discussion is empty.
    pub empty_discussion: EmptyDiscussionPolicy,
}

/// Buildbot-side settings.
#[derive(Debug, Clone)]
pub struct BuildbotConfig {
    /// Base URL of the Buildbot master, scheme and port included.
    pub base_url: String,

    /// HTTP basic auth for the change hook and status feed, if required.
    pub auth: Option<(String, String)>,

    /// Server-side path of the change hook.
    pub change_hook_path: String,

    /// The builder whose status feed is polled.
    pub builder_name: String,

    /// Project name sent with every change request.
    pub project: String,

    /// Repository identifier sent with every change request.
    pub repository: String,
}

/// Webhook listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,

    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
}

/// Complete bridge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub github: GitHubConfig,
    pub buildbot: BuildbotConfig,
    pub server: ServerConfig,
    pub poll: PollConfig,
}

impl Config {
    /// Reads the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let owner = required("BRIDGE_GITHUB_OWNER")?;
        let repo_name = required("BRIDGE_GITHUB_REPO")?;
        let repo = RepoId::new(owner, repo_name);

        let github = GitHubConfig {
            token: required("BRIDGE_GITHUB_TOKEN")?,
            bot_login: required("BRIDGE_BOT_LOGIN")?,
            trigger_string: optional("BRIDGE_TRIGGER_STRING")
                .unwrap_or_else(|| DEFAULT_TRIGGER_STRING.to_string()),
            empty_discussion: empty_discussion_policy()?,
            repo: repo.clone(),
        };

        let auth = match (
            optional("BRIDGE_BUILDBOT_USERNAME"),
            optional("BRIDGE_BUILDBOT_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        };

        let buildbot = BuildbotConfig {
            base_url: required("BRIDGE_BUILDBOT_URL")?,
            auth,
            change_hook_path: optional("BRIDGE_BUILDBOT_CHANGE_HOOK_PATH")
                .unwrap_or_else(|| DEFAULT_CHANGE_HOOK_PATH.to_string()),
            builder_name: required("BRIDGE_BUILDBOT_BUILDER")?,
            project: optional("BRIDGE_PROJECT").unwrap_or_else(|| repo.repo.clone()),
            repository: optional("BRIDGE_REPOSITORY")
                .unwrap_or_else(|| format!("https://github.com/{}/{}", repo.owner, repo.repo)),
        };

        let listen_addr = optional("BRIDGE_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidVar {
                var: "BRIDGE_LISTEN_ADDR",
                value: listen_addr.clone(),
            })?;

        let server = ServerConfig {
            listen_addr,
            webhook_secret: required("BRIDGE_WEBHOOK_SECRET")?,
        };

        Ok(Config {
            github,
            buildbot,
            server,
            poll: PollConfig::from_env(),
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::MissingVar(var))
}

fn optional(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.is_empty())
}

fn empty_discussion_policy() -> Result<EmptyDiscussionPolicy, ConfigError> {
    match optional("BRIDGE_TRIGGER_ON_EMPTY_DISCUSSION").as_deref() {
        None | Some("false") | Some("0") => Ok(EmptyDiscussionPolicy::Ignore),
        Some("true") | Some("1") => Ok(EmptyDiscussionPolicy::Trigger),
        Some(other) => Err(ConfigError::InvalidVar {
            var: "BRIDGE_TRIGGER_ON_EMPTY_DISCUSSION",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_error_names_the_variable() {
        let err = ConfigError::MissingVar("BRIDGE_GITHUB_TOKEN");
        assert!(format!("{}", err).contains("BRIDGE_GITHUB_TOKEN"));
    }

    #[test]
    fn invalid_var_error_shows_the_value() {
        let err = ConfigError::InvalidVar {
            var: "BRIDGE_LISTEN_ADDR",
            value: "not-an-addr".to_string(),
        };
        let rendered = format!("{}", err);
        assert!(rendered.contains("BRIDGE_LISTEN_ADDR"));
        assert!(rendered.contains("not-an-addr"));
    }
}
