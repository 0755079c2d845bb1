//! Octocrab client wrapper scoped to a specific repository.
//!
//! All operations performed through this client target the same repository,
//! so call sites never pass owner/repo pairs around. The wrapper also maps
//! octocrab's models into the bridge's own types at the boundary; nothing
//! outside this module sees an octocrab model.

use chrono::Utc;
use octocrab::Octocrab;

use crate::engine::{CommentPoster, PullRequestSource};
use crate::types::{DiscussionEntry, DiscussionKind, OpenPullRequest, PrNumber, RepoId, Sha};

use super::error::GitHubApiError;

/// A GitHub API client scoped to a specific repository.
#[derive(Clone)]
pub struct GitHubClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// The repository this client is scoped to.
    repo: RepoId,
}

impl GitHubClient {
    /// Creates a new client scoped to the given repository.
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self { client, repo }
    }

    /// Creates a client from a personal access token.
    pub fn from_token(token: impl Into<String>, repo: RepoId) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client, repo))
    }

    /// Returns the repository this client is scoped to.
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Lists the repository's open pull requests.
    pub async fn list_open_pull_requests(&self) -> Result<Vec<OpenPullRequest>, GitHubApiError> {
        let page = self
            .client
            .pulls(&self.repo.owner, &self.repo.repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(100)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        page.items.into_iter().map(map_pull).collect()
    }

    /// Fetches the current state of one pull request.
    pub async fn get_pull_request(&self, pr: PrNumber) -> Result<OpenPullRequest, GitHubApiError> {
        let pull = self
            .client
            .pulls(&self.repo.owner, &self.repo.repo)
            .get(pr.0)
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        map_pull(pull)
    }

    /// Fetches a PR's conversation-tab comments, oldest first.
    ///
    /// GitHub returns issue comments in creation order, which is the order
    /// the trigger evaluator expects.
    pub async fn get_discussion(&self, pr: PrNumber) -> Result<Vec<DiscussionEntry>, GitHubApiError> {
        let page = self
            .client
            .issues(&self.repo.owner, &self.repo.repo)
            .list_comments(pr.0)
            .per_page(100)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(page
            .items
            .into_iter()
            .map(|comment| DiscussionEntry {
                author: comment.user.login,
                kind: DiscussionKind::IssueComment,
                body: comment.body.unwrap_or_default(),
            })
            .collect())
    }

    /// Posts a comment on a pull request.
    pub async fn create_comment(&self, pr: PrNumber, body: &str) -> Result<(), GitHubApiError> {
        self.client
            .issues(&self.repo.owner, &self.repo.repo)
            .create_comment(pr.0, body)
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

impl PullRequestSource for GitHubClient {
    type Error = GitHubApiError;

    async fn fetch_pull_request(&self, pr: PrNumber) -> Result<OpenPullRequest, GitHubApiError> {
        self.get_pull_request(pr).await
    }

    async fn fetch_discussion(&self, pr: PrNumber) -> Result<Vec<DiscussionEntry>, GitHubApiError> {
        self.get_discussion(pr).await
    }
}

impl CommentPoster for GitHubClient {
    type Error = GitHubApiError;

    async fn post_comment(&self, pr: PrNumber, body: String) -> Result<(), GitHubApiError> {
        self.create_comment(pr, &body).await
    }
}

/// Maps an octocrab pull request into the bridge's poll-source shape.
fn map_pull(pull: octocrab::models::pulls::PullRequest) -> Result<OpenPullRequest, GitHubApiError> {
    let number = PrNumber(pull.number);

    let author = pull
        .user
        .as_ref()
        .map(|user| user.login.clone())
        .ok_or_else(|| GitHubApiError::malformed(format!("pull request {number} has no author")))?;

    // GitHub always sends these timestamps in practice; the models make
    // them optional, so fall back rather than fail the whole poll cycle.
    let updated_at = pull
        .updated_at
        .or(pull.created_at)
        .unwrap_or_else(Utc::now);

    Ok(OpenPullRequest {
        number,
        updated_at,
        head_sha: Sha::new(pull.head.sha),
        head_branch: pull.head.ref_field,
        author,
    })
}
