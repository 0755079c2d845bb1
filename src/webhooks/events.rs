//! Webhook payload parsing.
//!
//! Only one GitHub event matters to the bridge: `issue_comment`. In
//! GitHub's model, comments on a pull request's conversation tab are issue
//! comments; the payload marks PR-attached comments with an
//! `issue.pull_request` object. Everything else (plain issue comments,
//! edits, deletions) is acknowledged and dropped.

use serde::Deserialize;

use crate::engine::CommentSeen;
use crate::types::{CommentId, PrNumber};

#[derive(Debug, Deserialize)]
struct IssueCommentPayload {
    action: String,
    issue: Issue,
    comment: Comment,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,

    /// Present iff the issue is a pull request.
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    body: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

/// Parses an `issue_comment` webhook payload.
///
/// Returns `Ok(Some(..))` for a freshly created comment on a pull request,
/// `Ok(None)` for payloads the bridge does not act on (non-`created`
/// actions, comments on plain issues), and `Err` for bodies that are not
/// valid `issue_comment` JSON at all.
pub fn parse_issue_comment(payload: &[u8]) -> Result<Option<CommentSeen>, serde_json::Error> {
    let payload: IssueCommentPayload = serde_json::from_slice(payload)?;

    if payload.action != "created" {
        return Ok(None);
    }
    if payload.issue.pull_request.is_none() {
        return Ok(None);
    }

    Ok(Some(CommentSeen {
        pr: PrNumber(payload.issue.number),
        comment_id: CommentId(payload.comment.id),
        author: payload.comment.user.login,
        body: payload.comment.body.unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(action: &str, on_pr: bool) -> Vec<u8> {
        let pull_request = if on_pr {
            serde_json::json!({"url": "https://api.github.com/repos/o/r/pulls/42"})
        } else {
            serde_json::Value::Null
        };

        serde_json::to_vec(&serde_json::json!({
            "action": action,
            "issue": {
                "number": 42,
                "pull_request": pull_request,
            },
            "comment": {
                "id": 9001,
                "body": "buildbot, test this",
                "user": {"login": "alice"},
            },
        }))
        .unwrap()
    }

    #[test]
    fn created_pr_comment_is_parsed() {
        let seen = parse_issue_comment(&payload("created", true)).unwrap().unwrap();

        assert_eq!(seen.pr, PrNumber(42));
        assert_eq!(seen.comment_id, CommentId(9001));
        assert_eq!(seen.author, "alice");
        assert_eq!(seen.body, "buildbot, test this");
    }

    #[test]
    fn non_created_actions_are_dropped() {
        assert!(parse_issue_comment(&payload("edited", true)).unwrap().is_none());
        assert!(parse_issue_comment(&payload("deleted", true)).unwrap().is_none());
    }

    #[test]
    fn plain_issue_comments_are_dropped() {
        assert!(parse_issue_comment(&payload("created", false)).unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_issue_comment(b"not json").is_err());
        assert!(parse_issue_comment(b"{}").is_err());
    }
}
