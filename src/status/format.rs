//! Result comment rendering.

use crate::types::{BuildNumber, PrNumber, Sha};

use super::classify::BuildOutcome;

/// Renders the comment posted back on a pull request when its build
/// completes.
///
/// The comment names the builder, the build number, the revision that was
/// built, and the outcome, so a reader can find the build in the Buildbot
/// UI without following any links.
pub fn render_result_comment(
    pr: PrNumber,
    build: BuildNumber,
    builder_name: &str,
    revision: &Sha,
    outcome: BuildOutcome,
) -> String {
    let verdict = match outcome {
        BuildOutcome::Success => "succeeded",
        BuildOutcome::Failure => "failed",
    };

    format!(
        "Build {build} on builder `{builder_name}` {verdict} for {pr} at revision `{rev}` (status: {status}).",
        rev = revision.short(),
        status = outcome.as_status_str(),
    )
}
