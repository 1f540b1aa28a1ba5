//! Data models of GitHub Actions workflows and the run matching a release.

use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    client::GitHubApi,
    env::Config,
    error::{Error, Result},
    release::Release,
};

pub mod artifact;

/// Represents workflow runs from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowRuns {
    /// The number of runs in the repository, across all pages.
    #[serde(default)]
    pub total_count: u64,
    /// The runs on this page, most recent first.
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// Represents a GitHub Actions workflow run from GitHub REST API.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    /// The run id.
    pub id: u64,
    /// The commit the run built.
    pub head_sha: Option<String>,
    /// The branch the run built. Absent for runs on tags or detached heads.
    pub head_branch: Option<String>,
}

/// Picks the run that produced a release's artifacts.
///
/// Prefers, in order: the first run on the release commit, the first run on the release target
/// branch, then the most recent run. Returns [`None`] only for an empty list.
pub fn select_workflow_run<'a>(
    runs: &'a [WorkflowRun],
    release: &Release,
) -> Option<&'a WorkflowRun> {
    let by_commit = release
        .commit_sha
        .as_deref()
        .and_then(|sha| runs.iter().find(|run| run.head_sha.as_deref() == Some(sha)));
    let by_branch = || {
        release.target_branch.as_deref().and_then(|branch| {
            runs.iter()
                .find(|run| run.head_branch.as_deref() == Some(branch))
        })
    };

    by_commit.or_else(by_branch).or_else(|| runs.first())
}

/// Fetches the first page of workflow runs and selects the one matching the release.
///
/// See: [`select_workflow_run`]
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the repository has no runs, or any error of the request.
pub async fn find_workflow_run<C>(
    client: &C,
    config: &Config,
    release: &Release,
) -> Result<WorkflowRun>
where
    C: GitHubApi + Sync,
{
    let path = format!("/actions/runs?per_page={}", config.page_size);
    debug!("fetching workflow runs from {path}…");
    let runs: WorkflowRuns = client.fetch_json(&path).await?;
    debug!(
        "fetched {} of {} workflow runs",
        runs.workflow_runs.len(),
        runs.total_count
    );

    let run = select_workflow_run(&runs.workflow_runs, release)
        .cloned()
        .ok_or_else(|| {
            Error::NotFound(String::from(
                "Unable to locate a workflow run to download artifacts from.",
            ))
        })?;
    info!("selected workflow run {}", run.id);
    Ok(run)
}
