//! Artifacts from GitHub REST API and related functions.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::{
    client::GitHubApi,
    env::Config,
    error::{Error, Result},
};

/// Represents artifacts from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct Artifacts {
    /// The number of artifacts of the run, across all pages.
    #[serde(default)]
    pub total_count: u64,
    /// The artifacts on this page.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// The name reported for artifacts listed without one.
pub const UNKNOWN_ARTIFACT_NAME: &str = "<unknown>";

fn unknown_name() -> String {
    UNKNOWN_ARTIFACT_NAME.to_owned()
}

fn name_or_unknown<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_name))
}

/// Represents an artifact from GitHub REST API.
///
/// Entries without a name or download URL still parse, so one malformed entry never hides the
/// rest of a listing.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The artifact id.
    pub id: u64,
    /// The artifact name given by the workflow, or [`UNKNOWN_ARTIFACT_NAME`].
    #[serde(default = "unknown_name", deserialize_with = "name_or_unknown")]
    pub name: String,
    /// The API URL serving the zipped artifact.
    #[serde(default)]
    pub archive_download_url: Option<String>,
    /// Whether the artifact has passed its retention period.
    #[serde(default)]
    pub expired: bool,
    /// When the artifact expires or expired.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.archive_download_url {
            Some(url) => write!(f, "{} ({} at {url})", self.name, self.id),
            None => write!(f, "{} ({})", self.name, self.id),
        }
    }
}

/// Finds the first artifact named exactly `name`, in API order.
///
/// # Errors
///
/// Returns [`Error::NotFound`] listing the sorted names of all present artifacts if none matches.
pub fn select_artifact<'a>(artifacts: &'a [Artifact], name: &str) -> Result<&'a Artifact> {
    if let Some(artifact) = artifacts.iter().find(|artifact| artifact.name == name) {
        return Ok(artifact);
    }

    let mut names: Vec<&str> = artifacts
        .iter()
        .map(|artifact| artifact.name.as_str())
        .collect();
    names.sort_unstable();
    let available = match names.as_slice() {
        [] => String::from("<none>"),
        names => names.join(", "),
    };
    Err(Error::NotFound(format!(
        "Could not find artifact named '{name}'. Available artifacts: {available}."
    )))
}

/// Fetches the first page of artifacts of a workflow run and selects the configured one.
///
/// See: [`select_artifact`]
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no artifact matches or the match has expired, or any error of
/// the request.
pub async fn find_artifact<C>(client: &C, config: &Config, run_id: u64) -> Result<Artifact>
where
    C: GitHubApi + Sync,
{
    let path = format!(
        "/actions/runs/{run_id}/artifacts?per_page={}",
        config.page_size
    );
    debug!("fetching artifacts from {path}…");
    let artifacts: Artifacts = client.fetch_json(&path).await?;
    match artifacts.artifacts.len() {
        1 => debug!("fetched 1 artifact of run {run_id}"),
        count => debug!(
            "fetched {count} of {} artifacts of run {run_id}",
            artifacts.total_count
        ),
    }

    let artifact = select_artifact(&artifacts.artifacts, &config.artifact_name)?.clone();
    if artifact.expired {
        debug!("artifact {artifact} has expired");
        let when = artifact
            .expires_at
            .map(|at| format!(" on {}", at.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_default();
        return Err(Error::NotFound(format!(
            "Artifact '{}' (id={}) of workflow run {run_id} expired{when}.",
            artifact.name, artifact.id
        )));
    }

    info!("found artifact {artifact}");
    Ok(artifact)
}
