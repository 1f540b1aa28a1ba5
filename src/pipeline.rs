//! Runs the whole fetch, from the latest release down to the extracted bundles.

use std::{fmt::Debug, path::Path};

use tracing::info;

use crate::{
    client::GitHubApi,
    env::Config,
    error::Result,
    release::resolve_release,
    transactions::{LocatedFrameworks, download_artifact, extract_frameworks, frameworks_exist},
    workflow::{artifact::find_artifact, find_workflow_run},
};

/// Fetches the framework bundles of the latest release into `destination`, narrating progress
/// to standard output.
///
/// With `skip_existing`, a destination already holding every expected bundle is left as is and
/// [`None`] is returned without any request. Otherwise the token is checked before any request is
/// sent. Every stage runs after the previous one finishes, and the first failure aborts the fetch.
/// Missing bundles are reported on standard error without failing the fetch.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] if no token is configured, or the first error of any stage.
pub async fn fetch_latest_frameworks<C, P>(
    client: &C,
    config: &Config,
    destination: P,
    skip_existing: bool,
) -> Result<Option<LocatedFrameworks>>
where
    C: GitHubApi + Sync,
    P: AsRef<Path> + Send + Sync + Debug,
{
    if skip_existing && frameworks_exist(&destination) {
        println!(
            "Existing FFmpeg XCFrameworks found at {}. Omit --skip-existing to re-download.",
            destination.as_ref().display()
        );
        return Ok(None);
    }
    config.require_token()?;

    println!(
        "Resolving latest release in {}/{}…",
        config.owner, config.repo
    );
    let release = resolve_release(client).await?;
    println!("Latest release tag: {}", release.tag_name);
    if let Some(sha) = &release.commit_sha {
        println!("Release commit SHA: {sha}");
    }
    if let Some(branch) = &release.target_branch {
        println!("Release target branch: {branch}");
    }

    let run = find_workflow_run(client, config, &release).await?;
    println!(
        "Using workflow run {} ({} @ {})",
        run.id,
        run.head_branch.as_deref().unwrap_or("-"),
        run.head_sha.as_deref().unwrap_or("-")
    );

    let artifact = find_artifact(client, config, run.id).await?;
    println!(
        "Downloading artifact '{}' (id={})…",
        artifact.name, artifact.id
    );

    let download_dir = tempfile::tempdir()?;
    let archive = download_artifact(client, &artifact, download_dir.path()).await?;
    println!("Extracting frameworks…");
    let located = extract_frameworks(&archive, &destination).await?;
    if let Some(warning) = located.missing_warning() {
        eprintln!("{warning}");
    }

    println!(
        "XCFrameworks extracted to {}",
        destination.as_ref().display()
    );
    info!(
        "fetched {} frameworks of release {}",
        located.found.len(),
        release.tag_name
    );
    Ok(Some(located))
}
