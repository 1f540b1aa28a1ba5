//! Resolves the latest release and the commit its tag points at.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    client::GitHubApi,
    error::{Error, Result},
};

/// The latest published release, as far as the pipeline cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// The tag name, e.g. `v7.1`.
    pub tag_name: String,
    /// The branch or commit the release was created from.
    pub target_branch: Option<String>,
    /// The commit the tag points at, if it could be resolved.
    pub commit_sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
    target_commitish: Option<String>,
}

/// A git reference or tag object from GitHub REST API. Both wrap a typed [`GitObject`].
#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(default)]
    object: Option<GitObject>,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    #[serde(rename = "type")]
    kind: Option<String>,
    sha: Option<String>,
}

/// Fetches the latest release and resolves its tag to a commit.
///
/// # Errors
///
/// Returns [`Error::Resolution`] if there is no published release or it carries no tag name, or
/// any other error of the underlying requests except a missing tag reference.
pub async fn resolve_release<C>(client: &C) -> Result<Release>
where
    C: GitHubApi + Sync,
{
    let latest: LatestRelease = match client.fetch_json("/releases/latest").await {
        Ok(latest) => latest,
        Err(err) if err.is_not_found_status() => {
            return Err(Error::Resolution(String::from(
                "The repository has no published release.",
            )));
        }
        Err(err) => return Err(err),
    };
    let tag_name = latest
        .tag_name
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| {
            Error::Resolution(String::from(
                "Unable to determine the latest release tag name.",
            ))
        })?;
    info!("resolved latest release {tag_name}");

    let commit_sha = resolve_tag_commit(client, &tag_name).await?;
    Ok(Release {
        tag_name,
        target_branch: latest.target_commitish.filter(|branch| !branch.is_empty()),
        commit_sha,
    })
}

/// Resolves a tag name to the commit it points at, following an annotated tag object once.
///
/// Returns [`None`] if the tag reference does not exist, or if it does not lead to a commit.
///
/// # Errors
///
/// Returns any error of the underlying requests except a 404 on the tag reference.
pub async fn resolve_tag_commit<C>(client: &C, tag: &str) -> Result<Option<String>>
where
    C: GitHubApi + Sync,
{
    let reference: GitRef = match client.fetch_json(&format!("/git/ref/tags/{tag}")).await {
        Ok(reference) => reference,
        Err(err) if err.is_not_found_status() => {
            warn!("tag reference {tag} not found, falling back to branch matching");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    let Some(GitObject {
        kind,
        sha: Some(sha),
    }) = reference.object
    else {
        return Ok(None);
    };

    match kind.as_deref() {
        Some("commit") => Ok(Some(sha)),
        Some("tag") => {
            debug!("dereferencing annotated tag {tag} ({sha})…");
            let tag_object: GitRef = client.fetch_json(&format!("/git/tags/{sha}")).await?;
            Ok(tag_object.object.and_then(|object| match object.kind.as_deref() {
                Some("commit") => object.sha,
                _ => None,
            }))
        }
        _ => Ok(None),
    }
}
