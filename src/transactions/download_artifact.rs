use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    client::GitHubApi,
    error::{Error, Result},
    workflow::artifact::Artifact,
};

/// The file name the artifact archive is downloaded to.
pub const ARCHIVE_FILE_NAME: &str = "artifact.zip";

/// Downloads the specified artifact from GitHub into `dir`, returning the archive path.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the artifact carries no download URL, [`Error::Auth`] if GitHub
/// rejects the credential, or any error of the request.
pub async fn download_artifact<C, P>(client: &C, artifact: &Artifact, dir: P) -> Result<PathBuf>
where
    C: GitHubApi + Sync,
    P: AsRef<Path>,
{
    let url = artifact.archive_download_url.as_deref().ok_or_else(|| {
        Error::NotFound(format!(
            "Artifact '{}' (id={}) has no download URL.",
            artifact.name, artifact.id
        ))
    })?;
    let path = dir.as_ref().join(ARCHIVE_FILE_NAME);
    debug!("downloading artifact {artifact} to {path:?}…");

    client.download(url, &path).await?;

    info!("downloaded artifact {artifact}");
    Ok(path)
}
