use async_zip::base::read::seek::ZipFileReader;
use futures::io::AsyncWriteExt as _;
use tokio::io::BufReader;
use tokio_util::compat::{TokioAsyncReadCompatExt as _, TokioAsyncWriteCompatExt as _};
use tracing::debug;

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

fn sanitize_file_path(path: &str) -> PathBuf {
    // Replaces backwards slashes
    path.replace('\\', "/")
        // Sanitizes each component
        .split('/')
        .map(sanitize_filename::sanitize)
        .collect()
}

/// Extracts a zip archive on disk to a specified path.
/// This function will sanitize the file path and create intermediate directories if possible.
///
/// Entries are located through the central directory, so entries whose sizes only follow their
/// data (as written by streaming archivers) extract like any other.
///
/// # Errors
///
/// Returns an error if the archive is malformed or a file cannot be written.
pub async fn extract_archive<A, P>(archive: A, path: P) -> Result<()>
where
    A: AsRef<Path> + Send + Sync + Debug,
    P: AsRef<Path> + Send + Sync + Debug,
{
    debug!("extracting {archive:?} to {path:?}…");
    tokio::fs::create_dir_all(&path).await?;

    let file = tokio::fs::File::open(&archive).await?;
    let mut reader = ZipFileReader::new(BufReader::new(file).compat()).await?;
    let count = reader.file().entries().len();

    for index in 0..count {
        let Some(entry) = reader.file().entries().get(index) else {
            break;
        };
        let Ok(name) = entry.filename().as_str() else {
            debug!("skipping entry {index} of {archive:?} with a non UTF-8 name");
            continue;
        };
        let is_dir = name.ends_with('/');
        let p = path.as_ref().join(sanitize_file_path(name));

        if is_dir {
            if !p.exists() {
                tokio::fs::create_dir_all(&p).await?;
            }
            continue;
        }

        // Creates parent directories. They may not exist if iteration is out of order or the archive does not contain directory entries
        let parent = p.parent().ok_or_else(|| {
            Error::Extraction(format!("invalid archive entry {name:?} in {archive:?}"))
        })?;
        if !parent.is_dir() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut entry_reader = reader.reader_without_entry(index).await?;
        let mut writer = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&p)
            .await?
            .compat_write();
        futures::io::copy(&mut entry_reader, &mut writer).await?;
        writer.flush().await?;
    }

    debug!("extracted {count} entries from {archive:?}");
    Ok(())
}
