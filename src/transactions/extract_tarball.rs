use std::{
    fs::File,
    io::{BufReader, Read as _, Seek as _, SeekFrom},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Result;

const TARBALL_SUFFIXES: [&str; 3] = [".tar", ".tar.gz", ".tgz"];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn is_tarball(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            TARBALL_SUFFIXES
                .iter()
                .any(|suffix| name.ends_with(suffix))
        })
}

/// Finds the tar archive with the fewest path components under `root`, if any.
///
/// # Errors
///
/// Returns an error if `root` cannot be walked.
pub fn find_tarball<P>(root: P) -> Result<Option<PathBuf>>
where
    P: AsRef<Path>,
{
    let mut shallowest: Option<(usize, PathBuf)> = None;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_tarball(entry.path()) {
            continue;
        }
        let depth = entry.path().components().count();
        if shallowest.as_ref().is_none_or(|(min, _)| depth < *min) {
            shallowest = Some((depth, entry.into_path()));
        }
    }
    Ok(shallowest.map(|(_, path)| path))
}

/// Unpacks a plain or gzip-compressed tar archive into `into`, detecting compression from its
/// leading bytes.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or unpacked.
pub fn unpack_tarball<A, P>(tarball: A, into: P) -> Result<()>
where
    A: AsRef<Path>,
    P: AsRef<Path>,
{
    let mut file = File::open(&tarball)?;
    let mut magic = [0u8; 2];
    let gzipped = file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0))?;

    let reader = BufReader::new(file);
    if gzipped {
        Archive::new(GzDecoder::new(reader)).unpack(&into)?;
    } else {
        Archive::new(reader).unpack(&into)?;
    }
    Ok(())
}

/// Unpacks the shallowest tar archive found under `root` back into `root`.
///
/// Returns the unpacked archive, or [`None`] if there was nothing to unpack.
///
/// # Errors
///
/// Returns an error if walking `root` or unpacking the archive fails.
pub async fn extract_tarball(root: PathBuf) -> Result<Option<PathBuf>> {
    tokio::task::spawn_blocking(move || {
        let Some(tarball) = find_tarball(&root)? else {
            debug!("no nested tarball under {root:?}");
            return Ok(None);
        };
        info!("unpacking nested tarball {tarball:?}…");
        unpack_tarball(&tarball, &root)?;
        Ok(Some(tarball))
    })
    .await?
}
