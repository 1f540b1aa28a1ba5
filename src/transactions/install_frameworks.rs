use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// The directory suffix of a framework bundle.
pub const FRAMEWORK_SUFFIX: &str = ".xcframework";

/// The framework bundles the artifact is expected to carry.
pub const EXPECTED_FRAMEWORKS: [&str; 8] = [
    "libavcodec.xcframework",
    "libavdevice.xcframework",
    "libavfilter.xcframework",
    "libavformat.xcframework",
    "libavutil.xcframework",
    "libpostproc.xcframework",
    "libswresample.xcframework",
    "libswscale.xcframework",
];

/// Framework bundles found in an extracted artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedFrameworks {
    /// The found bundles by directory name.
    pub found: BTreeMap<String, PathBuf>,
    /// Expected bundle names that were not found, sorted.
    pub missing: Vec<String>,
}

impl LocatedFrameworks {
    /// Returns `true` if no expected bundle was found.
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Returns the advisory listing the missing bundle names, if any are missing.
    pub fn missing_warning(&self) -> Option<String> {
        (!self.missing.is_empty()).then(|| {
            format!(
                "Warning: missing expected frameworks from artifact: {}",
                self.missing.join(", ")
            )
        })
    }
}

fn is_expected_framework(name: &str) -> bool {
    name.ends_with(FRAMEWORK_SUFFIX)
        && EXPECTED_FRAMEWORKS
            .iter()
            .any(|expected| *expected == name)
}

/// Searches `root` recursively for expected framework bundle directories.
///
/// Unknown bundle names are ignored. When a name occurs more than once, the copy with the fewest
/// path components wins. Missing names are reported in [`LocatedFrameworks::missing`] and never
/// fail the search.
///
/// # Errors
///
/// Returns an error if `root` cannot be walked.
pub fn locate_frameworks<P>(root: P) -> Result<LocatedFrameworks>
where
    P: AsRef<Path>,
{
    let mut found: BTreeMap<String, (usize, PathBuf)> = BTreeMap::new();
    let mut entries = WalkDir::new(root).sort_by_file_name().into_iter();

    while let Some(entry) = entries.next() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_expected_framework(name) {
            continue;
        }

        let depth = entry.depth();
        match found.get(name) {
            Some((min, _)) if *min <= depth => {}
            _ => {
                debug!("found {name} at {:?}", entry.path());
                found.insert(name.to_owned(), (depth, entry.path().to_path_buf()));
            }
        }
        entries.skip_current_dir();
    }

    let mut missing: Vec<String> = EXPECTED_FRAMEWORKS
        .iter()
        .filter(|name| !found.contains_key(**name))
        .map(|name| (*name).to_owned())
        .collect();
    missing.sort_unstable();
    debug!("missing expected frameworks: {missing:?}");

    Ok(LocatedFrameworks {
        found: found
            .into_iter()
            .map(|(name, (_, path))| (name, path))
            .collect(),
        missing,
    })
}

/// Returns `true` if every expected framework bundle already exists under `destination`.
pub fn frameworks_exist<P>(destination: P) -> bool
where
    P: AsRef<Path>,
{
    EXPECTED_FRAMEWORKS
        .iter()
        .all(|name| destination.as_ref().join(name).is_dir())
}

/// Copies a directory tree, recreating symbolic links instead of following them.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_tree<F, T>(from: F, to: T) -> Result<()>
where
    F: AsRef<Path>,
    T: AsRef<Path>,
{
    let from = from.as_ref();
    let to = to.as_ref();

    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| Error::Extraction(format!("failed to copy {:?}: {e}", entry.path())))?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    fs::copy(link, target)?;
    Ok(())
}

/// Replaces the contents of `destination` with copies of the located bundles.
///
/// The destination is removed first when it exists, so nothing from an earlier run survives.
///
/// # Errors
///
/// Returns [`Error::Extraction`] without touching the destination if no bundle was located, or
/// any filesystem error.
pub fn install_frameworks<P>(frameworks: &LocatedFrameworks, destination: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let destination = destination.as_ref();
    if frameworks.is_empty() {
        return Err(Error::Extraction(String::from(
            "No .xcframework directories were found in the downloaded artifact.",
        )));
    }

    if destination.exists() {
        debug!("removing previous contents of {destination:?}…");
        fs::remove_dir_all(destination)?;
    }
    fs::create_dir_all(destination)?;

    for (name, path) in &frameworks.found {
        copy_tree(path, destination.join(name))?;
        info!("installed {name} to {destination:?}");
    }
    Ok(())
}
