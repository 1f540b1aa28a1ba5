use std::{fmt::Debug, path::Path};

use tracing::{debug, info};

use crate::{
    error::Result,
    transactions::{
        LocatedFrameworks, extract_archive, extract_tarball, install_frameworks, locate_frameworks,
    },
};

/// Extracts the framework bundles of a downloaded artifact archive into `destination`.
///
/// The zip is unpacked into a private scratch directory, together with the shallowest tar archive
/// it contains, if any. The destination is cleared and filled only once at least one expected
/// bundle has been located, and the scratch directory is removed on every path out.
///
/// See: [`extract_archive`], [`extract_tarball`], [`locate_frameworks`], [`install_frameworks`]
///
/// # Errors
///
/// Returns [`crate::Error::Extraction`] if the artifact contains no expected bundle, or any
/// archive or filesystem error.
pub async fn extract_frameworks<A, P>(archive: A, destination: P) -> Result<LocatedFrameworks>
where
    A: AsRef<Path> + Send + Sync + Debug,
    P: AsRef<Path> + Send + Sync + Debug,
{
    let scratch = tempfile::tempdir()?;
    debug!("extracting {archive:?} in {:?}…", scratch.path());

    extract_archive(&archive, scratch.path()).await?;
    if let Some(tarball) = extract_tarball(scratch.path().to_path_buf()).await? {
        debug!("unpacked nested tarball {tarball:?}");
    }

    let root = scratch.path().to_path_buf();
    let target = destination.as_ref().to_path_buf();
    let located = tokio::task::spawn_blocking(move || {
        let located = locate_frameworks(&root)?;
        install_frameworks(&located, &target)?;
        Ok::<_, crate::Error>(located)
    })
    .await??;

    info!(
        "extracted {} frameworks from {archive:?} to {destination:?}",
        located.found.len()
    );
    Ok(located)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs, io::Write as _};

    use flate2::{Compression, write::GzEncoder};
    use zip::{ZipWriter, write::SimpleFileOptions};

    use crate::{error::Error, transactions::EXPECTED_FRAMEWORKS};

    fn gzipped_tarball(bundles: &[&str]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for bundle in bundles {
            for (file, data) in [
                ("Info.plist", bundle.as_bytes()),
                ("ios-arm64/lib.a", b"\x7fELF".as_slice()),
            ] {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, format!("output/{bundle}/{file}"), data)
                    .unwrap();
            }
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn artifact_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn installed(destination: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(destination)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn nested_tarball_with_all_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artifact.zip");
        let mut bundles = EXPECTED_FRAMEWORKS.to_vec();
        bundles.push("libx264.xcframework");
        artifact_zip(
            &archive,
            &[
                ("ffmpeg-xcframeworks.tar.gz", &gzipped_tarball(&bundles)),
                ("README.md", b"prebuilt frameworks"),
            ],
        );

        let destination = dir.path().join("xcframework");
        let located = extract_frameworks(&archive, &destination).await.unwrap();

        assert!(located.missing.is_empty());
        assert_eq!(installed(&destination), EXPECTED_FRAMEWORKS);
        assert_eq!(
            fs::read_to_string(destination.join("libavutil.xcframework/Info.plist")).unwrap(),
            "libavutil.xcframework"
        );
        assert!(destination.join("libswscale.xcframework/ios-arm64/lib.a").is_file());
    }

    #[tokio::test]
    async fn partial_bundles_warn() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artifact.zip");
        let bundles: Vec<&str> = EXPECTED_FRAMEWORKS
            .into_iter()
            .filter(|name| !matches!(*name, "libpostproc.xcframework" | "libavdevice.xcframework"))
            .collect();
        artifact_zip(&archive, &[("frameworks.tgz", &gzipped_tarball(&bundles))]);

        let destination = dir.path().join("xcframework");
        let located = extract_frameworks(&archive, &destination).await.unwrap();

        assert_eq!(
            located.missing,
            ["libavdevice.xcframework", "libpostproc.xcframework"]
        );
        assert_eq!(installed(&destination).len(), 6);
    }

    #[tokio::test]
    async fn bundles_directly_in_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artifact.zip");
        artifact_zip(
            &archive,
            &[
                ("libavcodec.xcframework/Info.plist", b"codec"),
                ("libavformat.xcframework/Info.plist", b"format"),
            ],
        );

        let destination = dir.path().join("xcframework");
        extract_frameworks(&archive, &destination).await.unwrap();
        assert_eq!(
            installed(&destination),
            ["libavcodec.xcframework", "libavformat.xcframework"]
        );
    }

    #[tokio::test]
    async fn no_bundles_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artifact.zip");
        artifact_zip(&archive, &[("logs/build.log", b"ok")]);

        let destination = dir.path().join("xcframework");
        let err = extract_frameworks(&archive, &destination)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(!destination.exists());

        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("previous.txt"), b"keep").unwrap();
        assert!(extract_frameworks(&archive, &destination).await.is_err());
        assert!(destination.join("previous.txt").exists());
    }

    #[tokio::test]
    async fn rerun_clobbers_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("xcframework");
        fs::create_dir_all(destination.join("libavutil.xcframework")).unwrap();
        fs::write(destination.join("libavutil.xcframework/stale.a"), b"old").unwrap();
        fs::write(destination.join("notes.txt"), b"old").unwrap();

        let archive = dir.path().join("artifact.zip");
        artifact_zip(
            &archive,
            &[("bundle.tar.gz", &gzipped_tarball(&["libavutil.xcframework"]))],
        );
        extract_frameworks(&archive, &destination).await.unwrap();

        assert_eq!(installed(&destination), ["libavutil.xcframework"]);
        assert!(!destination.join("libavutil.xcframework/stale.a").exists());
    }
}
