use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::{remove_file, try_exists, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::error::ResolveError;
use crate::maven::dependency::Dependency;
use crate::maven::repository::RepositoryArtifact;
use crate::util::checksum::{self, DigestKind};
use crate::util::downloader::HttpDownloader;

/// Transfers one artifact to `destination`, trying each candidate location in
/// the caller-supplied priority order and stopping at the first success.
///
/// A pre-existing destination file is trusted only when a side-car digest can
/// be fetched for the current location and matches the bytes on disk;
/// otherwise the artifact is transferred again. Progress is reported one line
/// per location, then the outcome (done / exists / not found).
pub async fn transfer_artifact(
    downloader: &HttpDownloader,
    dependency: &Dependency,
    locations: &[RepositoryArtifact],
    destination: &Path,
) -> Result<PathBuf, ResolveError> {
    let mut attempted = Vec::new();
    for artifact in locations {
        info!("{}", artifact.location);

        if already_present(downloader, dependency, artifact, destination).await? {
            info!("exists");
            return Ok(destination.to_path_buf());
        }

        match transfer_one(downloader, dependency, artifact, destination).await {
            Ok(()) => {
                info!("done");
                return Ok(destination.to_path_buf());
            }
            Err(e) if e.is_not_found() => {
                info!("not found");
                attempted.push(artifact.location.clone());
            }
            Err(e) => return Err(e),
        }
    }
    Err(ResolveError::NotFound {
        locations: attempted,
    })
}

/// The side-car digest for an artifact location, checked in preference order
/// (SHA-256 before MD5). Absent or unreadable side-cars yield `None`; real
/// retrieval faults propagate.
async fn expected_digest(
    downloader: &HttpDownloader,
    artifact: &RepositoryArtifact,
) -> Result<Option<(DigestKind, Vec<u8>)>, ResolveError> {
    for kind in DigestKind::PREFERENCE_ORDER {
        let side_car = artifact.append_path(kind.side_car_suffix());
        match side_car.fetch_text(downloader).await {
            Ok(text) => {
                if let Some(digest) = checksum::parse_side_car(&text) {
                    return Ok(Some((kind, digest)));
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

async fn already_present(
    downloader: &HttpDownloader,
    dependency: &Dependency,
    artifact: &RepositoryArtifact,
    destination: &Path,
) -> Result<bool, ResolveError> {
    if !try_exists(destination).await.unwrap_or(false) {
        return Ok(false);
    }
    let (kind, expected) = match expected_digest(downloader, artifact).await? {
        Some(expected) => expected,
        // without a side-car the local bytes cannot be trusted
        None => return Ok(false),
    };
    let actual = checksum::hash_file(destination, kind).await.map_err(|e| {
        ResolveError::transfer(dependency.to_string(), &artifact.location, destination, e)
    })?;
    Ok(actual == expected)
}

async fn transfer_one(
    downloader: &HttpDownloader,
    dependency: &Dependency,
    artifact: &RepositoryArtifact,
    destination: &Path,
) -> Result<(), ResolveError> {
    if artifact.repository.is_local() {
        copy_local(dependency, artifact, destination).await
    } else {
        download(downloader, dependency, artifact, destination).await
    }
}

async fn copy_local(
    dependency: &Dependency,
    artifact: &RepositoryArtifact,
    destination: &Path,
) -> Result<(), ResolveError> {
    match tokio::fs::copy(artifact.local_path(), destination).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ResolveError::not_found(&artifact.location))
        }
        Err(e) => {
            clean_up_partial(destination).await;
            Err(ResolveError::transfer(
                dependency.to_string(),
                &artifact.location,
                destination,
                e,
            ))
        }
    }
}

async fn download(
    downloader: &HttpDownloader,
    dependency: &Dependency,
    artifact: &RepositoryArtifact,
    destination: &Path,
) -> Result<(), ResolveError> {
    let expected = expected_digest(downloader, artifact).await?;
    let mut stream = downloader
        .get_stream(
            &artifact.location,
            artifact.repository.credentials(),
            expected,
        )
        .await?;

    let transfer_error = |e: std::io::Error| {
        ResolveError::transfer(dependency.to_string(), &artifact.location, destination, e)
    };

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(destination)
        .await
        .map_err(transfer_error)?;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                clean_up_partial(destination).await;
                return Err(transfer_error(e));
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            clean_up_partial(destination).await;
            return Err(transfer_error(e));
        }
    }
    file.flush().await.map_err(transfer_error)?;
    Ok(())
}

/// A partial file left behind by a failed transfer would make a later
/// side-car check misjudge it as already present.
async fn clean_up_partial(destination: &Path) {
    match remove_file(destination).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            error!(
                "error cleaning up partial file {} after failed transfer: {}",
                destination.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use crate::maven::repository::Repository;
    use crate::util::checksum::Hasher;

    use super::*;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sha256_hex(content: &[u8]) -> String {
        let mut hasher = Hasher::new(DigestKind::Sha256);
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    fn jar_location(repository: &Repository, dependency: &Dependency) -> RepositoryArtifact {
        repository
            .artifact_location(dependency)
            .append_path("/1.0/thing-1.0.jar")
    }

    #[tokio::test]
    async fn test_local_copy() {
        let repo_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(repo_dir.path().to_str().unwrap());
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();

        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar"),
            b"jar bytes",
        );

        let destination = dest_dir.path().join("thing-1.0.jar");
        let result = transfer_artifact(
            &HttpDownloader::new(),
            &dependency,
            &[jar_location(&repository, &dependency)],
            &destination,
        )
        .await
        .unwrap();

        assert_eq!(result, destination);
        assert_eq!(fs::read(&destination).unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn test_matching_side_car_skips_transfer() {
        let repo_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(repo_dir.path().to_str().unwrap());
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();

        // repository content deliberately differs from the local copy so a
        // (wrong) re-download would be visible
        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar"),
            b"repository bytes",
        );
        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar.sha256"),
            sha256_hex(b"local bytes").as_bytes(),
        );

        let destination = dest_dir.path().join("thing-1.0.jar");
        fs::write(&destination, b"local bytes").unwrap();

        transfer_artifact(
            &HttpDownloader::new(),
            &dependency,
            &[jar_location(&repository, &dependency)],
            &destination,
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&destination).unwrap(), b"local bytes");
    }

    #[tokio::test]
    async fn test_missing_side_car_forces_transfer() {
        let repo_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(repo_dir.path().to_str().unwrap());
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();

        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar"),
            b"repository bytes",
        );

        let destination = dest_dir.path().join("thing-1.0.jar");
        fs::write(&destination, b"stale bytes").unwrap();

        transfer_artifact(
            &HttpDownloader::new(),
            &dependency,
            &[jar_location(&repository, &dependency)],
            &destination,
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&destination).unwrap(), b"repository bytes");
    }

    #[tokio::test]
    async fn test_mismatched_side_car_forces_transfer() {
        let repo_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(repo_dir.path().to_str().unwrap());
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();

        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar"),
            b"repository bytes",
        );
        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar.sha256"),
            sha256_hex(b"repository bytes").as_bytes(),
        );

        let destination = dest_dir.path().join("thing-1.0.jar");
        fs::write(&destination, b"corrupted bytes").unwrap();

        transfer_artifact(
            &HttpDownloader::new(),
            &dependency,
            &[jar_location(&repository, &dependency)],
            &destination,
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&destination).unwrap(), b"repository bytes");
    }

    #[tokio::test]
    async fn test_fallback_to_second_repository() {
        let empty_dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let first = Repository::new(empty_dir.path().to_str().unwrap());
        let second = Repository::new(repo_dir.path().to_str().unwrap());
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();

        write(
            &repo_dir.path().join("org/example/thing/1.0/thing-1.0.jar"),
            b"jar bytes",
        );

        let destination = dest_dir.path().join("thing-1.0.jar");
        transfer_artifact(
            &HttpDownloader::new(),
            &dependency,
            &[
                jar_location(&first, &dependency),
                jar_location(&second, &dependency),
            ],
            &destination,
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&destination).unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn test_exhausted_repositories_report_all_locations() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let first = Repository::new(first_dir.path().to_str().unwrap());
        let second = Repository::new(second_dir.path().to_str().unwrap());
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();

        let error = transfer_artifact(
            &HttpDownloader::new(),
            &dependency,
            &[
                jar_location(&first, &dependency),
                jar_location(&second, &dependency),
            ],
            &dest_dir.path().join("thing-1.0.jar"),
        )
        .await
        .unwrap_err();

        match error {
            ResolveError::NotFound { locations } => assert_eq!(locations.len(), 2),
            other => panic!("expected not-found, got {:?}", other),
        }
    }
}
