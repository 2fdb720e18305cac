use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::ResolveError;
use crate::maven::dependency::Dependency;
use crate::util::downloader::HttpDownloader;

/// An addressable source of artifacts: a remote HTTP repository, optionally
/// credentialed, or a plain filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Repository {
    pub fn new(url: impl Into<String>) -> Repository {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        Repository {
            url,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Repository {
        Repository {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Repository::new(url)
        }
    }

    /// True when the URL denotes a filesystem path rather than a remote
    /// server. Local repositories bypass the network entirely.
    pub fn is_local(&self) -> bool {
        self.url.starts_with("file:") || !self.url.contains("://")
    }

    /// Basic-auth credentials, only for remote repositories with both a
    /// username and a password configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.is_local() {
            return None;
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }

    pub fn metadata_name(&self) -> &'static str {
        "maven-metadata.xml"
    }

    /// The artifact's base location in this repository:
    /// `<base>/<group-with-slashes>/<artifactId>`. Version directories and
    /// file names are appended by the caller, so the same base serves
    /// metadata, descriptor and binary lookups.
    pub fn artifact_location(&self, dependency: &Dependency) -> RepositoryArtifact {
        let location = format!(
            "{}{}/{}",
            self.url,
            dependency.group_id.replace('.', "/"),
            dependency.artifact_id,
        );
        RepositoryArtifact {
            repository: self.clone(),
            location,
        }
    }
}

/// A fully qualified location inside one repository, carrying the owning
/// repository for local-ness and credential decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryArtifact {
    pub repository: Repository,
    pub location: String,
}

impl RepositoryArtifact {
    /// Derives a sibling or child location by plain concatenation - callers
    /// pass `"/subdir"` style suffixes for children and `".sha256"` style
    /// suffixes for side-car files.
    pub fn append_path(&self, suffix: &str) -> RepositoryArtifact {
        RepositoryArtifact {
            repository: self.repository.clone(),
            location: format!("{}{}", self.location, suffix),
        }
    }

    /// The filesystem path for local repository locations.
    pub fn local_path(&self) -> PathBuf {
        let path = self
            .location
            .strip_prefix("file://")
            .or_else(|| self.location.strip_prefix("file:"))
            .unwrap_or(&self.location);
        PathBuf::from(path)
    }

    /// Fetches this location as text, transparently going through the
    /// filesystem for local repositories and HTTP for remote ones. Absence is
    /// reported as [`ResolveError::NotFound`] so callers can fall through to
    /// the next repository.
    pub async fn fetch_text(&self, downloader: &HttpDownloader) -> Result<String, ResolveError> {
        if self.repository.is_local() {
            match tokio::fs::read_to_string(self.local_path()).await {
                Ok(text) => Ok(text),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    Err(ResolveError::not_found(&self.location))
                }
                Err(e) => Err(ResolveError::retrieval(&self.location, e)),
            }
        } else {
            downloader
                .get_text(&self.location, self.repository.credentials())
                .await
        }
    }
}

impl std::fmt::Display for RepositoryArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.location)
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::file_url("file:///home/user/.m2/repository", true)]
    #[case::plain_path("/home/user/.m2/repository", true)]
    #[case::relative_path("build/repo", true)]
    #[case::https("https://repo1.maven.org/maven2", false)]
    #[case::http("http://nexus.example.com/releases", false)]
    fn test_is_local(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(Repository::new(url).is_local(), expected);
    }

    #[test]
    fn test_artifact_location() {
        let repository = Repository::new("https://repo1.maven.org/maven2");
        let dependency = Dependency::parse("org.example.lib:thing:1.0").unwrap();
        let artifact = repository.artifact_location(&dependency);
        assert_eq!(
            artifact.location,
            "https://repo1.maven.org/maven2/org/example/lib/thing"
        );
    }

    #[test]
    fn test_append_path_concatenates() {
        let repository = Repository::new("https://repo.example.com");
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();
        let base = repository.artifact_location(&dependency);

        let metadata = base.append_path("/maven-metadata.xml");
        assert_eq!(
            metadata.location,
            "https://repo.example.com/org/example/thing/maven-metadata.xml"
        );

        let side_car = base.append_path("/1.0/thing-1.0.jar").append_path(".sha256");
        assert_eq!(
            side_car.location,
            "https://repo.example.com/org/example/thing/1.0/thing-1.0.jar.sha256"
        );
    }

    #[test]
    fn test_local_path_strips_file_scheme() {
        let repository = Repository::new("file:///repo");
        let dependency = Dependency::parse("org.example:thing:1.0").unwrap();
        let artifact = repository.artifact_location(&dependency);
        assert_eq!(
            artifact.local_path(),
            PathBuf::from("/repo/org/example/thing")
        );
    }

    #[test]
    fn test_credentials_never_for_local_repositories() {
        let remote = Repository::with_credentials("https://repo.example.com", "user", "secret");
        assert_eq!(remote.credentials(), Some(("user", "secret")));

        let local = Repository::with_credentials("/some/path", "user", "secret");
        assert_eq!(local.credentials(), None);

        let without_password = Repository {
            password: None,
            ..remote
        };
        assert_eq!(without_password.credentials(), None);
    }
}
