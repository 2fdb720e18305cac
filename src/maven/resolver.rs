use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_recursion::async_recursion;
use tracing::debug;

use crate::error::ResolveError;
use crate::maven::dependency::{Dependency, DependencySet, Exclusion, Scope};
use crate::maven::metadata::MavenMetadata;
use crate::maven::pom::{PomDependency, PomDocument};
use crate::maven::repository::{Repository, RepositoryArtifact};
use crate::maven::transfer;
use crate::maven::version::VersionNumber;
use crate::util::downloader::HttpDownloader;

// parent descriptor chains are short in practice; the bound guards against
// self-referential descriptors
const MAX_PARENT_DEPTH: usize = 16;

/// The orchestration core: resolves a declared dependency against an ordered
/// repository list - concrete version, existence, direct and transitive
/// dependency sets, artifact locations and transfer.
///
/// Repositories are always tried in the given order; absence falls through to
/// the next repository, any other retrieval fault aborts immediately.
///
/// A resolver instance caches the two metadata documents it fetches for its
/// lifetime and never invalidates them - construct a new resolver for fresh
/// data. All I/O is sequential; use one instance per task.
pub struct DependencyResolver {
    dependency: Dependency,
    repositories: Vec<Repository>,
    downloader: HttpDownloader,
    metadata: Option<MavenMetadata>,
    snapshot_metadata: Option<MavenMetadata>,
}

impl DependencyResolver {
    pub fn new(dependency: Dependency, repositories: Vec<Repository>) -> DependencyResolver {
        DependencyResolver {
            dependency,
            repositories,
            downloader: HttpDownloader::new(),
            metadata: None,
            snapshot_metadata: None,
        }
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// A resolver for another dependency against the same repositories,
    /// sharing the HTTP connection pool.
    fn child_resolver(&self, dependency: Dependency) -> DependencyResolver {
        DependencyResolver {
            dependency,
            repositories: self.repositories.clone(),
            downloader: self.downloader.clone(),
            metadata: None,
            snapshot_metadata: None,
        }
    }

    fn metadata_locations(&self) -> Vec<RepositoryArtifact> {
        self.repositories
            .iter()
            .map(|r| {
                r.artifact_location(&self.dependency)
                    .append_path(&format!("/{}", r.metadata_name()))
            })
            .collect()
    }

    /// Fetches the first of the candidate locations that exists. Absence moves
    /// on to the next candidate; anything else is fatal. When every location
    /// reports absence the result names all of them.
    async fn fetch_first(
        &self,
        locations: &[RepositoryArtifact],
    ) -> Result<(RepositoryArtifact, String), ResolveError> {
        let mut attempted = Vec::new();
        for artifact in locations {
            match artifact.fetch_text(&self.downloader).await {
                Ok(text) => return Ok((artifact.clone(), text)),
                Err(e) if e.is_not_found() => attempted.push(artifact.location.clone()),
                Err(e) => return Err(e),
            }
        }
        Err(ResolveError::NotFound {
            locations: attempted,
        })
    }

    /// The artifact's version index, fetched once and cached for the
    /// resolver's lifetime.
    pub async fn maven_metadata(&mut self) -> Result<MavenMetadata, ResolveError> {
        if let Some(metadata) = &self.metadata {
            return Ok(metadata.clone());
        }
        let (artifact, text) = self.fetch_first(&self.metadata_locations()).await?;
        let metadata = MavenMetadata::parse(&text, &artifact.location)?;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    /// The per-version metadata of a snapshot, resolving the timestamped build
    /// to substitute into artifact file names. Cached like
    /// [`DependencyResolver::maven_metadata`].
    ///
    /// The lookup uses the resolved version, which differs from the declared
    /// one when the snapshot was picked up as `latest`.
    pub async fn snapshot_maven_metadata(&mut self) -> Result<MavenMetadata, ResolveError> {
        if let Some(metadata) = &self.snapshot_metadata {
            return Ok(metadata.clone());
        }
        let version = self.resolve_version().await?;
        let locations: Vec<RepositoryArtifact> = self
            .repositories
            .iter()
            .map(|r| {
                r.artifact_location(&self.dependency)
                    .append_path(&format!("/{}", version))
                    .append_path(&format!("/{}", r.metadata_name()))
            })
            .collect();
        let (artifact, text) = self.fetch_first(&locations).await?;
        let metadata = MavenMetadata::parse(&text, &artifact.location)?;
        self.snapshot_metadata = Some(metadata.clone());
        Ok(metadata)
    }

    /// Probes whether the artifact (and, when one was declared, the specific
    /// version) is known to any repository. This is the one operation that
    /// downgrades absence and retrieval failures to `false` - a probe must not
    /// abort the caller. A malformed metadata document still propagates: the
    /// artifact's index exists, it just cannot be read.
    pub async fn exists(&mut self) -> Result<bool, ResolveError> {
        match self.maven_metadata().await {
            Ok(metadata) => {
                if self.dependency.version == VersionNumber::UNKNOWN {
                    Ok(true)
                } else {
                    Ok(metadata.versions.contains(&self.dependency.version))
                }
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(ResolveError::Retrieval { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The concrete version to resolve against: the declared version verbatim
    /// when present, otherwise the metadata's (corrected) `latest`. Missing
    /// data yields `UNKNOWN`, never an error; real retrieval faults still
    /// propagate.
    pub async fn resolve_version(&mut self) -> Result<VersionNumber, ResolveError> {
        if self.dependency.version != VersionNumber::UNKNOWN {
            return Ok(self.dependency.version.clone());
        }
        match self.maven_metadata().await {
            Ok(metadata) => Ok(metadata.latest),
            Err(e) if e.is_not_found() => Ok(VersionNumber::UNKNOWN),
            Err(e) => Err(e),
        }
    }

    pub async fn list_versions(&mut self) -> Result<Vec<VersionNumber>, ResolveError> {
        Ok(self.maven_metadata().await?.versions)
    }

    pub async fn latest_version(&mut self) -> Result<VersionNumber, ResolveError> {
        Ok(self.maven_metadata().await?.latest)
    }

    pub async fn release_version(&mut self) -> Result<VersionNumber, ResolveError> {
        Ok(self.maven_metadata().await?.release)
    }

    /// Fetches and parses the descriptor for `dependency` at `version`,
    /// followed by its ancestor descriptors for inherited property context.
    /// The chain is returned nearest-first. A missing ancestor only loses
    /// inherited context and is tolerated.
    #[async_recursion]
    async fn fetch_pom_chain(
        &self,
        dependency: &Dependency,
        version: &VersionNumber,
        depth: usize,
    ) -> Result<Vec<PomDocument>, ResolveError> {
        let file_name = format!("{}-{}.pom", dependency.artifact_id, version);
        let locations: Vec<RepositoryArtifact> = self
            .repositories
            .iter()
            .map(|r| {
                r.artifact_location(dependency)
                    .append_path(&format!("/{}", version))
                    .append_path(&format!("/{}", file_name))
            })
            .collect();
        let (artifact, text) = self.fetch_first(&locations).await?;
        let document = PomDocument::parse(&text, &artifact.location)?;

        let mut chain = vec![document];
        if let Some(parent) = chain[0].parent.clone() {
            if depth < MAX_PARENT_DEPTH {
                let parent_version = VersionNumber::parse(&parent.version);
                let parent_dependency = Dependency::new(
                    parent.group_id,
                    parent.artifact_id,
                    VersionNumber::UNKNOWN,
                );
                match self
                    .fetch_pom_chain(&parent_dependency, &parent_version, depth + 1)
                    .await
                {
                    Ok(ancestors) => chain.extend(ancestors),
                    Err(e) if e.is_not_found() => {
                        debug!("parent descriptor not available: {}", e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(chain)
    }

    async fn direct_pom_dependencies(
        &mut self,
        scopes: &[Scope],
    ) -> Result<Vec<PomDependency>, ResolveError> {
        let version = self.resolve_version().await?;
        if version == VersionNumber::UNKNOWN {
            return Err(ResolveError::NotFound {
                locations: self
                    .metadata_locations()
                    .into_iter()
                    .map(|a| a.location)
                    .collect(),
            });
        }
        let chain = self.fetch_pom_chain(&self.dependency, &version, 0).await?;
        Ok(match chain.split_first() {
            Some((document, ancestors)) => document.get_dependencies(scopes, ancestors),
            None => Vec::new(),
        })
    }

    /// The dependency's immediate descriptor children for the requested
    /// scopes, as full dependencies.
    pub async fn direct_dependencies(
        &mut self,
        scopes: &[Scope],
    ) -> Result<DependencySet, ResolveError> {
        let mut result = DependencySet::new();
        for child in self.direct_pom_dependencies(scopes).await? {
            result.add(child.to_dependency());
        }
        Ok(result)
    }

    /// The transitive closure for the requested scopes: breadth-first over a
    /// work queue, so the shallowest occurrence of an artifact identity wins;
    /// exclusions apply along the chain that introduced a candidate, and the
    /// seed dependency's own exclusions apply globally. Every resolved
    /// identity enters the result before its children are queued, which also
    /// terminates cycles through mutually dependent packages.
    pub async fn all_dependencies(
        &mut self,
        scopes: &[Scope],
    ) -> Result<DependencySet, ResolveError> {
        let mut result = DependencySet::new();
        result.add(self.dependency.clone());

        let seed_exclusions = self.dependency.exclusions.clone();
        let mut queue: VecDeque<Arc<PomDependency>> = VecDeque::new();

        let children = self.direct_pom_dependencies(scopes).await?;
        Self::enqueue_children(&mut queue, children, None, &seed_exclusions);

        while let Some(candidate) = queue.pop_front() {
            let dependency = candidate.to_dependency();
            if !result.add(dependency.clone()) {
                // an earlier (shallower) version of this identity already won
                continue;
            }

            let mut resolver = self.child_resolver(dependency);
            let children = resolver.direct_pom_dependencies(scopes).await?;
            Self::enqueue_children(&mut queue, children, Some(&candidate), &seed_exclusions);
        }

        Ok(result)
    }

    fn enqueue_children(
        queue: &mut VecDeque<Arc<PomDependency>>,
        children: Vec<PomDependency>,
        parent: Option<&Arc<PomDependency>>,
        seed_exclusions: &[Exclusion],
    ) {
        for mut child in children {
            child.parent = parent.cloned();
            if queue.iter().any(|queued| queued.same_artifact(&child)) {
                continue;
            }
            if child.excluded_by(seed_exclusions) {
                continue;
            }
            queue.push_back(Arc::new(child));
        }
    }

    /// Every location that a transfer would try, in priority order, without
    /// performing the transfer. Snapshot versions substitute the
    /// snapshot-resolved version string into the file name while the version
    /// directory keeps the declared version.
    pub async fn transfer_locations(&mut self) -> Result<Vec<RepositoryArtifact>, ResolveError> {
        let version = self.resolve_version().await?;
        if version == VersionNumber::UNKNOWN {
            return Err(ResolveError::NotFound {
                locations: self
                    .metadata_locations()
                    .into_iter()
                    .map(|a| a.location)
                    .collect(),
            });
        }

        let file_version = if version.is_snapshot() {
            match self.snapshot_maven_metadata().await {
                Ok(metadata) => metadata.snapshot.unwrap_or_else(|| version.clone()),
                // a snapshot without build metadata keeps its declared name
                Err(e) if e.is_not_found() => version.clone(),
                Err(e) => return Err(e),
            }
        } else {
            version.clone()
        };

        let file_name = self.dependency.file_name(&file_version);
        Ok(self
            .repositories
            .iter()
            .map(|r| {
                r.artifact_location(&self.dependency)
                    .append_path(&format!("/{}", version))
                    .append_path(&format!("/{}", file_name))
            })
            .collect())
    }

    /// Transfers the artifact into `directory`, creating it as needed. The
    /// destination file is named after the declared version, so repeated
    /// resolutions land on the same path.
    pub async fn transfer_into_directory(
        &mut self,
        directory: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let locations = self.transfer_locations().await?;
        let version = self.resolve_version().await?;

        tokio::fs::create_dir_all(directory).await.map_err(|e| {
            ResolveError::transfer(
                self.dependency.to_string(),
                locations
                    .first()
                    .map(|a| a.location.clone())
                    .unwrap_or_default(),
                directory,
                e,
            )
        })?;

        let destination = directory.join(self.dependency.file_name(&version));
        transfer::transfer_artifact(&self.downloader, &self.dependency, &locations, &destination)
            .await
    }
}
