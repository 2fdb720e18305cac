//! Maven-style dependency resolution: version ordering, repository path
//! conventions, metadata and descriptor parsing, transitive resolution and
//! digest-verified artifact transfer.
//!
//! The entry point for most uses is [`DependencyResolver`]: construct it from
//! a [`Dependency`] (parsed from `group:artifact[:version[:classifier]][@type]`
//! notation) and an ordered list of [`Repository`] instances, then ask it for
//! versions, dependency sets or an artifact transfer.

pub mod error;
pub mod maven;
pub mod util;

pub use crate::error::ResolveError;
pub use crate::maven::dependency::{
    Dependency, DependencyScopes, DependencySet, Exclusion, Scope,
};
pub use crate::maven::repository::{Repository, RepositoryArtifact};
pub use crate::maven::resolver::DependencyResolver;
pub use crate::maven::version::VersionNumber;
