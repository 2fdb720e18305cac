use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of the resolver. The split matters for repository fallback:
/// `NotFound` means "keep trying the remaining repositories", everything else
/// aborts the operation immediately.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not found at any of: {}", locations.join(", "))]
    NotFound { locations: Vec<String> },

    #[error("retrieval from {location} failed: {source}")]
    Retrieval {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to parse document at {location}: {}", problems.join("; "))]
    Parse {
        location: String,
        problems: Vec<String>,
    },

    #[error("transfer of {dependency} from {location} to {} failed: {source}", destination.display())]
    Transfer {
        dependency: String,
        location: String,
        destination: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ResolveError {
    pub fn not_found(location: impl Into<String>) -> ResolveError {
        ResolveError::NotFound {
            locations: vec![location.into()],
        }
    }

    pub fn retrieval(
        location: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> ResolveError {
        ResolveError::Retrieval {
            location: location.into(),
            source: source.into(),
        }
    }

    pub fn parse(location: impl Into<String>, problems: Vec<String>) -> ResolveError {
        ResolveError::Parse {
            location: location.into(),
            problems,
        }
    }

    pub fn transfer(
        dependency: impl Into<String>,
        location: impl Into<String>,
        destination: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> ResolveError {
        ResolveError::Transfer {
            dependency: dependency.into(),
            location: location.into(),
            destination: destination.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}
