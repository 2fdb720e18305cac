#![allow(non_snake_case)]

use serde::Deserialize;

use crate::error::ResolveError;
use crate::maven::version::VersionNumber;

// Structs mirroring the maven-metadata.xml document described at
// https://maven.apache.org/ref/3.9.5/maven-repository-metadata/repository-metadata.html

#[derive(Debug, Deserialize)]
struct MetadataXml {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    versioning: Option<VersioningXml>,
}

#[derive(Debug, Deserialize, Default)]
struct VersioningXml {
    #[serde(default)]
    latest: Option<String>,
    #[serde(default)]
    release: Option<String>,
    #[serde(default)]
    versions: Option<VersionsXml>,
    #[serde(default)]
    snapshot: Option<SnapshotXml>,
}

#[derive(Debug, Deserialize, Default)]
struct VersionsXml {
    #[serde(default)]
    version: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotXml {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    buildNumber: Option<String>,
}

/// The version index of one artifact in one repository, after the corrective
/// passes: `latest` reflects the highest stable version where the document
/// lists any, and `snapshot` is the synthesized timestamp/build-number
/// version usable in artifact file names.
///
/// Produced once per resolution and cached on the resolver; never persisted.
#[derive(Debug, Clone)]
pub struct MavenMetadata {
    pub latest: VersionNumber,
    pub release: VersionNumber,
    pub versions: Vec<VersionNumber>,
    pub snapshot: Option<VersionNumber>,
}

impl MavenMetadata {
    /// Parses a metadata document. Structural problems are accumulated and
    /// reported together rather than one at a time.
    pub fn parse(document: &str, location: &str) -> Result<MavenMetadata, ResolveError> {
        let xml: MetadataXml = serde_xml_rs::from_str(document)
            .map_err(|e| ResolveError::parse(location, vec![e.to_string()]))?;

        let mut problems = Vec::new();
        let versioning = xml.versioning.unwrap_or_default();

        // collection order matters: a top-level <version> element comes before
        // the <versions> list and is the basis for snapshot synthesis
        let mut versions = Vec::new();
        if let Some(version) = &xml.version {
            versions.push(VersionNumber::parse(version));
        }
        if let Some(listed) = &versioning.versions {
            versions.extend(listed.version.iter().map(|v| VersionNumber::parse(v)));
        }

        let mut latest = versioning
            .latest
            .as_deref()
            .map_or(VersionNumber::UNKNOWN, VersionNumber::parse);
        let release = versioning
            .release
            .as_deref()
            .map_or(VersionNumber::UNKNOWN, VersionNumber::parse);

        let snapshot = match &versioning.snapshot {
            Some(snapshot) => {
                Self::synthesize_snapshot(snapshot, versions.first(), &mut problems)
            }
            None => None,
        };

        // The document's own `latest` is untrusted: overwrite it with the
        // highest stable version whenever the list contains any.
        let stable_max = versions
            .iter()
            .filter(|v| **v != VersionNumber::UNKNOWN && !v.is_pre_release() && !v.is_snapshot())
            .max();
        if let Some(stable_max) = stable_max {
            latest = stable_max.clone();
        }

        if !problems.is_empty() {
            return Err(ResolveError::parse(location, problems));
        }

        Ok(MavenMetadata {
            latest,
            release,
            versions,
            snapshot,
        })
    }

    /// Combines timestamp and build number with the first collected version
    /// into the effective snapshot version,
    /// `major[.minor[.revision]]-timestamp-buildNumber`.
    fn synthesize_snapshot(
        snapshot: &SnapshotXml,
        base: Option<&VersionNumber>,
        problems: &mut Vec<String>,
    ) -> Option<VersionNumber> {
        let build_number = match &snapshot.buildNumber {
            Some(text) => match text.parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    problems.push(format!("invalid buildNumber: {:?}", text));
                    None
                }
            },
            None => None,
        };

        let base = match base {
            Some(base) => base,
            None => {
                problems.push("snapshot element without a version to resolve against".to_string());
                return None;
            }
        };

        match (&snapshot.timestamp, build_number) {
            (Some(timestamp), Some(build_number)) => Some(VersionNumber {
                major: base.major,
                minor: base.minor,
                revision: base.revision,
                qualifier: Some(format!("{}-{}", timestamp, build_number)),
            }),
            _ => None,
        }
    }
}
