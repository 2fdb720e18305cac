#![allow(non_snake_case)]

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::ResolveError;
use crate::maven::dependency::{Dependency, Exclusion, Scope};
use crate::maven::version::VersionNumber;

lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

#[derive(Debug, Deserialize)]
struct ProjectXml {
    #[serde(default)]
    groupId: Option<String>,
    #[serde(default)]
    artifactId: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    parent: Option<ParentXml>,
    #[serde(default)]
    properties: Option<HashMap<String, String>>,
    #[serde(default)]
    dependencies: Option<DependenciesXml>,
}

#[derive(Debug, Deserialize)]
struct ParentXml {
    #[serde(default)]
    groupId: Option<String>,
    #[serde(default)]
    artifactId: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DependenciesXml {
    #[serde(default)]
    dependency: Vec<DependencyXml>,
}

#[derive(Debug, Deserialize)]
struct DependencyXml {
    #[serde(default)]
    groupId: Option<String>,
    #[serde(default)]
    artifactId: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    optional: Option<String>,
    #[serde(default)]
    exclusions: Option<ExclusionsXml>,
}

#[derive(Debug, Deserialize, Default)]
struct ExclusionsXml {
    #[serde(default)]
    exclusion: Vec<ExclusionXml>,
}

#[derive(Debug, Deserialize)]
struct ExclusionXml {
    #[serde(default)]
    groupId: Option<String>,
    #[serde(default)]
    artifactId: Option<String>,
}

/// Coordinates of a descriptor's parent descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

#[derive(Debug, Clone)]
struct RawDependency {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    classifier: Option<String>,
    artifact_type: Option<String>,
    scope: Option<String>,
    optional: bool,
    exclusions: Vec<Exclusion>,
}

/// One parsed per-version package descriptor. Ancestor descriptors (fetched
/// along the `<parent>` chain) supply inherited property values; the nearest
/// ancestor declaring a property wins.
#[derive(Debug, Clone)]
pub struct PomDocument {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub parent: Option<ParentRef>,
    properties: HashMap<String, String>,
    dependencies: Vec<RawDependency>,
}

impl PomDocument {
    /// Parses a descriptor document, accumulating structural problems instead
    /// of stopping at the first.
    pub fn parse(document: &str, location: &str) -> Result<PomDocument, ResolveError> {
        let xml: ProjectXml = serde_xml_rs::from_str(document)
            .map_err(|e| ResolveError::parse(location, vec![e.to_string()]))?;

        let mut problems = Vec::new();

        let parent = xml.parent.and_then(|p| match (p.groupId, p.artifactId) {
            (Some(group_id), Some(artifact_id)) => Some(ParentRef {
                group_id,
                artifact_id,
                version: p.version.unwrap_or_default(),
            }),
            _ => {
                problems.push("parent element without groupId/artifactId".to_string());
                None
            }
        });

        let mut dependencies = Vec::new();
        for (index, entry) in xml
            .dependencies
            .unwrap_or_default()
            .dependency
            .into_iter()
            .enumerate()
        {
            let (group_id, artifact_id) = match (entry.groupId, entry.artifactId) {
                (Some(g), Some(a)) => (g, a),
                _ => {
                    problems.push(format!("dependency #{} without groupId/artifactId", index + 1));
                    continue;
                }
            };
            let exclusions = entry
                .exclusions
                .unwrap_or_default()
                .exclusion
                .into_iter()
                // a missing exclusion field acts as the wildcard
                .map(|e| {
                    Exclusion::new(
                        e.groupId.unwrap_or_else(|| "*".to_string()),
                        e.artifactId.unwrap_or_else(|| "*".to_string()),
                    )
                })
                .collect();
            dependencies.push(RawDependency {
                group_id,
                artifact_id,
                version: entry.version,
                classifier: entry.classifier,
                artifact_type: entry.r#type,
                scope: entry.scope,
                optional: entry.optional.as_deref() == Some("true"),
                exclusions,
            });
        }

        if !problems.is_empty() {
            return Err(ResolveError::parse(location, problems));
        }

        Ok(PomDocument {
            group_id: xml.groupId,
            artifact_id: xml.artifactId,
            version: xml.version,
            parent,
            properties: xml.properties.unwrap_or_default(),
            dependencies,
        })
    }

    /// A single document's contribution to property lookup. Beyond
    /// `<properties>`, the version/group of the project itself (falling back
    /// to its parent declaration) are addressable.
    fn property(&self, key: &str) -> Option<&str> {
        match key {
            "project.version" | "pom.version" | "version" => self
                .version
                .as_deref()
                .or_else(|| self.parent.as_ref().map(|p| p.version.as_str())),
            "project.groupId" | "pom.groupId" | "groupId" => self
                .group_id
                .as_deref()
                .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str())),
            _ => self.properties.get(key).map(String::as_str),
        }
    }

    /// The document's direct dependencies for the requested scopes, in
    /// declaration order. `${...}` placeholders are resolved against this
    /// document first, then the ancestor chain. Optional dependencies and
    /// entries with unrecognized scope text are skipped.
    pub fn get_dependencies(
        &self,
        scopes: &[Scope],
        ancestors: &[PomDocument],
    ) -> Vec<PomDependency> {
        let chain: Vec<&PomDocument> = std::iter::once(self).chain(ancestors.iter()).collect();

        let mut result = Vec::new();
        for raw in &self.dependencies {
            if raw.optional {
                continue;
            }
            let scope = match &raw.scope {
                None => Scope::Compile,
                Some(text) => match Scope::parse(text) {
                    Some(scope) => scope,
                    None => continue,
                },
            };
            if !scopes.contains(&scope) {
                continue;
            }
            result.push(PomDependency {
                group_id: resolve_placeholders(&raw.group_id, &chain),
                artifact_id: resolve_placeholders(&raw.artifact_id, &chain),
                version: raw
                    .version
                    .as_deref()
                    .map(|v| resolve_placeholders(v, &chain))
                    .unwrap_or_default(),
                classifier: raw.classifier.clone().unwrap_or_default(),
                artifact_type: raw.artifact_type.clone().unwrap_or_else(|| "jar".to_string()),
                scope,
                exclusions: raw.exclusions.clone(),
                parent: None,
            });
        }
        result
    }
}

/// Replaces `${name}` placeholders, nearest document in the chain winning.
/// Unresolvable placeholders are left verbatim; downstream version parsing
/// turns them into `UNKNOWN`.
fn resolve_placeholders(text: &str, chain: &[&PomDocument]) -> String {
    PLACEHOLDER_REGEX
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let key = &captures[1];
            chain
                .iter()
                .find_map(|document| document.property(key))
                .map(str::to_string)
                .unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}

/// One `<dependency>` entry as encountered during graph traversal, carrying a
/// back-reference to the entry it was declared under. The chain is the basis
/// for hierarchical exclusion matching: an exclusion declared by an ancestor
/// suppresses all of its descendants.
#[derive(Debug, Clone)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: String,
    pub artifact_type: String,
    pub scope: Scope,
    pub exclusions: Vec<Exclusion>,
    pub parent: Option<Arc<PomDependency>>,
}

impl PomDependency {
    pub fn same_artifact(&self, other: &PomDependency) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.classifier == other.classifier
            && self.artifact_type == other.artifact_type
    }

    pub fn to_dependency(&self) -> Dependency {
        Dependency {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: VersionNumber::parse(&self.version),
            classifier: self.classifier.clone(),
            artifact_type: self.artifact_type.clone(),
            exclusions: self.exclusions.clone(),
        }
    }

    /// True if an exclusion declared anywhere along the ancestor chain, or one
    /// of the seed dependency's own (globally applied) exclusions, matches
    /// this entry. The chain is walked iteratively - descriptor trees can be
    /// deep.
    pub fn excluded_by(&self, seed_exclusions: &[Exclusion]) -> bool {
        if seed_exclusions
            .iter()
            .any(|e| e.matches_coordinates(&self.group_id, &self.artifact_id))
        {
            return true;
        }
        let mut current = self.parent.as_deref();
        while let Some(ancestor) = current {
            if ancestor
                .exclusions
                .iter()
                .any(|e| e.matches_coordinates(&self.group_id, &self.artifact_id))
            {
                return true;
            }
            current = ancestor.parent.as_deref();
        }
        false
    }
}
