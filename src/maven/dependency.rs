use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::maven::version::VersionNumber;

/// Usage classification of a dependency. Scopes are flat - no scope implies
/// another, callers query several scopes explicitly when they want a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Compile,
    Runtime,
    Standalone,
    Test,
}

impl Scope {
    pub fn parse(text: &str) -> Option<Scope> {
        match text {
            "compile" => Some(Scope::Compile),
            "runtime" => Some(Scope::Runtime),
            "standalone" => Some(Scope::Standalone),
            "test" => Some(Scope::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Standalone => "standalone",
            Scope::Test => "test",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group/artifact pattern suppressing a dependency (and the subtree it would
/// pull in) from transitive resolution. Either field may be the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Exclusion {
        Exclusion {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn matches_coordinates(&self, group_id: &str, artifact_id: &str) -> bool {
        fn field_matches(pattern: &str, value: &str) -> bool {
            pattern == "*" || pattern == value
        }
        field_matches(&self.group_id, group_id) && field_matches(&self.artifact_id, artifact_id)
    }

    pub fn matches(&self, dependency: &Dependency) -> bool {
        self.matches_coordinates(&dependency.group_id, &dependency.artifact_id)
    }
}

/// A declared dependency. Identity for set and graph membership is
/// (group, artifact, classifier, type) - the version is deliberately not part
/// of it, so different versions of the same artifact are recognized as
/// duplicates during transitive resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: VersionNumber,
    pub classifier: String,
    pub artifact_type: String,
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: VersionNumber,
    ) -> Dependency {
        Dependency {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            classifier: String::new(),
            artifact_type: "jar".to_string(),
            exclusions: Vec::new(),
        }
    }

    /// Parses the compact `group:artifact[:version[:classifier]][@type]`
    /// notation. Malformed input yields `None`, never an error.
    pub fn parse(notation: &str) -> Option<Dependency> {
        let (coordinates, artifact_type) = match notation.rsplit_once('@') {
            Some((_, t)) if t.is_empty() => return None,
            Some((c, t)) => (c, t),
            None => (notation, "jar"),
        };

        let parts: Vec<&str> = coordinates.split(':').collect();
        if !(2..=4).contains(&parts.len()) {
            return None;
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return None;
        }

        Some(Dependency {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: parts
                .get(2)
                .map_or(VersionNumber::UNKNOWN, |v| VersionNumber::parse(v)),
            classifier: parts.get(3).unwrap_or(&"").to_string(),
            artifact_type: artifact_type.to_string(),
            exclusions: Vec::new(),
        })
    }

    /// A plain directory classpath entry. Local entries are never resolved
    /// against repositories; they only participate in classpath assembly.
    pub fn from_path(path: &Path) -> Dependency {
        Dependency {
            group_id: String::new(),
            artifact_id: path.to_string_lossy().into_owned(),
            version: VersionNumber::UNKNOWN,
            classifier: String::new(),
            artifact_type: "dir".to_string(),
            exclusions: Vec::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.artifact_type == "dir"
    }

    /// Identity comparison, ignoring version and exclusions.
    pub fn same_artifact(&self, other: &Dependency) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.classifier == other.classifier
            && self.artifact_type == other.artifact_type
    }

    /// The artifact file name for a concrete version. Snapshot artifacts pass
    /// the snapshot-resolved version here, which differs from the declared one.
    pub fn file_name(&self, version: &VersionNumber) -> String {
        let classifier = if self.classifier.is_empty() {
            String::new()
        } else {
            format!("-{}", self.classifier)
        };
        format!(
            "{}-{}{}.{}",
            self.artifact_id, version, classifier, self.artifact_type
        )
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        if self.artifact_type != "jar" {
            write!(f, "@{}", self.artifact_type)?;
        }
        Ok(())
    }
}

/// Order-preserving collection of dependencies, rejecting duplicates by
/// artifact identity.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    entries: Vec<Dependency>,
}

impl DependencySet {
    pub fn new() -> DependencySet {
        DependencySet::default()
    }

    /// Returns true if the dependency was inserted, false if an entry with the
    /// same identity was already present.
    pub fn add(&mut self, dependency: Dependency) -> bool {
        if self.contains(&dependency) {
            return false;
        }
        self.entries.push(dependency);
        true
    }

    pub fn add_all(&mut self, dependencies: impl IntoIterator<Item = Dependency>) {
        for dependency in dependencies {
            self.add(dependency);
        }
    }

    pub fn contains(&self, dependency: &Dependency) -> bool {
        self.entries.iter().any(|e| e.same_artifact(dependency))
    }

    pub fn retain(&mut self, f: impl FnMut(&Dependency) -> bool) {
        self.entries.retain(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.iter()
    }

    /// Only the directory-path entries, for classpath assembly.
    pub fn local_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.iter().filter(|d| d.is_local())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for DependencySet {
    type Item = Dependency;
    type IntoIter = std::vec::IntoIter<Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> DependencySet {
        let mut set = DependencySet::new();
        set.add_all(iter);
        set
    }
}

/// Caller-owned mapping from scope to declared dependencies. Populated before
/// resolution begins; the resolver itself never mutates it.
#[derive(Debug, Clone, Default)]
pub struct DependencyScopes {
    scopes: HashMap<Scope, DependencySet>,
}

impl DependencyScopes {
    pub fn new() -> DependencyScopes {
        DependencyScopes::default()
    }

    pub fn add(&mut self, scope: Scope, dependency: Dependency) -> bool {
        self.scopes.entry(scope).or_default().add(dependency)
    }

    pub fn get(&self, scope: Scope) -> Option<&DependencySet> {
        self.scopes.get(&scope)
    }

    /// Union of the given scopes, preserving insertion order per scope and the
    /// order of the requested scopes across them.
    pub fn combined(&self, scopes: &[Scope]) -> DependencySet {
        let mut result = DependencySet::new();
        for scope in scopes {
            if let Some(set) = self.scopes.get(scope) {
                result.add_all(set.iter().cloned());
            }
        }
        result
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    fn dependency(notation: &str) -> Dependency {
        Dependency::parse(notation).unwrap()
    }

    #[rstest]
    #[case::group_artifact("org.example:thing", "org.example", "thing", VersionNumber::UNKNOWN, "", "jar")]
    #[case::with_version("org.example:thing:1.2", "org.example", "thing", VersionNumber::new(1, Some(2), None, None), "", "jar")]
    #[case::with_classifier("org.example:thing:1.2:sources", "org.example", "thing", VersionNumber::new(1, Some(2), None, None), "sources", "jar")]
    #[case::with_type("org.example:thing:1.2@zip", "org.example", "thing", VersionNumber::new(1, Some(2), None, None), "", "zip")]
    #[case::type_without_version("org.example:thing@war", "org.example", "thing", VersionNumber::UNKNOWN, "", "war")]
    fn test_parse_notation(
        #[case] notation: &str,
        #[case] group_id: &str,
        #[case] artifact_id: &str,
        #[case] version: VersionNumber,
        #[case] classifier: &str,
        #[case] artifact_type: &str,
    ) {
        let parsed = Dependency::parse(notation).unwrap();
        assert_eq!(parsed.group_id, group_id);
        assert_eq!(parsed.artifact_id, artifact_id);
        assert_eq!(parsed.version, version);
        assert_eq!(parsed.classifier, classifier);
        assert_eq!(parsed.artifact_type, artifact_type);
    }

    #[rstest]
    #[case::no_separator("justonename")]
    #[case::empty("")]
    #[case::empty_group(":thing")]
    #[case::empty_artifact("org.example:")]
    #[case::too_many_parts("a:b:c:d:e")]
    #[case::empty_type("a:b@")]
    fn test_parse_notation_rejects(#[case] notation: &str) {
        assert!(Dependency::parse(notation).is_none());
    }

    #[test]
    fn test_identity_ignores_version() {
        let a = dependency("org.example:thing:1.0");
        let b = dependency("org.example:thing:2.0");
        assert!(a.same_artifact(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_includes_classifier_and_type() {
        let plain = dependency("org.example:thing:1.0");
        assert!(!plain.same_artifact(&dependency("org.example:thing:1.0:sources")));
        assert!(!plain.same_artifact(&dependency("org.example:thing:1.0@zip")));
    }

    #[rstest]
    #[case::exact("org.example", "thing", true)]
    #[case::wildcard_artifact("org.example", "*", true)]
    #[case::wildcard_group("*", "thing", true)]
    #[case::wildcard_both("*", "*", true)]
    #[case::wrong_group("org.other", "thing", false)]
    #[case::wrong_artifact("org.example", "other", false)]
    fn test_exclusion_matching(#[case] group: &str, #[case] artifact: &str, #[case] expected: bool) {
        let exclusion = Exclusion::new(group, artifact);
        assert_eq!(exclusion.matches(&dependency("org.example:thing:1.0")), expected);
    }

    #[test]
    fn test_dependency_set_rejects_duplicates_and_keeps_order() {
        let mut set = DependencySet::new();
        assert!(set.add(dependency("a:one:1.0")));
        assert!(set.add(dependency("a:two:1.0")));
        assert!(!set.add(dependency("a:one:2.0")));

        let versions: Vec<String> = set.iter().map(|d| d.to_string()).collect();
        assert_eq!(versions, vec!["a:one:1.0", "a:two:1.0"]);
    }

    #[test]
    fn test_local_dependencies() {
        let mut set = DependencySet::new();
        set.add(dependency("a:one:1.0"));
        set.add(Dependency::from_path(Path::new("lib/classes")));

        let locals: Vec<&Dependency> = set.local_dependencies().collect();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].artifact_id, "lib/classes");
        assert!(locals[0].is_local());
    }

    #[test]
    fn test_file_name() {
        let version = VersionNumber::parse("1.2.3");
        assert_eq!(dependency("a:b:1.2.3").file_name(&version), "b-1.2.3.jar");
        assert_eq!(
            dependency("a:b:1.2.3:sources").file_name(&version),
            "b-1.2.3-sources.jar"
        );
        assert_eq!(dependency("a:b:1.2.3@zip").file_name(&version), "b-1.2.3.zip");
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!(Scope::parse("compile"), Some(Scope::Compile));
        assert_eq!(Scope::parse("standalone"), Some(Scope::Standalone));
        assert_eq!(Scope::parse("provided"), None);
    }

    #[test]
    fn test_dependency_scopes_combined() {
        let mut scopes = DependencyScopes::new();
        scopes.add(Scope::Compile, dependency("a:one:1.0"));
        scopes.add(Scope::Test, dependency("a:two:1.0"));
        scopes.add(Scope::Test, dependency("a:one:2.0"));

        let combined = scopes.combined(&[Scope::Compile, Scope::Test]);
        assert_eq!(combined.len(), 2);
        assert!(combined.contains(&dependency("a:one:1.0")));
        assert!(combined.contains(&dependency("a:two:1.0")));
    }
}
