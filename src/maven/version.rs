use std::cmp::Ordering;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PRE_RELEASE_REGEX: Regex =
        Regex::new(r"(?i)^(rc|cr)|milestone|^m\d*$|beta|^b\d*$|alpha|^a\d*$").unwrap();
}

/// A parsed artifact version: up to three numeric components plus an optional
/// qualifier. Missing numeric components sort below present ones; an absent
/// qualifier sorts *above* any qualifier, so `1.2.3` ranks higher than
/// `1.2.3-beta1`.
///
/// Unparseable input never fails - it yields [`VersionNumber::UNKNOWN`], which
/// sorts below everything else. Callers test for `UNKNOWN` instead of catching
/// an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionNumber {
    pub major: Option<u32>,
    pub minor: Option<u32>,
    pub revision: Option<u32>,
    pub qualifier: Option<String>,
}

impl VersionNumber {
    /// Sentinel for "no resolvable version".
    pub const UNKNOWN: VersionNumber = VersionNumber {
        major: None,
        minor: None,
        revision: None,
        qualifier: None,
    };

    /// Positional constructor. Independent of [`VersionNumber::parse`] - the
    /// two are not textual inverses for every input, only the ordering rules
    /// are shared.
    pub fn new(
        major: u32,
        minor: Option<u32>,
        revision: Option<u32>,
        qualifier: Option<&str>,
    ) -> VersionNumber {
        VersionNumber {
            major: Some(major),
            minor,
            revision,
            qualifier: qualifier.map(str::to_string),
        }
    }

    /// Parses `major[.minor[.revision]][-qualifier]`. A qualifier may also be
    /// attached with a `.` separator (`1.2.3.Final`); a `-` qualifier takes
    /// precedence and any dot-attached tail is folded into it.
    pub fn parse(text: &str) -> VersionNumber {
        let text = text.trim();
        if text.is_empty() {
            return VersionNumber::UNKNOWN;
        }

        let (numeric_part, dash_qualifier) = match text.split_once('-') {
            Some((n, q)) => (n, Some(q)),
            None => (text, None),
        };

        let mut numbers: [Option<u32>; 3] = [None, None, None];
        let mut next = 0;
        let mut dot_tail: Vec<&str> = Vec::new();
        for segment in numeric_part.split('.') {
            if !dot_tail.is_empty() || next == numbers.len() {
                dot_tail.push(segment);
                continue;
            }
            match segment.parse::<u32>() {
                Ok(n) => {
                    numbers[next] = Some(n);
                    next += 1;
                }
                Err(_) if next == 0 => return VersionNumber::UNKNOWN,
                Err(_) => dot_tail.push(segment),
            }
        }

        let qualifier = match (dot_tail.is_empty(), dash_qualifier) {
            (true, None) => None,
            (true, Some(q)) => Some(q.to_string()),
            (false, None) => Some(dot_tail.join(".")),
            (false, Some(q)) => Some(format!("{}-{}", dot_tail.join("."), q)),
        };

        VersionNumber {
            major: numbers[0],
            minor: numbers[1],
            revision: numbers[2],
            qualifier,
        }
    }

    /// Case-sensitive check against the `SNAPSHOT` marker.
    pub fn is_snapshot(&self) -> bool {
        self.qualifier
            .as_deref()
            .map_or(false, |q| q.ends_with("SNAPSHOT"))
    }

    /// True if the qualifier marks a pre-release build (release candidates,
    /// milestones, betas, alphas). Snapshots are classified separately via
    /// [`VersionNumber::is_snapshot`].
    pub fn is_pre_release(&self) -> bool {
        self.qualifier
            .as_deref()
            .map_or(false, |q| PRE_RELEASE_REGEX.is_match(q))
    }
}

fn compare_qualifiers(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // no qualifier ranks above any qualifier
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        // Option's ordering gives absent < present for the numeric parts
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.revision.cmp(&other.revision))
            .then_with(|| compare_qualifiers(&self.qualifier, &other.qualifier))
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = match self.major {
            Some(major) => major,
            None => return write!(f, "unknown"),
        };
        write!(f, "{}", major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        if let Some(qualifier) = &self.qualifier {
            write!(f, "-{}", qualifier)?;
        }
        Ok(())
    }
}
