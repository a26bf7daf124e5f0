//! GATK version parsing and release classification.
//!
//! Version strings come in three shapes: legacy svn numbering (`1.0.5777`),
//! full git describe output (`1.3-33-g1bfe280`) and bare git tags (`1.3`).
//! Anything else, including raw commit hashes, is `unknown`.
//!
//! The version table file lists, per repository, every version string that
//! repository has produced:
//!
//! ```text
//! type unstable
//! 1.4-371-g3f76265
//! 1.4-28-g26ab3e8
//! type stable
//! 1.4-28-g26ab3e8
//! type gatk.git
//! 1.4-28-g7dc6f73
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::VersionTableError;

/// Major version reported for unrecognized version strings.
pub const UNKNOWN_MAJOR: &str = "unknown";

const RELEASE_TAG: &str = "gatk.git";
const STABLE_TAG: &str = "stable";
const UNSTABLE_TAG: &str = "unstable";
const UNKNOWN_TAG: &str = "unknown";

fn svn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^1\.0\.([0-9])([0-9]*)").expect("valid svn regex"))
}

fn git_full_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9])\.([0-9]+)-([0-9]+)-\w*$").expect("valid git describe regex")
    })
}

fn git_short_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9])\.([0-9]+)$").expect("valid git tag regex"))
}

/// Minor number from a run of ASCII digits; too many digits saturate.
fn parse_minor(digits: &str) -> u64 {
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or_else(|_| {
        warn!(event = "version.minor_overflow", digits, "minor version saturated");
        u64::MAX
    })
}

/// Split a version string into `(major, minor)`.
///
/// Svn numbers `1.0.Vxxx` map to `("0.V", xxx)`; git numbers map to their
/// `X.Y` tag and the commit distance from it.
pub fn parse_version(text: &str) -> (String, u64) {
    if let Some(caps) = svn_pattern().captures(text) {
        return (format!("0.{}", &caps[1]), parse_minor(&caps[2]));
    }
    if let Some(caps) = git_full_pattern().captures(text) {
        return (format!("{}.{}", &caps[1], &caps[2]), parse_minor(&caps[3]));
    }
    if let Some(caps) = git_short_pattern().captures(text) {
        return (format!("{}.{}", &caps[1], &caps[2]), 0);
    }
    (UNKNOWN_MAJOR.to_string(), 0)
}

/// Where a version string was published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ReleaseType {
    /// Present in the public release repository.
    Release,
    /// Internal stable branch.
    Stable,
    /// Development-only build.
    Unstable,
    Unknown,
    /// A repository tag outside the three tracked ones.
    Other(String),
}

impl ReleaseType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            RELEASE_TAG => ReleaseType::Release,
            STABLE_TAG => ReleaseType::Stable,
            UNSTABLE_TAG => ReleaseType::Unstable,
            UNKNOWN_TAG => ReleaseType::Unknown,
            other => ReleaseType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReleaseType::Release => RELEASE_TAG,
            ReleaseType::Stable => STABLE_TAG,
            ReleaseType::Unstable => UNSTABLE_TAG,
            ReleaseType::Unknown => UNKNOWN_TAG,
            ReleaseType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ReleaseType> for String {
    fn from(value: ReleaseType) -> Self {
        value.as_str().to_string()
    }
}

/// Parsed view of one version string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub major: String,
    pub minor: u64,
    pub release_type: ReleaseType,
}

impl VersionInfo {
    pub fn classify(text: &str, table: &VersionTable) -> Self {
        let (major, minor) = parse_version(text);
        Self {
            major,
            minor,
            release_type: table.classify_release_type(text),
        }
    }
}

/// Collapse the set of repositories a version was seen in to one release type.
///
/// Three tags means the version reached every repository, i.e. it was
/// publicly released. Two tags must be stable plus one other.
pub fn resolve_tags(version: &str, tags: &[String]) -> Result<ReleaseType, VersionTableError> {
    match tags.len() {
        0 => Ok(ReleaseType::Unknown),
        1 => Ok(ReleaseType::from_tag(&tags[0])),
        2 if tags.iter().any(|t| t == STABLE_TAG) => Ok(ReleaseType::Stable),
        2 => Err(VersionTableError::UnexpectedCombination {
            version: version.to_string(),
            tags: tags.to_vec(),
        }),
        3 => Ok(ReleaseType::Release),
        _ => Err(VersionTableError::TooManyTags {
            version: version.to_string(),
            tags: tags.to_vec(),
        }),
    }
}

/// Version string to release type, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct VersionTable {
    entries: HashMap<String, ReleaseType>,
}

impl VersionTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read a version table file.
    pub fn load(path: &Path) -> Result<Self, VersionTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse the `type <tag>` / version-per-line format.
    ///
    /// Every entry is resolved eagerly, so an inconsistent table fails here
    /// rather than midway through a run.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, VersionTableError> {
        let mut tags_by_version: HashMap<String, Vec<String>> = HashMap::new();
        let mut current: Option<String> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut words = line.split_whitespace();
            if let (Some("type"), Some(tag)) = (words.next(), words.next()) {
                current = Some(tag.to_string());
                continue;
            }

            let Some(tag) = current.as_ref() else {
                return Err(VersionTableError::VersionBeforeType {
                    version: line.to_string(),
                    line: idx + 1,
                });
            };
            let tags = tags_by_version.entry(line.to_string()).or_default();
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        let mut entries = HashMap::with_capacity(tags_by_version.len());
        for (version, tags) in tags_by_version {
            let release_type = resolve_tags(&version, &tags)?;
            entries.insert(version, release_type);
        }
        debug!(versions = entries.len(), "loaded version table");
        Ok(Self { entries })
    }

    /// Release type of `version`, or `unknown` when the table has never seen it.
    pub fn classify_release_type(&self, version: &str) -> ReleaseType {
        self.entries
            .get(version)
            .cloned()
            .unwrap_or(ReleaseType::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_version_shapes() {
        let cases = [
            ("1.0.5777", ("0.5", 777)),
            ("1.0.6000", ("0.6", 0)),
            ("1.3-33-g1bfe280", ("1.3", 33)),
            ("1.4-1-xafdasdf", ("1.4", 1)),
            ("1.3", ("1.3", 0)),
            ("<unknown>", ("unknown", 0)),
            ("382343549e2e98e2727e66548b6b2bafa6fa4297", ("unknown", 0)),
        ];
        for (text, (major, minor)) in cases {
            let parsed = parse_version(text);
            assert_eq!(parsed, (major.to_string(), minor), "parsing {text}");
        }
    }

    #[test]
    fn legacy_single_digit_has_zero_minor() {
        assert_eq!(parse_version("1.0.7"), ("0.7".to_string(), 0));
    }

    #[test]
    fn oversized_minor_saturates_instead_of_vanishing() {
        let (major, minor) = parse_version("1.0.91234567890123456789012345");
        assert_eq!(major, "0.9");
        assert_eq!(minor, u64::MAX);

        let (major, minor) = parse_version("1.4-99999999999999999999999-gabc");
        assert_eq!(major, "1.4");
        assert_eq!(minor, u64::MAX);
    }

    #[test]
    fn git_describe_with_trailing_garbage_is_unknown() {
        assert_eq!(parse_version("1.3-33-g1bf.e280").0, UNKNOWN_MAJOR);
        assert_eq!(parse_version("1.3.1").0, UNKNOWN_MAJOR);
    }

    const TABLE: &str = "\
type unstable
1.4-371-g3f76265
1.4-28-g26ab3e8
1.4-9-gaaaaaaa

type stable
1.4-28-g26ab3e8
1.4-27-g15c5b7a
1.4-9-gaaaaaaa
type gatk.git
1.4-28-g7dc6f73
1.4-9-gaaaaaaa
";

    #[test]
    fn table_collapses_tags() {
        let table = VersionTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(
            table.classify_release_type("1.4-371-g3f76265"),
            ReleaseType::Unstable
        );
        assert_eq!(
            table.classify_release_type("1.4-28-g26ab3e8"),
            ReleaseType::Stable
        );
        assert_eq!(
            table.classify_release_type("1.4-28-g7dc6f73"),
            ReleaseType::Release
        );
        assert_eq!(
            table.classify_release_type("1.4-9-gaaaaaaa"),
            ReleaseType::Release
        );
        assert_eq!(
            table.classify_release_type("9.9-1-gnothere"),
            ReleaseType::Unknown
        );
    }

    #[test]
    fn two_tags_without_stable_is_fatal() {
        let text = "type unstable\n1.5-1-gabc\ntype gatk.git\n1.5-1-gabc\n";
        let err = VersionTable::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            VersionTableError::UnexpectedCombination { .. }
        ));
    }

    #[test]
    fn more_than_three_tags_is_fatal() {
        let tags: Vec<String> = ["a", "b", "stable", "d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(
            resolve_tags("v", &tags),
            Err(VersionTableError::TooManyTags { .. })
        ));
    }

    #[test]
    fn repeated_listing_under_one_tag_counts_once() {
        let text = "type unstable\n1.5-1-gabc\n1.5-1-gabc\n";
        let table = VersionTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(
            table.classify_release_type("1.5-1-gabc"),
            ReleaseType::Unstable
        );
    }

    #[test]
    fn version_before_any_type_is_rejected() {
        let err = VersionTable::from_reader("1.5-1-gabc\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            VersionTableError::VersionBeforeType { line: 1, .. }
        ));
    }

    #[test]
    fn version_info_combines_parse_and_table() {
        let table = VersionTable::from_reader(TABLE.as_bytes()).unwrap();
        let info = VersionInfo::classify("1.4-28-g26ab3e8", &table);
        assert_eq!(info.major, "1.4");
        assert_eq!(info.minor, 28);
        assert_eq!(info.release_type, ReleaseType::Stable);
    }
}
