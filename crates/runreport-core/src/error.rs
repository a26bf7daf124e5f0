//! Error taxonomy for run-report processing.

use std::path::PathBuf;

/// Structural faults in the version table.
///
/// These indicate a broken version-table generator and are never recovered.
#[derive(Debug, thiserror::Error)]
pub enum VersionTableError {
    #[error("unexpected number of tags for version {version}: {tags:?}")]
    TooManyTags { version: String, tags: Vec<String> },

    #[error("unexpected tag combination for version {version}: {tags:?}")]
    UnexpectedCombination { version: String, tags: Vec<String> },

    #[error("version {version} listed on line {line} before any `type` line")]
    VersionBeforeType { version: String, line: usize },

    #[error("io error reading version table: {0}")]
    Io(#[from] std::io::Error),
}

/// A record that could not be normalized.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode record {id}: {reason}")]
pub struct DecodeError {
    /// Record identifier, or `unknown` when the id itself was unavailable.
    pub id: String,
    pub reason: String,
}

/// Run-report processing errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("path doesn't exist: {0}")]
    MissingPath(PathBuf),

    #[error("output file already exists, refusing to overwrite: {0}")]
    OutputExists(PathBuf),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed run report: {0}")]
    MalformedReport(String),

    #[error("version table error: {0}")]
    VersionTable(#[from] VersionTableError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("storage error: {0}")]
    Store(#[from] runreport_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for run-report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_record() {
        let err = DecodeError {
            id: "abc123".to_string(),
            reason: "conflicting exception elements".to_string(),
        };
        assert!(err.to_string().contains("abc123"));

        let wrapped: ReportError = err.into();
        assert!(wrapped.to_string().contains("conflicting exception elements"));
    }

    #[test]
    fn version_table_error_lists_tags() {
        let err = VersionTableError::UnexpectedCombination {
            version: "1.4-1-gabc".to_string(),
            tags: vec!["gatk.git".to_string(), "unstable".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("1.4-1-gabc"));
        assert!(msg.contains("unstable"));
    }
}
