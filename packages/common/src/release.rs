use serde::{Deserialize, Serialize};

/// Client-declared metadata for an app release.
///
/// Travels with a chunked upload session until completion and is what the
/// version record is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub version_code: i32,
    pub version_name: String,
    #[serde(default)]
    pub release_notes: String,
    #[serde(default)]
    pub is_mandatory: bool,
}
