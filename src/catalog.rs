//! Data contracts for the consumed remote catalog services.
//!
//! These types mirror the JSON the fingerprint-match service and the catalog
//! file records put on the wire. The crate never performs the HTTP calls
//! itself; hosts fetch and deserialize, the core consumes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Release maturity of one catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ReleaseType {
    Release,
    Beta,
    Alpha,
}

impl From<u8> for ReleaseType {
    fn from(value: u8) -> Self {
        match value {
            2 => ReleaseType::Beta,
            3 => ReleaseType::Alpha,
            // 1 is Release; unknown values soft-fail to Release.
            _ => ReleaseType::Release,
        }
    }
}

impl From<ReleaseType> for u8 {
    fn from(value: ReleaseType) -> Self {
        match value {
            ReleaseType::Release => 1,
            ReleaseType::Beta => 2,
            ReleaseType::Alpha => 3,
        }
    }
}

/// Channel a user opts an addon into. Ordered by maturity: an addon on
/// `Beta` accepts `Stable` and `Beta` files but never `Alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Stable,
    Beta,
    Alpha,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Stable => "stable",
            ChannelType::Beta => "beta",
            ChannelType::Alpha => "alpha",
        }
    }

    /// Lenient token parse; unknown tokens fall back to `Stable`.
    pub fn from_str_lossy(token: &str) -> ChannelType {
        match token {
            "beta" => ChannelType::Beta,
            "alpha" => ChannelType::Alpha,
            _ => ChannelType::Stable,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReleaseType {
    /// Channel tier this release belongs to.
    pub fn channel(self) -> ChannelType {
        match self {
            ReleaseType::Release => ChannelType::Stable,
            ReleaseType::Beta => ChannelType::Beta,
            ReleaseType::Alpha => ChannelType::Alpha,
        }
    }
}

/// Dependency kinds a catalog file may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DependencyType {
    EmbeddedLibrary,
    Optional,
    Required,
    Tool,
    Incompatible,
    Include,
    Unknown,
}

impl From<u8> for DependencyType {
    fn from(value: u8) -> Self {
        match value {
            1 => DependencyType::EmbeddedLibrary,
            2 => DependencyType::Optional,
            3 => DependencyType::Required,
            4 => DependencyType::Tool,
            5 => DependencyType::Incompatible,
            6 => DependencyType::Include,
            _ => DependencyType::Unknown,
        }
    }
}

impl From<DependencyType> for u8 {
    fn from(value: DependencyType) -> Self {
        match value {
            DependencyType::EmbeddedLibrary => 1,
            DependencyType::Optional => 2,
            DependencyType::Required => 3,
            DependencyType::Tool => 4,
            DependencyType::Incompatible => 5,
            DependencyType::Include => 6,
            DependencyType::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDependency {
    pub addon_id: i64,
    #[serde(rename = "type", default = "DependencyType::unknown")]
    pub kind: DependencyType,
}

impl DependencyType {
    fn unknown() -> DependencyType {
        DependencyType::Unknown
    }
}

/// One folder a catalog file installs, with its declared fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModule {
    pub foldername: String,
    pub fingerprint: u32,
}

/// One downloadable file record from the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub id: i64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub file_name: String,
    pub release_type: ReleaseType,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub dependencies: Vec<CatalogDependency>,
    #[serde(default)]
    pub modules: Vec<CatalogModule>,
    #[serde(default)]
    pub game_version: Vec<String>,
}

impl CatalogFile {
    /// Dependencies an install must also pull in.
    pub fn required_dependencies(&self) -> impl Iterator<Item = &CatalogDependency> {
        self.dependencies
            .iter()
            .filter(|dep| dep.kind == DependencyType::Required)
    }

    /// Folder names this file installs.
    pub fn folder_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.foldername.clone()).collect()
    }
}

/// One addon project in the remote catalog, trimmed to the fields the core
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub latest_files: Vec<CatalogFile>,
}

impl CatalogEntry {
    /// The newest file a given channel accepts: release tier at or below the
    /// channel, highest file id wins.
    pub fn latest_file(&self, channel: ChannelType) -> Option<&CatalogFile> {
        self.latest_files
            .iter()
            .filter(|file| file.release_type.channel() <= channel)
            .max_by_key(|file| file.id)
    }
}

/// One exact or partial hit from the fingerprint-match service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintMatch {
    /// Catalog addon id the matched file belongs to.
    pub id: i64,
    pub file: CatalogFile,
}

/// Response of the remote fingerprint-match service. The union of exact,
/// partial, and unmatched fingerprints covers every submitted fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintMatchResponse {
    #[serde(default)]
    pub exact_matches: Vec<FingerprintMatch>,
    #[serde(default)]
    pub exact_fingerprints: Vec<u32>,
    #[serde(default)]
    pub partial_matches: Vec<FingerprintMatch>,
    /// Submitted fingerprint (stringified) → candidate file ids within
    /// `partial_matches`.
    #[serde(default)]
    pub partial_match_fingerprints: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub unmatched_fingerprints: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: i64, release_type: ReleaseType) -> CatalogFile {
        CatalogFile {
            id,
            display_name: format!("file-{id}"),
            file_name: format!("Addon-{id}.zip"),
            release_type,
            download_url: String::new(),
            dependencies: Vec::new(),
            modules: Vec::new(),
            game_version: Vec::new(),
        }
    }

    #[test]
    fn latest_file_honors_the_channel_ceiling() {
        let entry = CatalogEntry {
            id: 1,
            name: "Demo".into(),
            author: String::new(),
            website_url: String::new(),
            thumbnail_url: String::new(),
            latest_files: vec![
                file(10, ReleaseType::Release),
                file(12, ReleaseType::Beta),
                file(14, ReleaseType::Alpha),
            ],
        };

        assert_eq!(entry.latest_file(ChannelType::Stable).unwrap().id, 10);
        assert_eq!(entry.latest_file(ChannelType::Beta).unwrap().id, 12);
        assert_eq!(entry.latest_file(ChannelType::Alpha).unwrap().id, 14);
    }

    #[test]
    fn latest_file_prefers_the_highest_id_within_a_channel() {
        let entry = CatalogEntry {
            id: 1,
            name: "Demo".into(),
            author: String::new(),
            website_url: String::new(),
            thumbnail_url: String::new(),
            latest_files: vec![file(10, ReleaseType::Release), file(11, ReleaseType::Release)],
        };
        assert_eq!(entry.latest_file(ChannelType::Stable).unwrap().id, 11);
    }

    #[test]
    fn release_type_deserializes_from_wire_numbers() {
        let json = r#"{"id": 5, "releaseType": 2}"#;
        let parsed: CatalogFile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.release_type, ReleaseType::Beta);
        // Unknown maturity soft-fails to Release.
        let json = r#"{"id": 5, "releaseType": 9}"#;
        let parsed: CatalogFile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.release_type, ReleaseType::Release);
    }

    #[test]
    fn match_response_fills_missing_buckets_with_defaults() {
        let parsed: FingerprintMatchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.exact_matches.is_empty());
        assert!(parsed.partial_match_fingerprints.is_empty());
        assert!(parsed.unmatched_fingerprints.is_empty());
    }
}
