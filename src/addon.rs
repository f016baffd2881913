//! The persisted addon entity and its derived display state.

use crate::catalog::{CatalogEntry, CatalogFile, ChannelType};
use crate::client::ClientType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UI-facing status of an addon. Never stored: recomputed from the
/// persisted fields on every read so it can't go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayState {
    Unknown,
    Install,
    Update,
    UpToDate,
    Ignored,
}

/// One tracked addon for one client installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Addon {
    /// Row id; 0 until first persisted.
    pub id: i64,
    pub name: String,
    pub author: String,
    pub client_type: ClientType,
    /// Remote catalog addon id; `None` for untracked folders.
    pub external_id: Option<i64>,
    pub folder_name: String,
    /// Every folder the current file installs.
    pub installed_folders: Vec<String>,
    pub installed_version: Option<String>,
    pub latest_version: String,
    pub download_url: String,
    pub game_version: String,
    pub thumbnail_url: String,
    pub external_url: String,
    pub channel: ChannelType,
    pub auto_update: bool,
    pub is_ignored: bool,
    pub installed_at: Option<DateTime<Utc>>,
}

impl Addon {
    /// Builds a fresh record from a resolved catalog identity. The addon is
    /// not yet installed locally unless `installed_version` is set later.
    pub fn from_catalog(
        entry: &CatalogEntry,
        file: &CatalogFile,
        folder_name: &str,
        client_type: ClientType,
    ) -> Addon {
        Addon {
            id: 0,
            name: entry.name.clone(),
            author: entry.author.clone(),
            client_type,
            external_id: Some(entry.id),
            folder_name: folder_name.to_string(),
            installed_folders: file.folder_names(),
            installed_version: None,
            latest_version: file.display_name.clone(),
            download_url: file.download_url.clone(),
            game_version: file.game_version.first().cloned().unwrap_or_default(),
            thumbnail_url: entry.thumbnail_url.clone(),
            external_url: entry.website_url.clone(),
            channel: ChannelType::Stable,
            auto_update: false,
            is_ignored: false,
            installed_at: None,
        }
    }

    /// Derives the display state. Ignore wins over everything; a missing
    /// installed version reads as installable; version comparison is literal
    /// string inequality.
    pub fn display_state(&self) -> DisplayState {
        if self.is_ignored {
            return DisplayState::Ignored;
        }
        let Some(installed) = self.installed_version.as_deref() else {
            return DisplayState::Install;
        };
        if installed != self.latest_version {
            DisplayState::Update
        } else {
            DisplayState::UpToDate
        }
    }

    /// True when an update would be applied on the next batch run.
    pub fn wants_auto_update(&self) -> bool {
        self.auto_update && self.display_state() == DisplayState::Update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addon(ignored: bool, installed: Option<&str>, latest: &str) -> Addon {
        Addon {
            id: 1,
            name: "Demo".into(),
            author: String::new(),
            client_type: ClientType::Retail,
            external_id: Some(42),
            folder_name: "Demo".into(),
            installed_folders: vec!["Demo".into()],
            installed_version: installed.map(str::to_string),
            latest_version: latest.into(),
            download_url: String::new(),
            game_version: String::new(),
            thumbnail_url: String::new(),
            external_url: String::new(),
            channel: ChannelType::Stable,
            auto_update: false,
            is_ignored: ignored,
            installed_at: None,
        }
    }

    #[test]
    fn ignore_overrides_an_available_update() {
        assert_eq!(
            addon(true, Some("1.0"), "2.0").display_state(),
            DisplayState::Ignored
        );
    }

    #[test]
    fn missing_installed_version_reads_as_install() {
        assert_eq!(addon(false, None, "2.0").display_state(), DisplayState::Install);
    }

    #[test]
    fn equal_versions_read_as_up_to_date() {
        assert_eq!(
            addon(false, Some("1.0"), "1.0").display_state(),
            DisplayState::UpToDate
        );
    }

    #[test]
    fn empty_latest_version_still_compares_literally() {
        // Even with no known latest file the comparison stays a plain
        // string compare, so "1.0" vs "" reads as Update.
        assert_eq!(addon(false, Some("1.0"), "").display_state(), DisplayState::Update);
    }

    #[test]
    fn update_detection_is_literal_string_compare() {
        // Plain string inequality, not a semantic-version ordering: a
        // downgrade or a reformatted-but-equal version reads as Update.
        assert_eq!(
            addon(false, Some("2.0"), "1.9").display_state(),
            DisplayState::Update
        );
        assert_eq!(
            addon(false, Some("1.0"), "v1.0").display_state(),
            DisplayState::Update
        );
    }

    #[test]
    fn auto_update_requires_both_flag_and_pending_update() {
        let mut a = addon(false, Some("1.0"), "2.0");
        assert!(!a.wants_auto_update());
        a.auto_update = true;
        assert!(a.wants_auto_update());
        a.installed_version = Some("2.0".into());
        assert!(!a.wants_auto_update());
    }
}
