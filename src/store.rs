//! SQLite storage for tracked addons and user preferences.
//!
//! One database per profile holds every client's addons plus the key/value
//! preference table (installation locations, user toggles). Kept small on
//! purpose; the catalog itself is never cached here.

use crate::addon::Addon;
use crate::catalog::ChannelType;
use crate::client::ClientType;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite-backed addon and preference storage
pub struct AddonStore {
    conn: Connection,
}

impl AddonStore {
    /// Open or create the store database
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )
        .context("Failed to configure SQLite pragmas")?;

        let store = Self { conn };
        store.create_tables()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;

        let store = Self { conn };
        store.create_tables()?;

        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS addons (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                client_type TEXT NOT NULL,
                external_id INTEGER,
                folder_name TEXT NOT NULL,
                installed_folders TEXT NOT NULL DEFAULT '',
                installed_version TEXT,
                latest_version TEXT NOT NULL DEFAULT '',
                download_url TEXT NOT NULL DEFAULT '',
                game_version TEXT NOT NULL DEFAULT '',
                thumbnail_url TEXT NOT NULL DEFAULT '',
                external_url TEXT NOT NULL DEFAULT '',
                channel TEXT NOT NULL DEFAULT 'stable',
                auto_update INTEGER NOT NULL DEFAULT 0,
                is_ignored INTEGER NOT NULL DEFAULT 0,
                installed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_addons_client ON addons(client_type);
            CREATE INDEX IF NOT EXISTS idx_addons_folder ON addons(client_type, folder_name);

            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
            )
            .context("Failed to create tables")?;

        Ok(())
    }

    /// Insert a new addon, returning it with the assigned row id
    pub fn insert_addon(&self, addon: &Addon) -> Result<Addon> {
        self.conn.execute(
            "INSERT INTO addons (name, author, client_type, external_id, folder_name,
                installed_folders, installed_version, latest_version, download_url,
                game_version, thumbnail_url, external_url, channel, auto_update,
                is_ignored, installed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                addon.name,
                addon.author,
                addon.client_type.token(),
                addon.external_id,
                addon.folder_name,
                addon.installed_folders.join(","),
                addon.installed_version,
                addon.latest_version,
                addon.download_url,
                addon.game_version,
                addon.thumbnail_url,
                addon.external_url,
                addon.channel.as_str(),
                addon.auto_update,
                addon.is_ignored,
                addon.installed_at.map(|at| at.to_rfc3339()),
            ],
        )?;

        let mut saved = addon.clone();
        saved.id = self.conn.last_insert_rowid();
        Ok(saved)
    }

    /// Update every mutable field of an existing addon
    pub fn update_addon(&self, addon: &Addon) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE addons SET name = ?2, author = ?3, client_type = ?4, external_id = ?5,
                folder_name = ?6, installed_folders = ?7, installed_version = ?8,
                latest_version = ?9, download_url = ?10, game_version = ?11,
                thumbnail_url = ?12, external_url = ?13, channel = ?14,
                auto_update = ?15, is_ignored = ?16, installed_at = ?17
             WHERE id = ?1",
            params![
                addon.id,
                addon.name,
                addon.author,
                addon.client_type.token(),
                addon.external_id,
                addon.folder_name,
                addon.installed_folders.join(","),
                addon.installed_version,
                addon.latest_version,
                addon.download_url,
                addon.game_version,
                addon.thumbnail_url,
                addon.external_url,
                addon.channel.as_str(),
                addon.auto_update,
                addon.is_ignored,
                addon.installed_at.map(|at| at.to_rfc3339()),
            ],
        )?;
        anyhow::ensure!(changed == 1, "no addon row with id {}", addon.id);
        Ok(())
    }

    /// Delete an addon row
    pub fn delete_addon(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM addons WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Get one addon by row id
    pub fn get_addon(&self, id: i64) -> Result<Option<Addon>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ADDON_COLUMNS} FROM addons WHERE id = ?1"
        ))?;

        let result = stmt.query_row([id], addon_from_row);
        match result {
            Ok(addon) => Ok(Some(addon)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to query addon"),
        }
    }

    /// Find an addon by folder name within one client installation
    pub fn get_addon_by_folder(
        &self,
        client_type: ClientType,
        folder_name: &str,
    ) -> Result<Option<Addon>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ADDON_COLUMNS} FROM addons WHERE client_type = ?1 AND folder_name = ?2"
        ))?;

        let result = stmt.query_row(params![client_type.token(), folder_name], addon_from_row);
        match result {
            Ok(addon) => Ok(Some(addon)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to query addon"),
        }
    }

    /// List all addons tracked for one client installation
    pub fn list_addons(&self, client_type: ClientType) -> Result<Vec<Addon>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ADDON_COLUMNS} FROM addons WHERE client_type = ?1 ORDER BY name"
        ))?;

        let rows = stmt.query_map([client_type.token()], addon_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Store a preference value
    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Get a preference value
    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM preferences WHERE key = ?1")?;

        let result = stmt.query_row([key], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to query preference"),
        }
    }
}

const ADDON_COLUMNS: &str = "id, name, author, client_type, external_id, folder_name, \
     installed_folders, installed_version, latest_version, download_url, game_version, \
     thumbnail_url, external_url, channel, auto_update, is_ignored, installed_at";

fn addon_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Addon> {
    let client_token: String = row.get(3)?;
    let folders: String = row.get(6)?;
    let channel: String = row.get(13)?;
    let installed_at: Option<String> = row.get(16)?;

    Ok(Addon {
        id: row.get(0)?,
        name: row.get(1)?,
        author: row.get(2)?,
        client_type: ClientType::from_token(&client_token),
        external_id: row.get(4)?,
        folder_name: row.get(5)?,
        installed_folders: folders
            .split(',')
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
        installed_version: row.get(7)?,
        latest_version: row.get(8)?,
        download_url: row.get(9)?,
        game_version: row.get(10)?,
        thumbnail_url: row.get(11)?,
        external_url: row.get(12)?,
        channel: ChannelType::from_str_lossy(&channel),
        auto_update: row.get(14)?,
        is_ignored: row.get(15)?,
        installed_at: installed_at
            .as_deref()
            .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
            .map(|at| at.with_timezone(&Utc)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_addon(folder: &str, client_type: ClientType) -> Addon {
        Addon {
            id: 0,
            name: format!("{folder} Addon"),
            author: "Someone".into(),
            client_type,
            external_id: Some(42),
            folder_name: folder.into(),
            installed_folders: vec![folder.into(), format!("{folder}_Options")],
            installed_version: Some("1.0".into()),
            latest_version: "1.1".into(),
            download_url: "https://example.test/file.zip".into(),
            game_version: "9.0.2".into(),
            thumbnail_url: String::new(),
            external_url: String::new(),
            channel: ChannelType::Beta,
            auto_update: true,
            is_ignored: false,
            installed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn addons_round_trip() {
        let store = AddonStore::in_memory().unwrap();
        let saved = store
            .insert_addon(&sample_addon("Demo", ClientType::Retail))
            .unwrap();
        assert!(saved.id > 0);

        let loaded = store.get_addon(saved.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Demo Addon");
        assert_eq!(loaded.client_type, ClientType::Retail);
        assert_eq!(loaded.installed_folders, vec!["Demo", "Demo_Options"]);
        assert_eq!(loaded.channel, ChannelType::Beta);
        assert!(loaded.auto_update);
        assert!(loaded.installed_at.is_some());
    }

    #[test]
    fn listing_is_scoped_to_the_client() {
        let store = AddonStore::in_memory().unwrap();
        store
            .insert_addon(&sample_addon("RetailOnly", ClientType::Retail))
            .unwrap();
        store
            .insert_addon(&sample_addon("ClassicOnly", ClientType::Classic))
            .unwrap();

        let retail = store.list_addons(ClientType::Retail).unwrap();
        assert_eq!(retail.len(), 1);
        assert_eq!(retail[0].folder_name, "RetailOnly");
    }

    #[test]
    fn updates_persist() {
        let store = AddonStore::in_memory().unwrap();
        let mut saved = store
            .insert_addon(&sample_addon("Demo", ClientType::Retail))
            .unwrap();

        saved.installed_version = Some("1.1".into());
        saved.is_ignored = true;
        store.update_addon(&saved).unwrap();

        let loaded = store.get_addon(saved.id).unwrap().unwrap();
        assert_eq!(loaded.installed_version.as_deref(), Some("1.1"));
        assert!(loaded.is_ignored);
    }

    #[test]
    fn updating_a_missing_row_is_an_error() {
        let store = AddonStore::in_memory().unwrap();
        let mut ghost = sample_addon("Ghost", ClientType::Retail);
        ghost.id = 999;
        assert!(store.update_addon(&ghost).is_err());
    }

    #[test]
    fn delete_then_lookup_by_folder() {
        let store = AddonStore::in_memory().unwrap();
        let saved = store
            .insert_addon(&sample_addon("Demo", ClientType::Retail))
            .unwrap();

        assert!(store
            .get_addon_by_folder(ClientType::Retail, "Demo")
            .unwrap()
            .is_some());
        store.delete_addon(saved.id).unwrap();
        assert!(store
            .get_addon_by_folder(ClientType::Retail, "Demo")
            .unwrap()
            .is_none());
    }

    #[test]
    fn preferences_round_trip_and_overwrite() {
        let store = AddonStore::in_memory().unwrap();
        assert!(store.get_preference("wow_retail_location").unwrap().is_none());

        store
            .set_preference("wow_retail_location", "/games/wow/_retail_")
            .unwrap();
        assert_eq!(
            store.get_preference("wow_retail_location").unwrap().as_deref(),
            Some("/games/wow/_retail_")
        );

        store
            .set_preference("wow_retail_location", "/mnt/wow/_retail_")
            .unwrap();
        assert_eq!(
            store.get_preference("wow_retail_location").unwrap().as_deref(),
            Some("/mnt/wow/_retail_")
        );
    }
}
