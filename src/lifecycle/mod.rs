//! Addon lifecycle service.
//!
//! Ties the pieces together: product rescans feed the preference store,
//! folder scans plus fingerprint resolutions create and refresh `Addon`
//! records, and every state change is published on a broadcast channel so an
//! embedding UI can react. The service is a synchronous single writer; it
//! spawns no threads of its own.

pub mod install;

use crate::addon::Addon;
use crate::catalog::{CatalogEntry, ChannelType};
use crate::client::ClientType;
use crate::fingerprint::resolver::FolderResolution;
use crate::locator::InstallLocator;
use crate::registry::{self, InstalledProduct};
use crate::scanner::{self, AddonFolder};
use crate::store::AddonStore;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// State-change notifications published by the service.
#[derive(Debug, Clone)]
pub enum AddonEvent {
    /// A product rescan found a new or moved installation.
    ProductChanged {
        client_type: ClientType,
        location: PathBuf,
    },
    AddonInstalled { addon_id: i64 },
    AddonUpdated { addon_id: i64 },
    AddonRemoved { addon_id: i64 },
}

pub struct AddonService {
    store: AddonStore,
    locator: Box<dyn InstallLocator>,
    /// Where replaced addon versions are archived before an update.
    backup_dir: Option<PathBuf>,
    events: broadcast::Sender<AddonEvent>,
}

impl AddonService {
    pub fn new(store: AddonStore, locator: Box<dyn InstallLocator>) -> AddonService {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        AddonService {
            store,
            locator,
            backup_dir: None,
            events,
        }
    }

    /// Enables pre-update backups into `dir`.
    pub fn with_backup_dir(mut self, dir: PathBuf) -> AddonService {
        self.backup_dir = Some(dir);
        self
    }

    /// New subscription to the event stream. Slow consumers may observe
    /// `Lagged`; events are notifications, not a ledger.
    pub fn subscribe(&self) -> broadcast::Receiver<AddonEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &AddonStore {
        &self.store
    }

    fn emit(&self, event: AddonEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.events.send(event);
    }

    /// Rescans the launcher's product registry and records each discovered
    /// installation location. An absent or unreadable registry is not an
    /// error; the user may not have the launcher installed at all.
    pub fn scan_products(&self) -> Result<Vec<InstalledProduct>> {
        let Some(registry_path) = self.locator.locate_registry() else {
            info!("no product registry found on this system");
            return Ok(Vec::new());
        };

        let bytes = match std::fs::read(&registry_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    "failed to read product registry {}: {err}",
                    registry_path.display()
                );
                return Ok(Vec::new());
            }
        };

        let products = match registry::installed_products(&bytes) {
            Ok(products) => products,
            Err(err) => {
                warn!("failed to decode product registry: {err:#}");
                return Ok(Vec::new());
            }
        };

        for product in &products {
            if product.client_type == ClientType::None {
                debug!("skipping unrecognized client folder for {}", product.name);
                continue;
            }
            self.record_product_location(product)?;
        }

        Ok(products)
    }

    /// Stores a product's location, overwriting only when the normalized
    /// path actually differs from what is already recorded.
    fn record_product_location(&self, product: &InstalledProduct) -> Result<()> {
        let key = product.client_type.location_preference_key();
        let location = normalize_path(&product.location);
        let stored = self.store.get_preference(key)?;

        if stored.as_deref().map(normalize_path_str) == Some(location.clone()) {
            return Ok(());
        }

        info!(
            "recording {} installation at {location}",
            product.client_type
        );
        self.store.set_preference(key, &location)?;
        self.emit(AddonEvent::ProductChanged {
            client_type: product.client_type,
            location: PathBuf::from(&location),
        });
        Ok(())
    }

    /// The recorded installation root for a client, if any.
    pub fn client_location(&self, client_type: ClientType) -> Result<Option<PathBuf>> {
        let key = client_type.location_preference_key();
        Ok(self.store.get_preference(key)?.map(PathBuf::from))
    }

    fn require_location(&self, client_type: ClientType) -> Result<PathBuf> {
        match self.client_location(client_type)? {
            Some(location) => Ok(location),
            None => bail!("no installation location recorded for {client_type}"),
        }
    }

    /// Scans the addon folders of one client installation.
    pub fn scan_folders(&self, client_type: ClientType) -> Result<Vec<AddonFolder>> {
        let root = self.require_location(client_type)?;
        scanner::list_addon_folders(&scanner::addon_directory(&root))
    }

    /// Applies fingerprint resolutions: a matched folder with no record gets
    /// one; a matched folder with a record has its catalog binding refreshed.
    /// Ambiguous and unmatched folders are left for manual association.
    pub fn reconcile(
        &self,
        client_type: ClientType,
        resolutions: &HashMap<String, FolderResolution>,
        entries: &[CatalogEntry],
    ) -> Result<Vec<Addon>> {
        for (folder_name, resolution) in resolutions {
            match resolution {
                FolderResolution::Matched(hit) => {
                    let Some(entry) = entries.iter().find(|entry| entry.id == hit.id) else {
                        warn!("match for {folder_name} names unknown catalog entry {}", hit.id);
                        continue;
                    };
                    match self.store.get_addon_by_folder(client_type, folder_name)? {
                        Some(mut existing) => {
                            existing.external_id = Some(entry.id);
                            existing.installed_folders = hit.file.folder_names();
                            existing.external_url = entry.website_url.clone();
                            existing.thumbnail_url = entry.thumbnail_url.clone();
                            self.store.update_addon(&existing)?;
                        }
                        None => {
                            let addon = Addon::from_catalog(entry, &hit.file, folder_name, client_type);
                            let saved = self.store.insert_addon(&addon)?;
                            debug!("tracking {} from folder {folder_name}", saved.name);
                        }
                    }
                }
                FolderResolution::Ambiguous(candidates) => {
                    info!(
                        "{folder_name} is ambiguous between {} candidates, leaving unresolved",
                        candidates.len()
                    );
                }
                FolderResolution::Unmatched => {
                    debug!("{folder_name} has no catalog identity");
                }
            }
        }

        self.store.list_addons(client_type)
    }

    /// Refreshes each tracked addon's latest-version fields from catalog
    /// entries, honoring the addon's release channel.
    pub fn sync_latest(
        &self,
        client_type: ClientType,
        entries: &[CatalogEntry],
    ) -> Result<Vec<Addon>> {
        let mut addons = self.store.list_addons(client_type)?;
        for addon in &mut addons {
            let Some(external_id) = addon.external_id else {
                continue;
            };
            let Some(entry) = entries.iter().find(|entry| entry.id == external_id) else {
                continue;
            };
            let Some(latest) = entry.latest_file(addon.channel) else {
                debug!("{} has no file for channel {}", addon.name, addon.channel);
                continue;
            };

            if addon.latest_version != latest.display_name
                || addon.download_url != latest.download_url
            {
                addon.latest_version = latest.display_name.clone();
                addon.download_url = latest.download_url.clone();
                addon.game_version = latest.game_version.first().cloned().unwrap_or_default();
                self.store.update_addon(addon)?;
            }
        }
        Ok(addons)
    }

    /// Tracks a folder the resolver could not identify. The record carries
    /// no catalog identity, so it never auto-updates.
    pub fn register_untracked(
        &self,
        client_type: ClientType,
        folder: &AddonFolder,
    ) -> Result<Addon> {
        let name = if folder.toc.title.is_empty() {
            folder.name.clone()
        } else {
            folder.toc.title.clone()
        };
        let addon = Addon {
            id: 0,
            name,
            author: folder.toc.author.clone(),
            client_type,
            external_id: None,
            folder_name: folder.name.clone(),
            installed_folders: vec![folder.name.clone()],
            installed_version: Some(folder.toc.version.clone()),
            latest_version: String::new(),
            download_url: String::new(),
            game_version: folder.toc.interface.clone(),
            thumbnail_url: String::new(),
            external_url: folder.toc.website.clone(),
            channel: ChannelType::Stable,
            auto_update: false,
            is_ignored: false,
            installed_at: None,
        };
        let saved = self.store.insert_addon(&addon)?;
        self.emit(AddonEvent::AddonInstalled { addon_id: saved.id });
        Ok(saved)
    }

    pub fn set_ignored(&self, addon_id: i64, ignored: bool) -> Result<Addon> {
        self.mutate_addon(addon_id, |addon| addon.is_ignored = ignored)
    }

    pub fn set_channel(&self, addon_id: i64, channel: ChannelType) -> Result<Addon> {
        self.mutate_addon(addon_id, |addon| addon.channel = channel)
    }

    pub fn set_auto_update(&self, addon_id: i64, auto_update: bool) -> Result<Addon> {
        self.mutate_addon(addon_id, |addon| addon.auto_update = auto_update)
    }

    fn mutate_addon(&self, addon_id: i64, apply: impl FnOnce(&mut Addon)) -> Result<Addon> {
        let mut addon = self
            .store
            .get_addon(addon_id)?
            .with_context(|| format!("no addon with id {addon_id}"))?;
        apply(&mut addon);
        self.store.update_addon(&addon)?;
        Ok(addon)
    }

    /// Deletes the addon record. On-disk folders are removed only when
    /// `delete_files` is set; by default removal just stops tracking.
    pub fn remove_addon(&self, addon_id: i64, delete_files: bool) -> Result<()> {
        let addon = self
            .store
            .get_addon(addon_id)?
            .with_context(|| format!("no addon with id {addon_id}"))?;

        if delete_files {
            let root = self.require_location(addon.client_type)?;
            let addon_dir = scanner::addon_directory(&root);
            for folder in &addon.installed_folders {
                let path = addon_dir.join(folder);
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)
                        .with_context(|| format!("failed to delete {}", path.display()))?;
                }
            }
        }

        self.store.delete_addon(addon_id)?;
        self.emit(AddonEvent::AddonRemoved { addon_id });
        info!("removed {} (files deleted: {delete_files})", addon.name);
        Ok(())
    }
}

fn normalize_path(path: &Path) -> String {
    normalize_path_str(&path.to_string_lossy())
}

/// Forward slashes, no trailing separator. Used only for change detection
/// on stored locations, never for filesystem access.
fn normalize_path_str(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_string()
}
