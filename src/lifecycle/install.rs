//! Install and update pipeline.
//!
//! One addon moves through `Pending → Downloading → BackingUp → Installing →
//! Complete` in strict order, reporting progress at each step. The archive is
//! fetched and extracted into a staging directory first, so anything that
//! fails before the final swap leaves the previously installed version fully
//! intact. Batch updates run sequentially and collect per-addon failures
//! instead of aborting.

use crate::addon::DisplayState;
use crate::catalog::{CatalogEntry, CatalogFile};
use crate::client::ClientType;
use crate::lifecycle::{AddonEvent, AddonService};
use crate::scanner;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Transient state of one install operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Pending,
    Downloading,
    BackingUp,
    Installing,
    Complete,
    Error,
}

impl InstallState {
    /// Progress percentage reported when this state is entered.
    pub fn progress(self) -> u8 {
        match self {
            InstallState::Pending => 0,
            InstallState::Downloading => 25,
            InstallState::BackingUp => 50,
            InstallState::Installing => 75,
            InstallState::Complete => 100,
            InstallState::Error => 0,
        }
    }
}

/// Produces the addon archive for a download URL. Network transport is the
/// host's concern; the core only needs a local file to extract.
pub trait ArchiveSource {
    fn fetch(&self, download_url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Source serving archives from a local directory, keyed by the URL's final
/// path segment. Used by the CLI and by tests.
pub struct LocalArchiveSource {
    root: PathBuf,
}

impl LocalArchiveSource {
    pub fn new(root: PathBuf) -> LocalArchiveSource {
        LocalArchiveSource { root }
    }
}

impl ArchiveSource for LocalArchiveSource {
    fn fetch(&self, download_url: &str, _dest_dir: &Path) -> Result<PathBuf> {
        let file_name = download_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .with_context(|| format!("no file name in download url {download_url}"))?;
        let path = self.root.join(file_name);
        if !path.is_file() {
            bail!("archive {} not found", path.display());
        }
        Ok(path)
    }
}

/// One failed addon from a batch update.
#[derive(Debug)]
pub struct UpdateFailure {
    pub addon_id: i64,
    pub name: String,
    pub error: anyhow::Error,
}

impl AddonService {
    /// Installs or updates one addon from a catalog file. Progress is
    /// reported through `on_progress` at every state transition.
    pub fn install_addon(
        &self,
        addon_id: i64,
        file: &CatalogFile,
        source: &dyn ArchiveSource,
        on_progress: &mut dyn FnMut(InstallState, u8),
    ) -> Result<()> {
        let result = self.install_inner(addon_id, file, source, on_progress);
        if result.is_err() {
            on_progress(InstallState::Error, InstallState::Error.progress());
        }
        result
    }

    fn install_inner(
        &self,
        addon_id: i64,
        file: &CatalogFile,
        source: &dyn ArchiveSource,
        on_progress: &mut dyn FnMut(InstallState, u8),
    ) -> Result<()> {
        let mut addon = self
            .store()
            .get_addon(addon_id)?
            .with_context(|| format!("no addon with id {addon_id}"))?;
        let root = self.require_location(addon.client_type)?;
        let addon_dir = scanner::addon_directory(&root);

        on_progress(InstallState::Pending, InstallState::Pending.progress());
        let staging = tempfile::tempdir().context("failed to create staging directory")?;

        on_progress(InstallState::Downloading, InstallState::Downloading.progress());
        let archive = source.fetch(&file.download_url, staging.path())?;

        on_progress(InstallState::BackingUp, InstallState::BackingUp.progress());
        if addon.installed_version.is_some() {
            if let Some(backup_dir) = &self.backup_dir {
                backup_folders(backup_dir, &addon.name, &addon.installed_folders, &addon_dir)?;
            }
        }

        on_progress(InstallState::Installing, InstallState::Installing.progress());
        let extract_dir = staging.path().join("extracted");
        std::fs::create_dir_all(&extract_dir)?;
        extract_zip(&archive, &extract_dir)?;
        let new_folders = top_level_dirs(&extract_dir)?;
        if new_folders.is_empty() {
            bail!("archive {} contains no addon folders", archive.display());
        }

        // Point of no return: the new version extracted cleanly, swap it in.
        for folder in &addon.installed_folders {
            let old = addon_dir.join(folder);
            if old.is_dir() {
                std::fs::remove_dir_all(&old)
                    .with_context(|| format!("failed to remove {}", old.display()))?;
            }
        }
        for folder in &new_folders {
            copy_dir(&extract_dir.join(folder), &addon_dir.join(folder))?;
        }

        let was_installed = addon.installed_version.is_some();
        addon.installed_version = Some(file.display_name.clone());
        addon.latest_version = file.display_name.clone();
        addon.download_url = file.download_url.clone();
        addon.installed_folders = new_folders;
        addon.installed_at = Some(Utc::now());
        self.store().update_addon(&addon)?;

        if was_installed {
            self.emit(AddonEvent::AddonUpdated { addon_id });
        } else {
            self.emit(AddonEvent::AddonInstalled { addon_id });
        }
        info!("installed {} {}", addon.name, file.display_name);

        on_progress(InstallState::Complete, InstallState::Complete.progress());
        Ok(())
    }

    /// Updates every addon with a pending update, one at a time. Failures
    /// are collected per addon; the rest of the batch still runs.
    pub fn update_all(
        &self,
        client_type: ClientType,
        entries: &[CatalogEntry],
        source: &dyn ArchiveSource,
        on_progress: &mut dyn FnMut(&str, InstallState, u8),
    ) -> Result<Vec<UpdateFailure>> {
        let addons = self.store().list_addons(client_type)?;
        let mut failures = Vec::new();

        for addon in addons {
            if addon.display_state() != DisplayState::Update {
                continue;
            }
            let Some(external_id) = addon.external_id else {
                continue;
            };
            let Some(entry) = entries.iter().find(|entry| entry.id == external_id) else {
                continue;
            };
            let Some(file) = entry.latest_file(addon.channel) else {
                continue;
            };

            let name = addon.name.clone();
            let mut report = |state: InstallState, progress: u8| on_progress(&name, state, progress);
            if let Err(error) = self.install_addon(addon.id, file, source, &mut report) {
                warn!("update of {} failed: {error:#}", addon.name);
                failures.push(UpdateFailure {
                    addon_id: addon.id,
                    name: addon.name,
                    error,
                });
            }
        }

        Ok(failures)
    }
}

/// Archives the currently installed folders into a timestamped zip.
fn backup_folders(
    backup_dir: &Path,
    addon_name: &str,
    folders: &[String],
    addon_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("failed to create {}", backup_dir.display()))?;

    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let safe_name: String = addon_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let zip_path = backup_dir.join(format!("{safe_name}-{stamp}.zip"));

    let out = File::create(&zip_path)
        .with_context(|| format!("failed to create backup {}", zip_path.display()))?;
    let mut zip = zip::ZipWriter::new(out);
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for folder in folders {
        let folder_path = addon_dir.join(folder);
        if !folder_path.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&folder_path).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(addon_dir)
                .context("backup entry outside the addon directory")?;
            zip.start_file(relative.to_string_lossy().replace('\\', "/"), options)?;
            let data = std::fs::read(entry.path())?;
            zip.write_all(&data)?;
        }
    }

    zip.finish()?;
    info!("backed up {addon_name} to {}", zip_path.display());
    Ok(())
}

fn extract_zip(archive_path: &Path, output_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader)
        .with_context(|| format!("failed to read archive {}", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        // Normalize path: Windows ZIPs have backslashes, convert to forward slashes
        let entry_path = entry.name().replace('\\', "/");
        // Entry names must stay relative: no root, no drive prefix, no `..`.
        let escapes = Path::new(&entry_path).components().any(|component| {
            matches!(
                component,
                Component::Prefix(_) | Component::RootDir | Component::ParentDir
            )
        });
        if escapes {
            bail!("archive entry {entry_path} escapes the extraction directory");
        }

        let dest = output_dir.join(&entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}

/// Names of the directories directly inside `dir`, sorted.
fn top_level_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("walked entry outside its root")?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy to {}", target.display()))?;
        }
    }
    Ok(())
}
