//! Addon folder scanner.
//!
//! Walks one installation's addon directory and produces an [`AddonFolder`]
//! per subdirectory that carries a manifest. A folder without a `.toc` is
//! not an addon and is skipped silently; a folder whose manifest fails to
//! parse is logged and skipped so one corrupt addon never blocks the rest
//! of the inventory.

use crate::toc::{self, Toc, TOC_EXTENSION};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Two-level subpath under an installation root holding addon folders.
const INTERFACE_FOLDER: &str = "Interface";
const ADDONS_FOLDER: &str = "AddOns";

/// Match status of a scanned folder, filled in by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    /// Scanned, not yet reconciled against the catalog.
    Pending,
    /// Bound to a remote catalog identity.
    Matched,
    /// No remote identity (or unresolved ambiguity).
    Unmatched,
}

/// One candidate addon folder inside an installation's addon directory.
#[derive(Debug, Clone)]
pub struct AddonFolder {
    /// Directory name, the folder's identity within a scan.
    pub name: String,
    pub path: PathBuf,
    pub status: FolderStatus,
    /// Parsed manifest metadata.
    pub toc: Toc,
}

/// Resolves the addon directory for an installation root.
pub fn addon_directory(install_root: &Path) -> PathBuf {
    install_root.join(INTERFACE_FOLDER).join(ADDONS_FOLDER)
}

/// Lists all addon folders under `addon_dir`.
///
/// A missing directory yields an empty list: a client with no addons
/// installed has no `AddOns` folder at all.
pub fn list_addon_folders(addon_dir: &Path) -> Result<Vec<AddonFolder>> {
    if !addon_dir.is_dir() {
        debug!("addon directory does not exist: {}", addon_dir.display());
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();
    let entries = std::fs::read_dir(addon_dir)
        .with_context(|| format!("failed to list {}", addon_dir.display()))?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable directory entry: {err:#}");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        match read_addon_folder(&path) {
            Ok(Some(folder)) => folders.push(folder),
            Ok(None) => debug!("no manifest in {}, not an addon", path.display()),
            Err(err) => warn!("skipping {}: {err:#}", path.display()),
        }
    }

    Ok(folders)
}

/// Reads one candidate folder. `None` means "not an addon" (no manifest).
fn read_addon_folder(dir: &Path) -> Result<Option<AddonFolder>> {
    let Some(toc_path) = find_manifest(dir)? else {
        return Ok(None);
    };

    let toc = toc::parse_file(&toc_path)?;
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Some(AddonFolder {
        name,
        path: dir.to_path_buf(),
        status: FolderStatus::Pending,
        toc,
    }))
}

/// First file with the manifest extension directly inside `dir`.
fn find_manifest(dir: &Path) -> Result<Option<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(TOC_EXTENSION))
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
