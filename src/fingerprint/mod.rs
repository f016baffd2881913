//! Content fingerprinting for addon folders.
//!
//! A folder's fingerprint is derived only from the files the game actually
//! loads: the folder's own `.toc`, its `Bindings.xml`, and everything those
//! pull in transitively via include directives. Each file is hashed with
//! whitespace normalization, the per-file hashes are sorted, and the overall
//! fingerprint is the hash of their concatenated decimal strings. This is
//! what lets an unlabeled local folder be identified against the remote
//! catalog with no stored name or id.

pub mod hash;
pub mod resolver;

use crate::scanner::AddonFolder;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Fingerprint material for one local addon folder.
#[derive(Debug, Clone)]
pub struct FolderFingerprint {
    /// Directory name, the keying identity downstream.
    pub folder_name: String,
    /// Overall folder fingerprint submitted to the remote matcher.
    pub fingerprint: u32,
    /// Sorted per-file fingerprints, the auxiliary signal for partial-match
    /// disambiguation.
    pub file_fingerprints: Vec<u32>,
}

/// Fingerprints a batch of scanned folders. Per-folder failures are logged
/// and skipped; one unreadable folder never aborts the batch.
pub fn scan_folders(folders: &[AddonFolder]) -> Vec<FolderFingerprint> {
    let mut results = Vec::with_capacity(folders.len());
    for folder in folders {
        match scan_folder(&folder.path) {
            Ok(print) => results.push(print),
            Err(err) => warn!("failed to fingerprint {}: {err:#}", folder.name),
        }
    }
    results
}

/// Fingerprints a single addon folder.
pub fn scan_folder(folder: &Path) -> Result<FolderFingerprint> {
    let folder_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Keyed by lowercased path so discovery order and filesystem case never
    // change the fingerprint. BTreeMap keeps the set sorted.
    let mut matching: BTreeMap<String, PathBuf> = BTreeMap::new();

    if let Some(bindings) = find_direct_child(folder, "bindings.xml")? {
        matching.insert(lowercase_key(&bindings), bindings);
    }

    let root_toc = find_direct_child(folder, &format!("{}.toc", folder_name.to_lowercase()))?;
    if let Some(toc) = root_toc {
        process_include_file(&mut matching, &toc)?;
    }

    let mut file_fingerprints = Vec::with_capacity(matching.len());
    for path in matching.values() {
        file_fingerprints.push(hash::normalized_file_hash(path)?);
    }
    file_fingerprints.sort_unstable();

    let concat: String = file_fingerprints
        .iter()
        .map(|fp| fp.to_string())
        .collect();
    let fingerprint = hash::compute_hash(concat.as_bytes(), false);

    Ok(FolderFingerprint {
        folder_name,
        fingerprint,
        file_fingerprints,
    })
}

fn lowercase_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Finds a direct child of `dir` by lowercase file name.
fn find_direct_child(dir: &Path, lower_name: &str) -> Result<Option<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && path.file_name().is_some_and(|n| n.to_string_lossy().to_lowercase() == lower_name) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Adds `file` to the matching set, then follows its include directives.
/// Include scanning only applies to toc and xml files; lua files are leaf
/// content.
fn process_include_file(matching: &mut BTreeMap<String, PathBuf>, file: &Path) -> Result<()> {
    let key = lowercase_key(file);
    if !file.is_file() || matching.contains_key(&key) {
        return Ok(());
    }
    matching.insert(key, file.to_path_buf());

    let extension = file
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if extension != "toc" && extension != "xml" {
        return Ok(());
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let content = strip_comments(&extension, &content);

    let parent = file.parent().unwrap_or(Path::new(""));
    for include in include_paths(&extension, &content) {
        // Parent-relative escapes are rejected, matching the matcher's rules.
        if include.contains("..") {
            continue;
        }
        let resolved = parent.join(include.replace('\\', "/"));
        process_include_file(matching, &resolved)?;
    }
    Ok(())
}

fn strip_comments(extension: &str, content: &str) -> String {
    let pattern = match extension {
        "toc" => r"(?m)\s*#.*$",
        "xml" => r"(?s)<!--.*?-->",
        _ => return content.to_string(),
    };
    Regex::new(pattern)
        .expect("comment pattern is valid")
        .replace_all(content, "")
        .into_owned()
}

fn include_paths(extension: &str, content: &str) -> Vec<String> {
    let pattern = match extension {
        "toc" => r"(?mi)^\s*(.+?\.(?:xml|lua))\s*$",
        "xml" => r#"(?i)<(?:Include|Script)\s+file=["']([^"']+)["']\s*/>"#,
        _ => return Vec::new(),
    };
    Regex::new(pattern)
        .expect("include pattern is valid")
        .captures_iter(content)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}
