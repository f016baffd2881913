//! Reconciles local folder fingerprints against the remote match response.
//!
//! The matcher buckets every submitted fingerprint as exact, partial, or
//! unmatched. Exact hits bind directly. Partial hits carry several candidate
//! files; the resolver narrows them with the local per-file fingerprints and
//! the folder name, and when more than one candidate survives it reports
//! ambiguity rather than guessing.

use crate::catalog::{CatalogFile, FingerprintMatch, FingerprintMatchResponse};
use crate::fingerprint::FolderFingerprint;
use crate::scanner::{AddonFolder, FolderStatus};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of resolving one local folder.
#[derive(Debug, Clone, PartialEq)]
pub enum FolderResolution {
    /// Exactly one catalog file accounts for this folder.
    Matched(FingerprintMatch),
    /// Several candidates survived narrowing; the caller must not bind any.
    Ambiguous(Vec<FingerprintMatch>),
    /// No catalog identity for this folder.
    Unmatched,
}

impl FolderResolution {
    pub fn is_matched(&self) -> bool {
        matches!(self, FolderResolution::Matched(_))
    }
}

/// Resolves each scanned folder against a match response. Every folder gets
/// exactly one entry in the returned map, keyed by folder name.
pub fn resolve_folders(
    locals: &[FolderFingerprint],
    response: &FingerprintMatchResponse,
) -> HashMap<String, FolderResolution> {
    let mut results = HashMap::with_capacity(locals.len());
    for local in locals {
        let resolution = resolve_folder(local, response);
        debug!(
            folder = %local.folder_name,
            fingerprint = local.fingerprint,
            matched = resolution.is_matched(),
            "resolved folder"
        );
        results.insert(local.folder_name.clone(), resolution);
    }
    results
}

/// Folds resolutions back into scanned folders. A folder with no entry in
/// the map (its fingerprint scan failed) keeps its `Pending` status.
pub fn apply_to_folders(
    folders: &mut [AddonFolder],
    resolutions: &HashMap<String, FolderResolution>,
) {
    for folder in folders {
        if let Some(resolution) = resolutions.get(&folder.name) {
            folder.status = if resolution.is_matched() {
                FolderStatus::Matched
            } else {
                FolderStatus::Unmatched
            };
        }
    }
}

fn resolve_folder(
    local: &FolderFingerprint,
    response: &FingerprintMatchResponse,
) -> FolderResolution {
    if response.exact_fingerprints.contains(&local.fingerprint) {
        // The exact bucket carries the matched file for each exact
        // fingerprint; find the one whose module set names this fingerprint.
        for hit in &response.exact_matches {
            if hit
                .file
                .modules
                .iter()
                .any(|module| module.fingerprint == local.fingerprint)
            {
                return FolderResolution::Matched(hit.clone());
            }
        }
        // An exact fingerprint with no corresponding match entry means the
        // response is internally inconsistent; treat it as unmatched.
        debug!(
            fingerprint = local.fingerprint,
            "exact fingerprint has no match entry"
        );
        return FolderResolution::Unmatched;
    }

    let candidate_ids = response
        .partial_match_fingerprints
        .get(&local.fingerprint.to_string());
    let Some(candidate_ids) = candidate_ids else {
        return FolderResolution::Unmatched;
    };

    let candidates: Vec<&FingerprintMatch> = response
        .partial_matches
        .iter()
        .filter(|hit| candidate_ids.contains(&hit.file.id))
        .collect();
    if candidates.is_empty() {
        return FolderResolution::Unmatched;
    }

    // First narrowing pass: a real candidate's module fingerprints must
    // cover every per-file fingerprint the local folder produced.
    let covered: Vec<&FingerprintMatch> = candidates
        .iter()
        .copied()
        .filter(|hit| covers_local_files(&hit.file, local))
        .collect();
    let narrowed = if covered.is_empty() { candidates } else { covered };
    if let [only] = narrowed.as_slice() {
        return FolderResolution::Matched((*only).clone());
    }

    // Second pass: keep candidates that install a folder by this name.
    let named: Vec<&FingerprintMatch> = narrowed
        .iter()
        .copied()
        .filter(|hit| {
            hit.file
                .modules
                .iter()
                .any(|module| module.foldername.eq_ignore_ascii_case(&local.folder_name))
        })
        .collect();
    match named.as_slice() {
        [only] => FolderResolution::Matched((*only).clone()),
        [] => FolderResolution::Ambiguous(narrowed.into_iter().cloned().collect()),
        _ => FolderResolution::Ambiguous(named.into_iter().cloned().collect()),
    }
}

/// True when the candidate's declared module fingerprints include every
/// per-file fingerprint observed locally.
fn covers_local_files(file: &CatalogFile, local: &FolderFingerprint) -> bool {
    local.file_fingerprints.iter().all(|fp| {
        file.modules.iter().any(|module| module.fingerprint == *fp)
            || *fp == local.fingerprint
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogModule, ReleaseType};

    fn local(name: &str, fingerprint: u32, files: &[u32]) -> FolderFingerprint {
        FolderFingerprint {
            folder_name: name.to_string(),
            fingerprint,
            file_fingerprints: files.to_vec(),
        }
    }

    fn hit(addon_id: i64, file_id: i64, modules: &[(&str, u32)]) -> FingerprintMatch {
        FingerprintMatch {
            id: addon_id,
            file: CatalogFile {
                id: file_id,
                display_name: format!("file-{file_id}"),
                file_name: format!("Addon-{file_id}.zip"),
                release_type: ReleaseType::Release,
                download_url: String::new(),
                dependencies: Vec::new(),
                modules: modules
                    .iter()
                    .map(|(name, fp)| CatalogModule {
                        foldername: name.to_string(),
                        fingerprint: *fp,
                    })
                    .collect(),
                game_version: Vec::new(),
            },
        }
    }

    #[test]
    fn exact_fingerprints_bind_directly() {
        let exact = hit(1, 100, &[("DemoAddon", 42)]);
        let response = FingerprintMatchResponse {
            exact_matches: vec![exact.clone()],
            exact_fingerprints: vec![42],
            ..Default::default()
        };

        let results = resolve_folders(&[local("DemoAddon", 42, &[7])], &response);
        assert_eq!(results["DemoAddon"], FolderResolution::Matched(exact));
    }

    #[test]
    fn unmatched_fingerprints_stay_unmatched() {
        let response = FingerprintMatchResponse {
            unmatched_fingerprints: vec![9],
            ..Default::default()
        };
        let results = resolve_folders(&[local("Mystery", 9, &[])], &response);
        assert_eq!(results["Mystery"], FolderResolution::Unmatched);
    }

    #[test]
    fn partial_match_narrows_by_module_fingerprints() {
        // Two candidates; only one declares modules covering the local files.
        let covering = hit(2, 200, &[("DemoAddon", 11), ("DemoAddon_Options", 12)]);
        let other = hit(3, 201, &[("Unrelated", 99)]);
        let response = FingerprintMatchResponse {
            partial_matches: vec![covering.clone(), other],
            partial_match_fingerprints: [("77".to_string(), vec![200, 201])].into(),
            ..Default::default()
        };

        let results = resolve_folders(&[local("DemoAddon", 77, &[11, 12])], &response);
        assert_eq!(results["DemoAddon"], FolderResolution::Matched(covering));
    }

    #[test]
    fn partial_match_narrows_by_folder_name() {
        let named = hit(4, 300, &[("DemoAddon", 11)]);
        let other = hit(5, 301, &[("SomethingElse", 11)]);
        let response = FingerprintMatchResponse {
            partial_matches: vec![named.clone(), other],
            partial_match_fingerprints: [("88".to_string(), vec![300, 301])].into(),
            ..Default::default()
        };

        let results = resolve_folders(&[local("DemoAddon", 88, &[11])], &response);
        assert_eq!(results["DemoAddon"], FolderResolution::Matched(named));
    }

    #[test]
    fn unresolvable_partials_degrade_to_ambiguous() {
        // Both candidates cover the files and both name the folder, so the
        // resolver must refuse to pick one.
        let a = hit(6, 400, &[("DemoAddon", 11)]);
        let b = hit(7, 401, &[("DemoAddon", 11)]);
        let response = FingerprintMatchResponse {
            partial_matches: vec![a, b],
            partial_match_fingerprints: [("99".to_string(), vec![400, 401])].into(),
            ..Default::default()
        };

        let results = resolve_folders(&[local("DemoAddon", 99, &[11])], &response);
        match &results["DemoAddon"] {
            FolderResolution::Ambiguous(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn resolutions_fold_back_into_folder_status() {
        use crate::toc::Toc;
        use std::path::PathBuf;

        let folder = |name: &str| AddonFolder {
            name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{name}")),
            status: FolderStatus::Pending,
            toc: Toc::default(),
        };
        let mut folders = vec![folder("Known"), folder("Lost"), folder("Skipped")];

        let resolutions = HashMap::from([
            (
                "Known".to_string(),
                FolderResolution::Matched(hit(1, 100, &[("Known", 1)])),
            ),
            ("Lost".to_string(), FolderResolution::Unmatched),
        ]);
        apply_to_folders(&mut folders, &resolutions);

        assert_eq!(folders[0].status, FolderStatus::Matched);
        assert_eq!(folders[1].status, FolderStatus::Unmatched);
        // Absent from the map (scan failure): untouched.
        assert_eq!(folders[2].status, FolderStatus::Pending);
    }

    #[test]
    fn every_folder_resolves_to_exactly_one_outcome() {
        let response = FingerprintMatchResponse {
            exact_matches: vec![hit(8, 500, &[("Known", 1)])],
            exact_fingerprints: vec![1],
            unmatched_fingerprints: vec![2, 3],
            ..Default::default()
        };
        let locals = vec![
            local("Known", 1, &[]),
            local("Lost", 2, &[]),
            local("AlsoLost", 3, &[]),
        ];

        let results = resolve_folders(&locals, &response);
        assert_eq!(results.len(), locals.len());
        for folder in &locals {
            assert!(results.contains_key(&folder.folder_name));
        }
    }
}
