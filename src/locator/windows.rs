//! Windows locator: probes every mounted drive for the launcher registry.

use super::{InstallLocator, PRODUCT_DB_NAME};
use crate::client::ClientType;
use std::path::PathBuf;
use tracing::debug;

/// Fixed path of the launcher agent directory relative to a drive root.
const AGENT_RELATIVE_PATH: &str = "ProgramData/Battle.net/Agent";

#[derive(Debug)]
pub struct WindowsLocator;

impl WindowsLocator {
    /// Candidate registry paths, one per possible drive letter.
    fn candidate_paths() -> impl Iterator<Item = PathBuf> {
        ('A'..='Z').map(|drive| {
            PathBuf::from(format!("{drive}:/"))
                .join(AGENT_RELATIVE_PATH)
                .join(PRODUCT_DB_NAME)
        })
    }
}

impl InstallLocator for WindowsLocator {
    fn locate_registry(&self) -> Option<PathBuf> {
        for candidate in Self::candidate_paths() {
            debug!("probing for launcher registry at {}", candidate.display());
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        debug!("no launcher registry found on any drive");
        None
    }

    fn executable_name(&self, client_type: ClientType) -> &'static str {
        match client_type {
            ClientType::Retail => "Wow.exe",
            ClientType::Classic => "WowClassic.exe",
            ClientType::RetailPtr => "WowT.exe",
            ClientType::ClassicPtr => "WowClassicT.exe",
            ClientType::Beta => "WowB.exe",
            ClientType::None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_every_drive_letter() {
        let candidates: Vec<_> = WindowsLocator::candidate_paths().collect();
        assert_eq!(candidates.len(), 26);
        assert!(candidates[2].to_string_lossy().starts_with("C:/"));
        assert!(candidates
            .iter()
            .all(|p| p.to_string_lossy().ends_with(PRODUCT_DB_NAME)));
    }
}
