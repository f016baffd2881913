//! macOS locator: the launcher lives at one well-known shared path.

use super::{InstallLocator, PRODUCT_DB_NAME};
use crate::client::ClientType;
use std::path::{Path, PathBuf};
use tracing::debug;

const AGENT_PATH: &str = "/Users/Shared/Battle.net/Agent";

#[derive(Debug)]
pub struct MacLocator;

impl InstallLocator for MacLocator {
    fn locate_registry(&self) -> Option<PathBuf> {
        let candidate = Path::new(AGENT_PATH).join(PRODUCT_DB_NAME);
        if candidate.is_file() {
            Some(candidate)
        } else {
            debug!("no launcher registry at {}", candidate.display());
            None
        }
    }

    fn executable_name(&self, client_type: ClientType) -> &'static str {
        match client_type {
            ClientType::Retail => "World of Warcraft.app",
            ClientType::Classic => "World of Warcraft Classic.app",
            ClientType::RetailPtr => "World of Warcraft Test.app",
            ClientType::ClassicPtr => "World of Warcraft Classic Test.app",
            ClientType::Beta => "World of Warcraft Beta.app",
            ClientType::None => "",
        }
    }
}
