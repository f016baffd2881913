//! Platform-specific installation locators.
//!
//! A locator knows two things about the host OS: where the launcher keeps
//! its product registry, and what the game executable is called for each
//! client type. One implementation exists per supported OS; the variant is
//! chosen once at startup and held as a resolved instance, never
//! re-dispatched per call.

pub mod macos;
pub mod windows;

use crate::client::ClientType;
use std::path::PathBuf;

pub use macos::MacLocator;
pub use windows::WindowsLocator;

/// Name of the launcher registry file, identical on every platform.
pub const PRODUCT_DB_NAME: &str = "product.db";

/// Capability set a platform must provide.
pub trait InstallLocator: Send + Sync + std::fmt::Debug {
    /// Finds the product registry file. `None` means "not found", which is
    /// a normal state (launcher not installed), not an error.
    fn locate_registry(&self) -> Option<PathBuf>;

    /// Executable file name for a client type. Total over the enum: clients
    /// with no binary on this platform yield `""`.
    fn executable_name(&self, client_type: ClientType) -> &'static str;
}

/// Startup configuration errors. Unrecoverable: without a locator the whole
/// installation-management feature area is unusable.
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("no installation locator available for platform '{0}'")]
    UnsupportedPlatform(String),
}

/// Picks the locator for the running platform. Called once at startup.
pub fn for_current_platform() -> Result<Box<dyn InstallLocator>, LocatorError> {
    for_platform(std::env::consts::OS)
}

fn for_platform(os: &str) -> Result<Box<dyn InstallLocator>, LocatorError> {
    match os {
        "windows" => Ok(Box::new(WindowsLocator)),
        "macos" => Ok(Box::new(MacLocator)),
        other => Err(LocatorError::UnsupportedPlatform(other.to_string())),
    }
}
