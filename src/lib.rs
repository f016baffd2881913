//! hearth - game addon manager core
//!
//! Finds installed game clients through the launcher's product registry,
//! inventories their addon folders, identifies them against a remote catalog
//! by content fingerprint, and manages install/update/remove lifecycles.
//! UI, IPC, and HTTP live in the embedding host; this crate is the engine.

pub mod addon;
pub mod catalog;
pub mod client;
pub mod fingerprint;
pub mod lifecycle;
pub mod locator;
pub mod pack;
pub mod registry;
pub mod scanner;
pub mod store;
pub mod toc;
