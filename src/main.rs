//! hearth - game addon manager core
//!
//! Thin CLI over the library: product discovery, folder scans, fingerprint
//! resolution, and batch updates, with the catalog and match responses
//! supplied as JSON files (the HTTP layer lives in the embedding host).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth::catalog::{CatalogEntry, ChannelType, FingerprintMatchResponse};
use hearth::client::ClientType;
use hearth::fingerprint::{self, resolver};
use hearth::lifecycle::install::{InstallState, LocalArchiveSource};
use hearth::lifecycle::AddonService;
use hearth::locator;
use hearth::pack::{self, PackDefinition};
use hearth::store::AddonStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(version)]
#[command(about = "Game addon manager core - scans installations, fingerprints addon folders, applies updates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory (database, backups); defaults to the platform app-data dir
    #[arg(long, global = true, env = "HEARTH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Also write a daily log file into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescan the launcher product registry and list known installations
    Clients,

    /// List the addon folders of one client installation
    Scan {
        /// Client token (retail, classic, retail_ptr, classic_ptr, beta)
        client: String,
    },

    /// Print content fingerprints for one client's addon folders
    Fingerprint {
        client: String,
    },

    /// Resolve scanned folders against a fingerprint-match response
    Resolve {
        client: String,

        /// JSON file holding the match service response
        #[arg(long)]
        response: PathBuf,

        /// JSON file holding the catalog entries named by the response
        #[arg(long)]
        catalog: PathBuf,
    },

    /// List tracked addons and their display states
    Addons {
        client: String,
    },

    /// Toggle the ignore flag on a tracked addon
    Ignore {
        addon_id: i64,

        /// Clear the flag instead of setting it
        #[arg(long)]
        unset: bool,
    },

    /// Set the release channel of a tracked addon
    Channel {
        addon_id: i64,

        /// stable, beta, or alpha
        channel: String,
    },

    /// Stop tracking an addon
    Remove {
        addon_id: i64,

        /// Also delete its folders on disk
        #[arg(long)]
        delete_files: bool,
    },

    /// Update every addon with a newer catalog file
    UpdateAll {
        client: String,

        /// JSON file holding the catalog entries
        #[arg(long)]
        catalog: PathBuf,

        /// Directory holding the addon archives, keyed by file name
        #[arg(long)]
        archives: PathBuf,
    },

    /// Parse a pack definition file and show its contents
    Pack {
        pack_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "hearth=debug" } else { "hearth=warn" };
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);
    let _guard = match &cli.log_dir {
        Some(log_dir) => {
            let appender = tracing_appender::rolling::daily(log_dir, "hearth.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    };

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_local_dir()
            .context("no application data directory on this platform")?
            .join("hearth"),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let store = AddonStore::open(&data_dir.join("hearth.db"))?;
    let locator = locator::for_current_platform()?;
    let service = AddonService::new(store, locator).with_backup_dir(data_dir.join("backups"));

    match cli.command {
        Commands::Clients => {
            let products = service.scan_products()?;
            if products.is_empty() {
                println!("No installed products found.");
            }
            for product in &products {
                println!(
                    "{:<12} {:<24} {}",
                    product.client_type.display_name(),
                    product.name,
                    product.location.display()
                );
            }
        }

        Commands::Scan { client } => {
            let client_type = parse_client(&client)?;
            let folders = service.scan_folders(client_type)?;
            println!("{} addon folders:", folders.len());
            for folder in &folders {
                let title = if folder.toc.title.is_empty() {
                    folder.name.as_str()
                } else {
                    folder.toc.title.as_str()
                };
                println!("{:<32} {:<40} {}", folder.name, title, folder.toc.version);
            }
        }

        Commands::Fingerprint { client } => {
            let client_type = parse_client(&client)?;
            let folders = service.scan_folders(client_type)?;
            for print in fingerprint::scan_folders(&folders) {
                println!(
                    "{:<32} {:>10}  ({} files)",
                    print.folder_name,
                    print.fingerprint,
                    print.file_fingerprints.len()
                );
            }
        }

        Commands::Resolve {
            client,
            response,
            catalog,
        } => {
            let client_type = parse_client(&client)?;
            let response: FingerprintMatchResponse = read_json(&response)?;
            let entries: Vec<CatalogEntry> = read_json(&catalog)?;

            let mut folders = service.scan_folders(client_type)?;
            let prints = fingerprint::scan_folders(&folders);
            let resolutions = resolver::resolve_folders(&prints, &response);
            resolver::apply_to_folders(&mut folders, &resolutions);

            for folder in &folders {
                let detail = match resolutions.get(&folder.name) {
                    Some(resolver::FolderResolution::Matched(hit)) => {
                        format!("catalog entry {}", hit.id)
                    }
                    Some(resolver::FolderResolution::Ambiguous(candidates)) => {
                        format!("{} candidates", candidates.len())
                    }
                    _ => String::from("-"),
                };
                println!("{:<32} {:<10} {detail}", folder.name, format!("{:?}", folder.status));
            }

            service.reconcile(client_type, &resolutions, &entries)?;
            let addons = service.sync_latest(client_type, &entries)?;
            println!("\nTracking {} addons.", addons.len());
        }

        Commands::Addons { client } => {
            let client_type = parse_client(&client)?;
            for addon in service.store().list_addons(client_type)? {
                println!(
                    "{:<6} {:<32} {:<12} {:<12} {:?}",
                    addon.id,
                    addon.name,
                    addon.installed_version.as_deref().unwrap_or("-"),
                    if addon.latest_version.is_empty() {
                        "-"
                    } else {
                        addon.latest_version.as_str()
                    },
                    addon.display_state()
                );
            }
        }

        Commands::Ignore { addon_id, unset } => {
            let addon = service.set_ignored(addon_id, !unset)?;
            println!(
                "{} is now {}",
                addon.name,
                if addon.is_ignored { "ignored" } else { "tracked" }
            );
        }

        Commands::Channel { addon_id, channel } => {
            let channel = ChannelType::from_str_lossy(&channel);
            let addon = service.set_channel(addon_id, channel)?;
            println!("{} now follows the {channel} channel", addon.name);
        }

        Commands::Remove {
            addon_id,
            delete_files,
        } => {
            service.remove_addon(addon_id, delete_files)?;
            println!("Removed addon {addon_id}.");
        }

        Commands::UpdateAll {
            client,
            catalog,
            archives,
        } => {
            let client_type = parse_client(&client)?;
            let entries: Vec<CatalogEntry> = read_json(&catalog)?;
            let source = LocalArchiveSource::new(archives);

            service.sync_latest(client_type, &entries)?;

            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("{msg:<32} [{bar:40}] {percent:>3}%")?
                    .progress_chars("=> "),
            );
            let failures = service.update_all(
                client_type,
                &entries,
                &source,
                &mut |name, state, progress| {
                    bar.set_message(name.to_string());
                    bar.set_position(u64::from(progress));
                    if state == InstallState::Complete {
                        bar.println(format!("{name}: updated"));
                    }
                },
            )?;
            bar.finish_and_clear();

            if failures.is_empty() {
                println!("All addons up to date.");
            } else {
                println!("{} addons failed to update:", failures.len());
                for failure in &failures {
                    println!("  {}: {:#}", failure.name, failure.error);
                }
            }
        }

        Commands::Pack { pack_file } => {
            let text = std::fs::read_to_string(&pack_file)
                .with_context(|| format!("failed to read {}", pack_file.display()))?;
            let directives = pack::parse(&text)?;
            let definition = PackDefinition::from_directives(&directives);

            println!("Pack:    {} (id {})", definition.name, definition.id);
            println!(
                "Clients: {}",
                definition
                    .clients
                    .iter()
                    .map(|c| c.token())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("Addons:");
            for addon in &definition.addons {
                println!("  {} ({})", addon.external_id, addon.channel);
            }
        }
    }

    Ok(())
}

fn parse_client(token: &str) -> Result<ClientType> {
    let client_type = ClientType::from_token(token);
    anyhow::ensure!(
        client_type != ClientType::None,
        "unknown client token {token:?} (expected retail, classic, retail_ptr, classic_ptr, or beta)"
    );
    Ok(client_type)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
