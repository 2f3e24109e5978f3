//! Posterbox catalogue CLI.
//!
//! Backup and restore are deliberately manual operations: they run in their
//! own process against the persisted catalogue file, independent of live
//! request handling. This binary is the trigger.
//!
//! ## Environment variables
//!
//! - `POSTER_FILE`: persisted catalogue path (default: "poster.json")
//! - `BACKUP_REMOTE_URL`: remote repository URL (required for backup/restore)
//! - `BACKUP_BRANCH`: remote branch (default: "main")
//! - `BACKUP_WORKDIR`: working-copy directory (default: "tmp-backup")
//! - `BACKUP_FILE_NAME`: in-repo file name (default: the catalogue file name)
//! - `GITHUB_TOKEN`: access token for the remote (optional)
//! - `BACKUP_AUTHOR_NAME` / `BACKUP_AUTHOR_EMAIL`: commit author (optional)

use clap::{Parser, Subcommand};
use posterbox_core::constants::{DEFAULT_BACKUP_WORKDIR, DEFAULT_POSTER_FILE};
use posterbox_core::{BackupConfig, BackupService, CatalogStore, CoreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "posterbox")]
#[command(about = "Posterbox poster catalogue CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push the persisted catalogue to the backup repository
    Backup,
    /// Overwrite the persisted catalogue from the backup repository
    Restore,
    /// Print a user's poster links
    Show {
        /// Username whose links to print
        username: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("posterbox=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let core = Arc::new(core_config_from_env()?);

    match cli.command {
        Commands::Backup => {
            let service = BackupService::new(core, backup_config_from_env()?);
            if let Err(e) = service.backup() {
                tracing::error!("backup failed: {e}");
                std::process::exit(1);
            }
            println!("Backup pushed.");
        }
        Commands::Restore => {
            let service = BackupService::new(core, backup_config_from_env()?);
            if let Err(e) = service.restore() {
                tracing::error!("restore failed: {e}");
                std::process::exit(1);
            }
            println!("Catalogue restored.");
        }
        Commands::Show { username } => {
            let store = CatalogStore::load(core);
            let posters = store.user_posters(&username);
            if posters.is_empty() {
                println!("No posters for '{username}'.");
            } else {
                for (film, url) in posters {
                    println!("{film}: {url}");
                }
            }
        }
    }

    Ok(())
}

fn core_config_from_env() -> anyhow::Result<CoreConfig> {
    let poster_file =
        std::env::var("POSTER_FILE").unwrap_or_else(|_| DEFAULT_POSTER_FILE.into());
    Ok(CoreConfig::new(PathBuf::from(poster_file))?)
}

fn backup_config_from_env() -> anyhow::Result<BackupConfig> {
    let remote_url = std::env::var("BACKUP_REMOTE_URL")
        .map_err(|_| anyhow::anyhow!("BACKUP_REMOTE_URL must be set for backup/restore"))?;
    let workdir =
        std::env::var("BACKUP_WORKDIR").unwrap_or_else(|_| DEFAULT_BACKUP_WORKDIR.into());

    let mut cfg = BackupConfig::new(remote_url, PathBuf::from(workdir))?;

    if let Ok(branch) = std::env::var("BACKUP_BRANCH") {
        cfg = cfg.with_branch(branch)?;
    }
    if let Ok(file_name) = std::env::var("BACKUP_FILE_NAME") {
        cfg = cfg.with_file_name(file_name)?;
    }
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        cfg = cfg.with_token(token);
    }
    if let (Ok(name), Ok(email)) = (
        std::env::var("BACKUP_AUTHOR_NAME"),
        std::env::var("BACKUP_AUTHOR_EMAIL"),
    ) {
        cfg = cfg.with_author(name, email);
    }

    Ok(cfg)
}
