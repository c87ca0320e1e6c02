use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use drive_core::{Credential, DriveClient};
use drivesync::config::SyncConfig;
use drivesync::credentials::{Authorizer, TokenStore};
use drivesync::selection::{SelectedFolder, SelectionStore, folder_by_name};
use drivesync::sync::{DriveRemote, Exclusions, FsTree, SyncEngine, SyncReport};

#[derive(Debug, Parser)]
#[command(name = "drivesync", version, about = "Mirror a local folder into Google Drive")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// List every folder in the Drive account
    #[command(alias = "drivefolderlist")]
    Folders,
    /// Pick the Drive folder that `sync` uploads into
    #[command(alias = "selectdrivefolder")]
    Select,
    /// Mirror a local directory into the selected Drive folder
    Sync {
        local_path: PathBuf,
        /// Destination folder name, overriding the stored selection
        #[arg(long)]
        folder: Option<String>,
    },
    /// Remove the saved OAuth token
    Logout {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SyncConfig::from_env()?;
    match cli.command {
        Command::Folders => list_folders(&config).await,
        Command::Select => select_folder(&config).await,
        Command::Sync { local_path, folder } => {
            sync_folder(&config, &local_path, folder.as_deref()).await
        }
        Command::Logout { yes } => logout(&config, yes).await,
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("drivesync={level},drive_core={level}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect(config: &SyncConfig) -> anyhow::Result<(DriveClient, Credential)> {
    let authorizer = Authorizer::new(
        &config.client_secret_path,
        TokenStore::new(&config.token_path),
    );
    let credential = authorizer
        .credential()
        .await
        .context("failed to obtain Google Drive credentials")?;
    let client = match config.api_base_url.as_deref() {
        Some(base_url) => DriveClient::with_base_url(base_url)?,
        None => DriveClient::new()?,
    };
    Ok((client, credential))
}

async fn list_folders(config: &SyncConfig) -> anyhow::Result<()> {
    let (client, credential) = connect(config).await?;
    let folders = client.list_folders(&credential).await?;
    if folders.is_empty() {
        println!("No folders found.");
        return Ok(());
    }
    for folder in folders {
        println!("{} ({})", folder.name, folder.id);
    }
    Ok(())
}

async fn select_folder(config: &SyncConfig) -> anyhow::Result<()> {
    let (client, credential) = connect(config).await?;
    let selected = prompt_for_folder(&client, &credential).await?;
    SelectionStore::new(&config.selection_path)
        .save(&selected)
        .await?;
    println!("Selected folder: {} ({})", selected.name, selected.id);
    Ok(())
}

async fn prompt_for_folder(
    client: &DriveClient,
    credential: &Credential,
) -> anyhow::Result<SelectedFolder> {
    let folders = client.list_folders(credential).await?;
    anyhow::ensure!(!folders.is_empty(), "no folders found in Google Drive");
    let labels: Vec<_> = folders
        .iter()
        .map(|folder| format!("{} ({})", folder.name, folder.id))
        .collect();
    let index = Select::new()
        .with_prompt("Select a Google Drive folder")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(SelectedFolder::from(&folders[index]))
}

async fn sync_folder(
    config: &SyncConfig,
    local_path: &Path,
    folder: Option<&str>,
) -> anyhow::Result<()> {
    let local_path = std::fs::canonicalize(local_path)
        .with_context(|| format!("cannot resolve {}", local_path.display()))?;
    anyhow::ensure!(
        local_path.is_dir(),
        "{} is not a directory",
        local_path.display()
    );

    let (client, credential) = connect(config).await?;
    let destination = match folder {
        Some(name) => {
            let folders = client.list_folders(&credential).await?;
            folder_by_name(&folders, name)
                .with_context(|| format!("folder '{name}' not found in Google Drive"))?
        }
        None => {
            let store = SelectionStore::new(&config.selection_path);
            match store.load().await? {
                Some(selected) => selected,
                None => {
                    let selected = prompt_for_folder(&client, &credential).await?;
                    store.save(&selected).await?;
                    selected
                }
            }
        }
    };

    let engine = SyncEngine::new(
        FsTree,
        DriveRemote::new(client),
        Exclusions::new(config.exclude.iter().cloned()),
    );
    let report = engine
        .sync(&credential, &local_path, Some(&destination.id))
        .await?;
    println!(
        "Synced '{}' with '{}': {}",
        local_path.display(),
        destination.name,
        summary(&report)
    );
    Ok(())
}

fn summary(report: &SyncReport) -> String {
    format!(
        "{} folders, {} uploaded, {} updated, {} deleted, {} unchanged",
        report.folders, report.created, report.updated, report.deleted, report.unchanged
    )
}

async fn logout(config: &SyncConfig, yes: bool) -> anyhow::Result<()> {
    let store = TokenStore::new(&config.token_path);
    let confirmed = yes
        || Confirm::new()
            .with_prompt("Remove the saved Google Drive token?")
            .default(false)
            .interact()?;
    if !confirmed {
        return Ok(());
    }
    if store.delete().await? {
        println!("Saved token removed.");
    } else {
        println!("No saved token at {}.", store.path().display());
    }
    Ok(())
}
