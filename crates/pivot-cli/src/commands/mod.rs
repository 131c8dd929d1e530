//! CLI commands for pivot

use std::process::ExitCode;

use clap::Subcommand;
use color_eyre::eyre::{eyre, Result};
use pivot_core::{Network, NetworkRepository, PivotDir};
use pivot_db::Database;

use crate::config::PivotConfig;

pub mod artifacts;
pub mod deploy;
pub mod get;
pub mod history;
pub mod init;
pub mod list;

/// All available CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Initialize pivot in a contracts project
    Init(init::InitCommand),

    /// Deploy or upgrade the proxies configured in pivot.toml
    Deploy(deploy::DeployCommand),

    /// List proxies recorded on a network
    List(list::ListCommand),

    /// Print the address of a deployed proxy
    Get(get::GetCommand),

    /// Show the implementations a proxy has pointed at
    History(history::HistoryCommand),

    /// List compiled artifacts that can be deployed
    Artifacts(artifacts::ArtifactsCommand),
}

impl Command {
    /// Execute the command
    pub async fn run(self) -> Result<ExitCode> {
        match self {
            Command::Init(cmd) => cmd.run().await,
            Command::Deploy(cmd) => cmd.run().await,
            Command::List(cmd) => cmd.run().await,
            Command::Get(cmd) => cmd.run().await,
            Command::History(cmd) => cmd.run().await,
            Command::Artifacts(cmd) => cmd.run().await,
        }
    }
}

/// Open the manifest of an initialized project
pub(crate) async fn open_manifest() -> Result<Database> {
    let dir = PivotDir::new();
    if !dir.exists() {
        return Err(eyre!(
            "Pivot is not initialized in this directory ({} not found). Run `pivot init` first.",
            PivotDir::NAME
        ));
    }
    let db = Database::open(&dir).await?;
    db.init_schema().await?;
    Ok(db)
}

/// Look up the network to read records from
pub(crate) async fn recorded_network(db: &Database, flag: Option<&str>) -> Result<Network> {
    let name = match flag {
        Some(name) => name.to_string(),
        None => PivotConfig::load()?.network_name(None)?,
    };
    NetworkRepository::get_by_name(db, &name)
        .await?
        .ok_or_else(|| eyre!("Nothing has been deployed to network '{}' yet", name))
}
