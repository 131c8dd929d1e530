//! Show the implementation history of a proxy

use std::process::ExitCode;

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use pivot_core::Manifest;

use super::{open_manifest, recorded_network};

/// Show the implementations a proxy has pointed at
#[derive(Args)]
pub struct HistoryCommand {
    /// Proxy name as configured under [proxies]
    pub name: String,

    /// Network to read from (defaults to default_network)
    #[arg(long)]
    pub network: Option<String>,
}

impl HistoryCommand {
    pub async fn run(self) -> Result<ExitCode> {
        let db = open_manifest().await?;
        let network = recorded_network(&db, self.network.as_deref()).await?;
        let versions = db.proxies().versions(network.id, &self.name).await?;

        if versions.is_empty() {
            println!(
                "No implementations linked to {} on {}.",
                style(&self.name).cyan(),
                network.name
            );
            return Ok(ExitCode::SUCCESS);
        }

        println!("{:<8} {:<44} {:<20}", "Version", "Implementation", "Linked At");
        println!("{}", "-".repeat(74));
        for version in &versions {
            println!(
                "{:<8} {:<44} {:<20}",
                format!("v{}", version.version),
                version.implementation.to_string(),
                version.linked_at
            );
        }

        Ok(ExitCode::SUCCESS)
    }
}
