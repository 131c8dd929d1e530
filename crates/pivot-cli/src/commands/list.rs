//! List proxies recorded on a network

use std::process::ExitCode;

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use pivot_core::{Manifest, ProxyRecord};

use super::{open_manifest, recorded_network};

/// List proxies recorded on a network
#[derive(Args)]
pub struct ListCommand {
    /// Network to list (defaults to default_network)
    #[arg(long)]
    pub network: Option<String>,
}

impl ListCommand {
    pub async fn run(self) -> Result<ExitCode> {
        let db = open_manifest().await?;
        let network = recorded_network(&db, self.network.as_deref()).await?;
        let records = db.proxies().list(network.id).await?;

        if records.is_empty() {
            println!("No proxies recorded on {}.", style(&network.name).cyan());
            return Ok(ExitCode::SUCCESS);
        }

        println!(
            "{:<12} {:<18} {:<12} {:<24} {:<8} {:<44} {:<44}",
            "Name", "Contract", "Kind", "Stage", "Version", "Proxy", "Implementation"
        );
        println!("{}", "-".repeat(166));

        for record in &records {
            println!("{}", row(record));
        }

        println!();
        println!(
            "Total: {} proxy(ies) on {} (chain ID: {})",
            records.len(),
            network.name,
            network.chain_id
        );

        Ok(ExitCode::SUCCESS)
    }
}

fn row(record: &ProxyRecord) -> String {
    format!(
        "{:<12} {:<18} {:<12} {:<24} {:<8} {:<44} {:<44}",
        record.name,
        record.implementation.contract,
        record.kind.as_str(),
        record.stage.as_str(),
        format!("v{}", record.version),
        record
            .proxy
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string()),
        record.implementation.address.to_string()
    )
}
