//! Print the address of a deployed proxy

use std::process::ExitCode;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use pivot_core::Manifest;

use super::{open_manifest, recorded_network};

/// Print the address of a deployed proxy
#[derive(Args)]
pub struct GetCommand {
    /// Proxy name as configured under [proxies]
    pub name: String,

    /// Network to read from (defaults to default_network)
    #[arg(long)]
    pub network: Option<String>,
}

impl GetCommand {
    pub async fn run(self) -> Result<ExitCode> {
        let db = open_manifest().await?;
        let network = recorded_network(&db, self.network.as_deref()).await?;

        let record = db
            .proxies()
            .get(network.id, &self.name)
            .await?
            .ok_or_else(|| {
                eyre!(
                    "No proxy '{}' recorded on network '{}'",
                    self.name,
                    network.name
                )
            })?;

        match record.proxy {
            Some(address) => {
                // Just the address, for scripting: $(pivot get nft --network goerli)
                println!("{}", address);
                Ok(ExitCode::SUCCESS)
            }
            None => Err(eyre!(
                "Proxy '{}' is at stage {}; its proxy contract was never deployed",
                self.name,
                record.stage
            )),
        }
    }
}
