//! Deploy or upgrade configured proxies

use std::process::ExitCode;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use dialoguer::Confirm;
use pivot_core::{
    ArtifactResolver, Chain, Error, FileSystemArtifactResolver, Manifest, Network,
    NetworkRepository, NewNetwork, Orchestrator, ProxyRecord, RedeployPolicy,
};
use pivot_db::Database;
use tracing::debug;

use super::open_manifest;
use crate::config::{deployment_options, NetworkConfig, PivotConfig, ProxyEntry};
use crate::report::report;
use crate::rpc::RpcChain;

/// Deploy or upgrade the proxies configured in pivot.toml
#[derive(Args)]
pub struct DeployCommand {
    /// Proxies to deploy, by their [proxies] name
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub names: Vec<String>,

    /// Network to deploy to (defaults to default_network)
    #[arg(long)]
    pub network: Option<String>,

    /// Deploy every configured proxy
    #[arg(long)]
    pub all: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

impl DeployCommand {
    pub async fn run(self) -> Result<ExitCode> {
        let config = PivotConfig::load()?;
        let names = self.selected(&config)?;
        let network_name = config.network_name(self.network.as_deref())?;
        let network_config = config.get_network(&network_name)?;

        let db = open_manifest().await?;
        let chain = RpcChain::connect(&network_config.rpc_url, &network_config.private_key)?;

        println!(
            "{} Connecting to {}...",
            style("→").blue(),
            style(&network_config.name).cyan()
        );
        let network = match register_network(&db, &chain, &network_config).await {
            Ok(network) => network,
            Err(err) => {
                eprintln!("{} [{}] {}", style("✗").red(), err.code(), err);
                return Ok(ExitCode::FAILURE);
            }
        };
        println!(
            "{} Deploying to {} (chain ID: {}) from {}",
            style("→").blue(),
            style(&network.name).cyan(),
            network.chain_id,
            style(chain.sender()).yellow()
        );

        let resolver = FileSystemArtifactResolver::with_dirs(config.artifacts.paths.clone());
        let orchestrator = Orchestrator::new(&chain, &db, &resolver, &network);

        let mut failed = 0usize;
        for name in &names {
            let entry = config.get_proxy(name)?;
            if !self.confirm_redeploy(&db, &network, name, entry).await? {
                println!("{} Skipped {}", style("⚠").yellow(), style(name).cyan());
                continue;
            }

            println!(
                "{} {} ({}, {})...",
                style("→").blue(),
                style(name).cyan(),
                entry.contract,
                entry.kind
            );
            let result = deploy_one(&orchestrator, &resolver, name, entry, &network_config).await;
            if report(name, &result) != ExitCode::SUCCESS {
                failed += 1;
            }
        }

        println!();
        if failed == 0 {
            println!(
                "{} {} proxy(ies) deployed on {}",
                style("✓").green().bold(),
                names.len(),
                network.name
            );
            Ok(ExitCode::SUCCESS)
        } else {
            eprintln!(
                "{} {} of {} proxy(ies) failed",
                style("✗").red().bold(),
                failed,
                names.len()
            );
            Ok(ExitCode::FAILURE)
        }
    }

    fn selected(&self, config: &PivotConfig) -> Result<Vec<String>> {
        if self.all {
            if config.proxies.is_empty() {
                return Err(eyre!("No proxies configured in pivot.toml"));
            }
            return Ok(config.proxies.keys().cloned().collect());
        }

        for name in &self.names {
            config.get_proxy(name)?;
        }
        Ok(self.names.clone())
    }

    /// Ask before replacing the implementation behind a live proxy
    async fn confirm_redeploy(
        &self,
        db: &Database,
        network: &Network,
        name: &str,
        entry: &ProxyEntry,
    ) -> Result<bool> {
        if self.yes || entry.redeploy_implementation != RedeployPolicy::Always {
            return Ok(true);
        }

        let existing = db.proxies().get(network.id, name).await?;
        let Some(record) = existing.filter(ProxyRecord::is_initialized) else {
            return Ok(true);
        };

        println!(
            "{} {} is live at {}; redeploy_implementation = \"always\" will upgrade it to a fresh implementation",
            style("⚠").yellow(),
            style(name).cyan(),
            record
                .proxy
                .map(|a| a.to_string())
                .unwrap_or_default()
        );
        let confirmed = Confirm::new()
            .with_prompt(format!("Upgrade {}?", name))
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Verify the RPC serves the configured chain and record the network
async fn register_network(
    db: &Database,
    chain: &RpcChain,
    config: &NetworkConfig,
) -> pivot_core::Result<Network> {
    let chain_id = chain.chain_id().await?;
    debug!(network = %config.name, chain_id, "RPC reachable");
    if let Some(expected) = config.chain_id {
        if expected != chain_id {
            return Err(Error::NetworkUnavailable(format!(
                "{} serves chain {} but {} expects chain {}",
                config.name, chain_id, config.name, expected
            )));
        }
    }

    // The unresolved URL is stored so secrets in ${VAR} never reach the manifest
    NetworkRepository::upsert(
        db,
        &NewNetwork {
            name: config.name.clone(),
            chain_id,
            rpc_url: config.configured_url.clone(),
        },
    )
    .await
}

async fn deploy_one(
    orchestrator: &Orchestrator<'_>,
    resolver: &FileSystemArtifactResolver,
    name: &str,
    entry: &ProxyEntry,
    network: &NetworkConfig,
) -> pivot_core::Result<ProxyRecord> {
    let artifact = resolver.resolve(&entry.contract)?;
    let options = deployment_options(entry, network);
    orchestrator
        .deploy_proxy(name, &artifact, &entry.init_args(), &options)
        .await
}
