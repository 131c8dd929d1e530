use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use pivot_core::{DeploymentOptions, InitArgs, ProxyKind, RedeployPolicy};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "pivot.toml";

/// Written by `pivot init` when no configuration exists yet
pub const SAMPLE_CONFIG: &str = r#"default_network = "localhost"

[artifacts]
paths = ["out", "artifacts"]

[networks.localhost]
url = "http://127.0.0.1:443"
chain_id = 59003
private_key = "${LOCALHOST_PRIVATEKEY}"

[networks.goerli]
url = "${GOERLI_URL}"
chain_id = 5
private_key = "${GOERLI_PRIVATEKEY}"
confirmation_timeout_secs = 300
confirmations = 2

[proxies.nft]
contract = "NFTCollect"
args = ["Odin", "ODIN", "https://nft-odin.hiro-token.net/inventory/nft"]
kind = "uups"
redeploy_implementation = "always"

[proxies.nft1155]
contract = "NFT1155Factory"
args = ["https://nft-air-odin.hiro-token.net/inventory/nft"]
kind = "uups"
redeploy_implementation = "always"

[proxies.market]
contract = "SaleMarketPlace"
args = [
    "odin",
    "0x106e225499bdcDE3b2B19E6D64Ee4A2c1fAa8Cd2",
    "0x206493b423F54DCDfD9abE6AA86F6CC1Da0029De",
    "0x986473379DDe43bD78b4C64304C01E137BaB7696",
    "0x28053ac8A25d66967B5977e90755fF851646Aea6",
    300000000,
]
kind = "uups"
redeploy_implementation = "always"

[proxies.airdrop]
contract = "NFT1155Market"
args = [
    "odin-air",
    "0x9171DaDAb6EB49153DF17ac2164Fae1aadA93b27",
    "0x206493b423F54DCDfD9abE6AA86F6CC1Da0029De",
    "0x986473379DDe43bD78b4C64304C01E137BaB7696",
    "0x28053ac8A25d66967B5977e90755fF851646Aea6",
    300000000,
]
kind = "uups"
redeploy_implementation = "always"
"#;

/// Project configuration (pivot.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct PivotConfig {
    #[serde(default)]
    pub default_network: Option<String>,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkEntry>,
    #[serde(default)]
    pub proxies: BTreeMap<String, ProxyEntry>,
}

/// Where compiled artifacts are searched
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_artifact_paths")]
    pub paths: Vec<PathBuf>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            paths: default_artifact_paths(),
        }
    }
}

fn default_artifact_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("out"), PathBuf::from("artifacts")]
}

/// A network as written in pivot.toml, before environment resolution
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkEntry {
    pub url: String,
    /// Checked against the RPC before deploying
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

fn default_timeout_secs() -> u64 {
    DeploymentOptions::DEFAULT_TIMEOUT.as_secs()
}

fn default_confirmations() -> u64 {
    1
}

/// One logical proxy to deploy
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEntry {
    pub contract: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default = "default_kind")]
    pub kind: ProxyKind,
    #[serde(default)]
    pub redeploy_implementation: RedeployPolicy,
    #[serde(default)]
    pub initializer: Option<String>,
    #[serde(default)]
    pub unsafe_skip_storage_check: bool,
}

fn default_kind() -> ProxyKind {
    ProxyKind::Uups
}

impl ProxyEntry {
    pub fn init_args(&self) -> InitArgs {
        InitArgs(self.args.clone())
    }
}

/// Network with environment references resolved
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    /// URL as configured, safe to persist
    pub configured_url: String,
    pub chain_id: Option<u64>,
    pub private_key: String,
    pub confirmation_timeout: Duration,
    pub confirmations: u64,
}

impl PivotConfig {
    /// Load configuration from pivot.toml in the current directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            eyre!(
                "Could not find {}. Run `pivot init` to create one.",
                path.display()
            )
        })?;

        let config: PivotConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn exists() -> bool {
        Path::new(CONFIG_FILE).exists()
    }

    /// Pick the network from the `--network` flag, `default_network`, or the
    /// only configured network
    pub fn network_name(&self, flag: Option<&str>) -> Result<String> {
        if let Some(name) = flag.or(self.default_network.as_deref()) {
            return Ok(name.to_string());
        }

        let mut names = self.networks.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => Err(eyre!(
                "No network selected. Pass --network or set default_network in {}",
                CONFIG_FILE
            )),
        }
    }

    /// Get a network configuration by name, resolving environment variables
    pub fn get_network(&self, name: &str) -> Result<NetworkConfig> {
        let entry = self.networks.get(name).ok_or_else(|| {
            eyre!(
                "Network '{}' not found in {} [networks]",
                name,
                CONFIG_FILE
            )
        })?;

        let private_key = entry
            .private_key
            .as_deref()
            .ok_or_else(|| eyre!("Network '{}' has no private_key", name))
            .and_then(resolve_env_var)?;

        Ok(NetworkConfig {
            name: name.to_string(),
            rpc_url: resolve_env_var(&entry.url)?,
            configured_url: entry.url.clone(),
            chain_id: entry.chain_id,
            private_key,
            confirmation_timeout: Duration::from_secs(entry.confirmation_timeout_secs),
            confirmations: entry.confirmations,
        })
    }

    pub fn get_proxy(&self, name: &str) -> Result<&ProxyEntry> {
        self.proxies.get(name).ok_or_else(|| {
            eyre!(
                "Proxy '{}' not found in {} [proxies]",
                name,
                CONFIG_FILE
            )
        })
    }
}

/// Orchestrator options for a proxy on a network
pub fn deployment_options(proxy: &ProxyEntry, network: &NetworkConfig) -> DeploymentOptions {
    DeploymentOptions {
        kind: proxy.kind,
        redeploy_implementation: proxy.redeploy_implementation,
        initializer: proxy
            .initializer
            .clone()
            .unwrap_or_else(|| DeploymentOptions::DEFAULT_INITIALIZER.to_string()),
        confirmations: network.confirmations,
        confirmation_timeout: network.confirmation_timeout,
        unsafe_skip_storage_check: proxy.unsafe_skip_storage_check,
    }
}

/// Resolve environment variable references in a string
/// Supports ${VAR_NAME} syntax
fn resolve_env_var(value: &str) -> Result<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).map_err(|_| eyre!("Environment variable '{}' not set", var_name))
    } else {
        Ok(value.to_string())
    }
}
