use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::layout::StorageLayout;

/// Re-export alloy types for convenience
pub use alloy::primitives::{Address, B256};

// =============================================================================
// Domain Enums
// =============================================================================

/// Proxy flavour, selecting how upgrades are authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum ProxyKind {
    /// ERC-1822/ERC-1967: the implementation authorizes its own upgrades
    Uups,
    /// OpenZeppelin transparent proxy: upgrades go through a `ProxyAdmin`
    Transparent,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Uups => "uups",
            ProxyKind::Transparent => "transparent",
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProxyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uups" => Ok(ProxyKind::Uups),
            "transparent" => Ok(ProxyKind::Transparent),
            other => Err(format!("Unknown proxy kind: {}", other)),
        }
    }
}

/// When to deploy a fresh implementation contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeployPolicy {
    /// Deploy a new implementation on every invocation
    Always,
    /// Only ever reuse an existing implementation
    Never,
    /// Deploy only when the bytecode hash differs from the linked implementation
    #[default]
    OnChange,
}

impl RedeployPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedeployPolicy::Always => "always",
            RedeployPolicy::Never => "never",
            RedeployPolicy::OnChange => "onchange",
        }
    }
}

impl fmt::Display for RedeployPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RedeployPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(RedeployPolicy::Always),
            "never" => Ok(RedeployPolicy::Never),
            "onchange" => Ok(RedeployPolicy::OnChange),
            other => Err(format!("Unknown redeploy policy: {}", other)),
        }
    }
}

/// Lifecycle stage of a logical proxy.
///
/// `Nonexistent` is represented by the absence of a record. Upgrades keep the
/// record in `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum ProxyStage {
    ImplementationDeployed,
    ProxyDeployed,
    Initialized,
}

impl ProxyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyStage::ImplementationDeployed => "implementation_deployed",
            ProxyStage::ProxyDeployed => "proxy_deployed",
            ProxyStage::Initialized => "initialized",
        }
    }
}

impl fmt::Display for ProxyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the initializer has run through the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitStatus {
    Uninitialized,
    Initialized,
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::Uninitialized => write!(f, "uninitialized"),
            InitStatus::Initialized => write!(f, "initialized"),
        }
    }
}

// =============================================================================
// ID Newtypes
// =============================================================================

/// Network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
pub struct NetworkId(pub i64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NetworkId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<NetworkId> for i64 {
    fn from(value: NetworkId) -> Self {
        value.0
    }
}

// =============================================================================
// Records
// =============================================================================

/// A network the manifest has seen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Network to insert or update
#[derive(Debug, Clone)]
pub struct NewNetwork {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// A deployed implementation contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationRecord {
    pub contract: String,
    pub address: Address,
    /// keccak256 of the creation bytecode
    pub bytecode_hash: B256,
    pub tx_hash: Option<B256>,
    pub storage_layout: Option<StorageLayout>,
}

/// The deployed-proxy handle: one proxy and its current implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRecord {
    /// Logical name, unique per network
    pub name: String,
    pub kind: ProxyKind,
    pub stage: ProxyStage,
    /// Absent until the proxy contract is confirmed
    pub proxy: Option<Address>,
    /// `ProxyAdmin` of a transparent proxy
    pub admin: Option<Address>,
    pub implementation: ImplementationRecord,
    /// Number of implementations linked so far
    pub version: i64,
    /// Initializer transaction sent but not yet confirmed
    pub init_tx_hash: Option<B256>,
}

impl ProxyRecord {
    pub fn new(name: impl Into<String>, kind: ProxyKind, implementation: ImplementationRecord) -> Self {
        Self {
            name: name.into(),
            kind,
            stage: ProxyStage::ImplementationDeployed,
            proxy: None,
            admin: None,
            implementation,
            version: 0,
            init_tx_hash: None,
        }
    }

    pub fn init_status(&self) -> InitStatus {
        match self.stage {
            ProxyStage::Initialized => InitStatus::Initialized,
            _ => InitStatus::Uninitialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.init_status() == InitStatus::Initialized
    }
}

/// One entry of a proxy's upgrade history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyVersion {
    pub version: i64,
    pub implementation: Address,
    pub linked_at: String,
}

// =============================================================================
// Options
// =============================================================================

/// Options governing a single `deploy_proxy` invocation
#[derive(Debug, Clone)]
pub struct DeploymentOptions {
    pub kind: ProxyKind,
    pub redeploy_implementation: RedeployPolicy,
    /// Name of the initializer function
    pub initializer: String,
    pub confirmations: u64,
    pub confirmation_timeout: Duration,
    pub unsafe_skip_storage_check: bool,
}

impl DeploymentOptions {
    pub const DEFAULT_INITIALIZER: &str = "initialize";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(kind: ProxyKind, redeploy_implementation: RedeployPolicy) -> Self {
        Self {
            kind,
            redeploy_implementation,
            ..Default::default()
        }
    }
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            kind: ProxyKind::Uups,
            redeploy_implementation: RedeployPolicy::default(),
            initializer: Self::DEFAULT_INITIALIZER.to_string(),
            confirmations: 1,
            confirmation_timeout: Self::DEFAULT_TIMEOUT,
            unsafe_skip_storage_check: false,
        }
    }
}

/// Ordered initializer arguments, typed against the ABI at encoding time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitArgs(pub Vec<serde_json::Value>);

impl InitArgs {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[serde_json::Value] {
        &self.0
    }
}

impl From<Vec<serde_json::Value>> for InitArgs {
    fn from(values: Vec<serde_json::Value>) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_kind_from_str() {
        assert_eq!("uups".parse::<ProxyKind>().unwrap(), ProxyKind::Uups);
        assert_eq!("UUPS".parse::<ProxyKind>().unwrap(), ProxyKind::Uups);
        assert_eq!(
            "transparent".parse::<ProxyKind>().unwrap(),
            ProxyKind::Transparent
        );
        assert!("beacon".parse::<ProxyKind>().is_err());
    }

    #[test]
    fn test_redeploy_policy_serde() {
        let policy: RedeployPolicy = serde_json::from_str(r#""onchange""#).unwrap();
        assert_eq!(policy, RedeployPolicy::OnChange);
        assert_eq!(RedeployPolicy::default(), RedeployPolicy::OnChange);
        assert_eq!(
            serde_json::to_string(&RedeployPolicy::Always).unwrap(),
            r#""always""#
        );
    }

    #[test]
    fn test_stage_ordering() {
        assert!(ProxyStage::ImplementationDeployed < ProxyStage::ProxyDeployed);
        assert!(ProxyStage::ProxyDeployed < ProxyStage::Initialized);
    }

    #[test]
    fn test_init_status_follows_stage() {
        let implementation = ImplementationRecord {
            contract: "NFTCollect".to_string(),
            address: Address::repeat_byte(0x11),
            bytecode_hash: B256::ZERO,
            tx_hash: None,
            storage_layout: None,
        };
        let mut record = ProxyRecord::new("nft", ProxyKind::Uups, implementation);
        assert_eq!(record.init_status(), InitStatus::Uninitialized);

        record.stage = ProxyStage::ProxyDeployed;
        assert!(!record.is_initialized());

        record.stage = ProxyStage::Initialized;
        assert_eq!(record.init_status(), InitStatus::Initialized);
    }

    #[test]
    fn test_default_options() {
        let options = DeploymentOptions::new(ProxyKind::Uups, RedeployPolicy::Always);
        assert_eq!(options.initializer, "initialize");
        assert_eq!(options.confirmations, 1);
        assert!(!options.unsafe_skip_storage_check);
    }
}
