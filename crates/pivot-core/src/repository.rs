//! Repository traits for the deployment manifest
//!
//! The orchestrator persists every confirmed step through these traits, which
//! keeps it independent of the storage backend and lets tests run against an
//! in-memory manifest.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Address, ImplementationRecord, Network, NetworkId, NewNetwork, ProxyRecord, ProxyVersion, B256,
};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for network operations
#[async_trait]
pub trait NetworkRepository: Send + Sync {
    /// List all networks
    async fn list(&self) -> Result<Vec<Network>>;

    /// Get a network by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Network>>;

    /// Insert or update a network
    async fn upsert(&self, network: &NewNetwork) -> Result<Network>;
}

/// Cache of implementations deployed on a network
#[async_trait]
pub trait ImplementationRepository: Send + Sync {
    /// Most recent implementation of `contract` with the given bytecode hash
    async fn find(
        &self,
        network: NetworkId,
        contract: &str,
        bytecode_hash: &B256,
    ) -> Result<Option<ImplementationRecord>>;

    /// Record a confirmed implementation deployment
    async fn record(&self, network: NetworkId, implementation: &ImplementationRecord) -> Result<()>;

    /// Drop an implementation that no longer has code on-chain
    async fn forget(&self, network: NetworkId, address: &Address) -> Result<()>;
}

/// Logical proxies keyed by (network, name)
#[async_trait]
pub trait ProxyRepository: Send + Sync {
    async fn get(&self, network: NetworkId, name: &str) -> Result<Option<ProxyRecord>>;

    /// Insert or replace the record.
    ///
    /// When `record.version` is newer than the stored one, a history entry is
    /// appended for the linked implementation.
    async fn save(&self, network: NetworkId, record: &ProxyRecord) -> Result<()>;

    /// All proxies on a network, sorted by name
    async fn list(&self, network: NetworkId) -> Result<Vec<ProxyRecord>>;

    /// Upgrade history of a proxy, oldest first
    async fn versions(&self, network: NetworkId, name: &str) -> Result<Vec<ProxyVersion>>;
}

// =============================================================================
// Aggregate Repository
// =============================================================================

/// The deployment manifest: every repository the orchestrator needs
pub trait Manifest: Send + Sync {
    fn networks(&self) -> &dyn NetworkRepository;

    fn implementations(&self) -> &dyn ImplementationRepository;

    fn proxies(&self) -> &dyn ProxyRepository;
}
