//! Database row models
//!
//! Rows keep addresses and hashes as text. Conversions into the core records
//! parse them back and fail with [`Error::InvalidRecord`] on corrupt data.

use pivot_core::bytecode::{hash_from_hex, hash_to_hex};
use pivot_core::{
    Address, Error, ImplementationRecord, Network, NetworkId, ProxyKind, ProxyRecord, ProxyStage,
    ProxyVersion, StorageLayout, B256,
};
use sqlx::FromRow;

/// Network stored in database
#[derive(Debug, Clone, FromRow)]
pub struct NetworkRow {
    pub id: i64,
    pub name: String,
    pub chain_id: i64,
    pub rpc_url: String,
    pub created_at: String,
}

impl From<NetworkRow> for Network {
    fn from(row: NetworkRow) -> Self {
        Self {
            id: NetworkId(row.id),
            name: row.name,
            chain_id: row.chain_id as u64,
            rpc_url: row.rpc_url,
        }
    }
}

/// Cached implementation
#[derive(Debug, Clone, FromRow)]
pub struct ImplementationRow {
    pub id: i64,
    pub network_id: i64,
    pub contract_name: String,
    pub address: String,
    pub bytecode_hash: String,
    pub tx_hash: Option<String>,
    pub storage_layout: Option<String>, // JSON string
    pub deployed_at: String,
}

impl TryFrom<ImplementationRow> for ImplementationRecord {
    type Error = Error;

    fn try_from(row: ImplementationRow) -> Result<Self, Error> {
        Ok(Self {
            address: parse_address(&row.address)?,
            bytecode_hash: hash_from_hex(&row.bytecode_hash)?,
            tx_hash: row.tx_hash.as_deref().map(parse_hash).transpose()?,
            storage_layout: parse_layout(row.storage_layout.as_deref())?,
            contract: row.contract_name,
        })
    }
}

/// Logical proxy with its current implementation inlined
#[derive(Debug, Clone, FromRow)]
pub struct ProxyRow {
    pub id: i64,
    pub network_id: i64,
    pub name: String,
    pub contract_name: String,
    pub kind: ProxyKind,
    pub stage: ProxyStage,
    pub address: Option<String>,
    pub admin_address: Option<String>,
    pub implementation_address: String,
    pub implementation_hash: String,
    pub implementation_tx_hash: Option<String>,
    pub storage_layout: Option<String>, // JSON string
    pub version: i64,
    pub init_tx_hash: Option<String>,
    pub updated_at: String,
}

impl TryFrom<ProxyRow> for ProxyRecord {
    type Error = Error;

    fn try_from(row: ProxyRow) -> Result<Self, Error> {
        let implementation = ImplementationRecord {
            contract: row.contract_name,
            address: parse_address(&row.implementation_address)?,
            bytecode_hash: hash_from_hex(&row.implementation_hash)?,
            tx_hash: row
                .implementation_tx_hash
                .as_deref()
                .map(parse_hash)
                .transpose()?,
            storage_layout: parse_layout(row.storage_layout.as_deref())?,
        };

        Ok(Self {
            name: row.name,
            kind: row.kind,
            stage: row.stage,
            proxy: row.address.as_deref().map(parse_address).transpose()?,
            admin: row.admin_address.as_deref().map(parse_address).transpose()?,
            implementation,
            version: row.version,
            init_tx_hash: row.init_tx_hash.as_deref().map(parse_hash).transpose()?,
        })
    }
}

/// Entry of a proxy's upgrade history
#[derive(Debug, Clone, FromRow)]
pub struct ProxyVersionRow {
    pub version: i64,
    pub implementation_address: String,
    pub linked_at: String,
}

impl TryFrom<ProxyVersionRow> for ProxyVersion {
    type Error = Error;

    fn try_from(row: ProxyVersionRow) -> Result<Self, Error> {
        Ok(Self {
            version: row.version,
            implementation: parse_address(&row.implementation_address)?,
            linked_at: row.linked_at,
        })
    }
}

// =============================================================================
// Column encoding
// =============================================================================

pub(crate) fn address_to_db(address: &Address) -> String {
    address.to_checksum(None)
}

pub(crate) fn hash_to_db(hash: &B256) -> String {
    hash_to_hex(hash)
}

pub(crate) fn layout_to_db(layout: Option<&StorageLayout>) -> Result<Option<String>, Error> {
    Ok(layout.map(serde_json::to_string).transpose()?)
}

fn parse_address(value: &str) -> Result<Address, Error> {
    value
        .parse()
        .map_err(|e| Error::InvalidRecord(format!("bad address '{}': {}", value, e)))
}

fn parse_hash(value: &str) -> Result<B256, Error> {
    value
        .parse()
        .map_err(|e| Error::InvalidRecord(format!("bad hash '{}': {}", value, e)))
}

fn parse_layout(value: Option<&str>) -> Result<Option<StorageLayout>, Error> {
    Ok(value.map(serde_json::from_str).transpose()?)
}
