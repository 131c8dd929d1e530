//! In-memory collaborators for orchestrator tests

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::json;

use crate::abi::Abi;
use crate::artifact::{ArtifactInfo, ArtifactResolver, ContractArtifact};
use crate::bytecode::Bytecode;
use crate::chain::{address_word, Chain, ChainError, TxReceipt, TxRequest, ADMIN_SLOT, IMPLEMENTATION_SLOT};
use crate::error::{Error, Result};
use crate::proxy::{IProxyAdmin, IUUPSUpgradeable};
use crate::repository::{ImplementationRepository, Manifest, NetworkRepository, ProxyRepository};
use crate::types::{
    ImplementationRecord, Network, NetworkId, NewNetwork, ProxyKind, ProxyRecord, ProxyVersion,
};

pub const CHAIN_ID: u64 = 59003;

const ERC1967_CODE: &str = "0xfe0119670001";
const TRANSPARENT_CODE: &str = "0xfe0219670002";

// =============================================================================
// Artifacts
// =============================================================================

pub fn proxy_artifact(kind: ProxyKind) -> ContractArtifact {
    let (code, inputs) = match kind {
        ProxyKind::Uups => (
            ERC1967_CODE,
            json!([
                {"name": "implementation", "type": "address", "internalType": "address"},
                {"name": "_data", "type": "bytes", "internalType": "bytes"}
            ]),
        ),
        ProxyKind::Transparent => (
            TRANSPARENT_CODE,
            json!([
                {"name": "_logic", "type": "address", "internalType": "address"},
                {"name": "initialOwner", "type": "address", "internalType": "address"},
                {"name": "_data", "type": "bytes", "internalType": "bytes"}
            ]),
        ),
    };

    ContractArtifact {
        name: kind.proxy_artifact().to_string(),
        abi: Abi::from_value(&json!([
            {"type": "constructor", "inputs": inputs, "stateMutability": "payable"}
        ]))
        .unwrap(),
        bytecode: Bytecode::from_hex(code).unwrap(),
        storage_layout: None,
    }
}

/// An implementation with `initialize(<init_types>)` and optionally `upgradeToAndCall`
pub fn implementation_artifact(
    name: &str,
    code: &str,
    init_types: &[&str],
    uups: bool,
) -> ContractArtifact {
    let inputs: Vec<_> = init_types
        .iter()
        .enumerate()
        .map(|(i, ty)| json!({"name": format!("arg{}", i), "type": ty, "internalType": ty}))
        .collect();

    let mut abi = vec![json!({
        "type": "function",
        "name": "initialize",
        "inputs": inputs,
        "outputs": [],
        "stateMutability": "nonpayable"
    })];
    if uups {
        abi.push(json!({
            "type": "function",
            "name": "upgradeToAndCall",
            "inputs": [
                {"name": "newImplementation", "type": "address", "internalType": "address"},
                {"name": "data", "type": "bytes", "internalType": "bytes"}
            ],
            "outputs": [],
            "stateMutability": "payable"
        }));
    }

    ContractArtifact {
        name: name.to_string(),
        abi: Abi::from_value(&serde_json::Value::Array(abi)).unwrap(),
        bytecode: Bytecode::from_hex(code).unwrap(),
        storage_layout: None,
    }
}

/// Artifact resolver over a fixed set of artifacts
#[derive(Default)]
pub struct MemoryArtifacts {
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl MemoryArtifacts {
    /// Resolver holding both proxy contracts
    pub fn with_proxies() -> Self {
        let mut artifacts = Self::default();
        artifacts.insert(proxy_artifact(ProxyKind::Uups));
        artifacts.insert(proxy_artifact(ProxyKind::Transparent));
        artifacts
    }

    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.artifacts.insert(artifact.name.clone(), artifact);
    }
}

impl ArtifactResolver for MemoryArtifacts {
    fn resolve(&self, name: &str) -> Result<ContractArtifact> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<ArtifactInfo>> {
        Ok(self
            .artifacts
            .keys()
            .map(|name| ArtifactInfo {
                name: name.clone(),
                path: PathBuf::from(name),
            })
            .collect())
    }
}

// =============================================================================
// Chain
// =============================================================================

#[derive(Debug, Clone)]
pub enum Contract {
    Implementation {
        code: Bytes,
    },
    Proxy {
        kind: ProxyKind,
        implementation: Address,
        admin: Option<Address>,
        initialized: bool,
        init_calls: usize,
    },
    ProxyAdmin {
        owner: Address,
    },
}

/// Injected failure for the n-th submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Stays pending until [`MockChain::mine_pending`] or [`MockChain::drop_pending`]
    Timeout,
    /// Mined but reverted
    Revert,
    /// The node cannot be reached while submitting
    Unavailable,
}

#[derive(Default)]
struct ChainState {
    nonce: u64,
    contracts: HashMap<Address, Contract>,
    receipts: HashMap<B256, TxReceipt>,
    submitted: Vec<TxRequest>,
    faults: HashMap<usize, Fault>,
    pending: Vec<(usize, B256, TxRequest)>,
}

/// Deterministic in-memory chain that understands the two proxy contracts
pub struct MockChain {
    sender: Address,
    chain_id: u64,
    unavailable: AtomicBool,
    state: Mutex<ChainState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            sender: Address::repeat_byte(0xde),
            chain_id: CHAIN_ID,
            unavailable: AtomicBool::new(false),
            state: Mutex::new(ChainState::default()),
        }
    }

    pub fn with_chain_id(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Self::new()
        }
    }

    /// Fail the transaction submitted at `index` (0-based, counted over the chain's lifetime)
    pub fn fail_at(&self, index: usize, fault: Fault) {
        self.state.lock().unwrap().faults.insert(index, fault);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Wipe all contracts, as after a local node restart
    pub fn clear(&self) {
        self.state.lock().unwrap().contracts.clear();
    }

    pub fn submitted(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    /// Number of submitted creations that were not proxy deployments
    pub fn implementation_creations(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .submitted
            .iter()
            .filter(|tx| matches!(tx, TxRequest::Create { code } if proxy_kind_of(code).is_none()))
            .count()
    }

    pub fn contract(&self, address: Address) -> Option<Contract> {
        self.state.lock().unwrap().contracts.get(&address).cloned()
    }

    /// Mine every pending transaction, as when a timed-out transaction lands late
    pub fn mine_pending(&self) {
        let mut state = self.state.lock().unwrap();
        let pending = std::mem::take(&mut state.pending);
        for (index, tx_hash, tx) in pending {
            state.execute(self.sender, index, tx_hash, &tx);
        }
    }

    /// Forget every pending transaction, as when the mempool evicts them
    pub fn drop_pending(&self) {
        self.state.lock().unwrap().pending.clear();
    }

    /// Run an initializer through the proxy directly, bypassing the orchestrator
    pub fn call_proxy(&self, proxy: Address, data: Bytes) -> bool {
        let mut state = self.state.lock().unwrap();
        state.apply_call(self.sender, proxy, &data)
    }

    fn check_available(&self) -> std::result::Result<(), ChainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

fn proxy_kind_of(code: &[u8]) -> Option<ProxyKind> {
    [ProxyKind::Uups, ProxyKind::Transparent]
        .into_iter()
        .find(|kind| {
            let prefix = proxy_artifact(*kind).bytecode;
            code.starts_with(prefix.as_bytes())
        })
}

impl ChainState {
    fn next_address(&mut self, sender: Address) -> Address {
        let address = sender.create(self.nonce);
        self.nonce += 1;
        address
    }

    fn apply_create(&mut self, sender: Address, code: &[u8]) -> Option<Address> {
        let Some(kind) = proxy_kind_of(code) else {
            let address = self.next_address(sender);
            self.contracts.insert(
                address,
                Contract::Implementation {
                    code: Bytes::copy_from_slice(code),
                },
            );
            return Some(address);
        };

        let args = &code[proxy_artifact(kind).bytecode.len()..];
        let (implementation, owner) = match kind {
            ProxyKind::Uups => {
                let ty = DynSolType::Tuple(vec![DynSolType::Address, DynSolType::Bytes]);
                let values = ty.abi_decode_params(args).ok()?;
                (as_address(&values, 0)?, None)
            }
            ProxyKind::Transparent => {
                let ty = DynSolType::Tuple(vec![
                    DynSolType::Address,
                    DynSolType::Address,
                    DynSolType::Bytes,
                ]);
                let values = ty.abi_decode_params(args).ok()?;
                (as_address(&values, 0)?, Some(as_address(&values, 1)?))
            }
        };

        if !matches!(self.contracts.get(&implementation), Some(Contract::Implementation { .. })) {
            return None;
        }

        let proxy = self.next_address(sender);
        let admin = owner.map(|owner| {
            // OpenZeppelin v5 deploys the ProxyAdmin from the proxy constructor
            let admin = proxy.create(1);
            self.contracts.insert(admin, Contract::ProxyAdmin { owner });
            admin
        });
        self.contracts.insert(
            proxy,
            Contract::Proxy {
                kind,
                implementation,
                admin,
                initialized: false,
                init_calls: 0,
            },
        );
        Some(proxy)
    }

    fn apply_call(&mut self, sender: Address, to: Address, data: &[u8]) -> bool {
        match self.contracts.get(&to).cloned() {
            Some(Contract::Proxy { kind, .. }) => {
                if kind == ProxyKind::Uups
                    && data.starts_with(&IUUPSUpgradeable::upgradeToAndCallCall::SELECTOR)
                {
                    let Ok(call) = IUUPSUpgradeable::upgradeToAndCallCall::abi_decode(data) else {
                        return false;
                    };
                    return self.link(to, call.newImplementation);
                }

                // Anything else is forwarded to the initializer
                let Some(Contract::Proxy {
                    initialized,
                    init_calls,
                    ..
                }) = self.contracts.get_mut(&to)
                else {
                    return false;
                };
                if *initialized {
                    return false;
                }
                *initialized = true;
                *init_calls += 1;
                true
            }
            Some(Contract::ProxyAdmin { owner }) => {
                if sender != owner {
                    return false;
                }
                let Ok(call) = IProxyAdmin::upgradeAndCallCall::abi_decode(data) else {
                    return false;
                };
                match self.contracts.get(&call.proxy) {
                    Some(Contract::Proxy { admin, .. }) if *admin == Some(to) => {}
                    _ => return false,
                }
                self.link(call.proxy, call.implementation)
            }
            _ => false,
        }
    }

    fn execute(&mut self, sender: Address, index: usize, tx_hash: B256, tx: &TxRequest) {
        let (success, contract_address) = match tx {
            TxRequest::Create { code } => match self.apply_create(sender, code) {
                Some(address) => (true, Some(address)),
                None => (false, None),
            },
            TxRequest::Call { to, data } => (self.apply_call(sender, *to, data), None),
        };
        self.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                success,
                contract_address,
                block_number: Some(index as u64 + 1),
            },
        );
    }

    fn link(&mut self, proxy: Address, new_implementation: Address) -> bool {
        if !matches!(
            self.contracts.get(&new_implementation),
            Some(Contract::Implementation { .. })
        ) {
            return false;
        }
        match self.contracts.get_mut(&proxy) {
            Some(Contract::Proxy { implementation, .. }) => {
                *implementation = new_implementation;
                true
            }
            _ => false,
        }
    }
}

fn as_address(value: &DynSolValue, index: usize) -> Option<Address> {
    match value {
        DynSolValue::Tuple(values) => values.get(index)?.as_address(),
        _ => None,
    }
}

#[async_trait]
impl Chain for MockChain {
    async fn chain_id(&self) -> std::result::Result<u64, ChainError> {
        self.check_available()?;
        Ok(self.chain_id)
    }

    fn sender(&self) -> Address {
        self.sender
    }

    async fn submit(&self, tx: TxRequest) -> std::result::Result<B256, ChainError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let index = state.submitted.len();
        state.submitted.push(tx.clone());
        let tx_hash = keccak256(U256::from(index).to_be_bytes::<32>());

        match state.faults.get(&index).copied() {
            Some(Fault::Timeout) => {
                state.pending.push((index, tx_hash, tx));
                return Ok(tx_hash);
            }
            Some(Fault::Unavailable) => {
                return Err(ChainError::Unavailable("connection reset".to_string()));
            }
            Some(Fault::Revert) => {
                state.receipts.insert(
                    tx_hash,
                    TxReceipt {
                        tx_hash,
                        success: false,
                        contract_address: None,
                        block_number: Some(index as u64 + 1),
                    },
                );
                return Ok(tx_hash);
            }
            None => {}
        }

        state.execute(self.sender, index, tx_hash, &tx);
        Ok(tx_hash)
    }

    async fn confirm(
        &self,
        tx_hash: B256,
        _confirmations: u64,
        timeout: Duration,
    ) -> std::result::Result<TxReceipt, ChainError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        if state.pending.iter().any(|(_, hash, _)| *hash == tx_hash) {
            return Err(ChainError::Timeout {
                tx_hash,
                after: timeout,
            });
        }
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| ChainError::Rpc(format!("unknown transaction {}", tx_hash)))
    }

    async fn transaction_known(&self, tx_hash: B256) -> std::result::Result<bool, ChainError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state.receipts.contains_key(&tx_hash)
            || state.pending.iter().any(|(_, hash, _)| *hash == tx_hash))
    }

    async fn code_at(&self, address: Address) -> std::result::Result<Bytes, ChainError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(match state.contracts.get(&address) {
            Some(Contract::Implementation { code }) => code.clone(),
            Some(_) => Bytes::from_static(&[0x60, 0x80]),
            None => Bytes::new(),
        })
    }

    async fn storage_at(
        &self,
        address: Address,
        slot: B256,
    ) -> std::result::Result<B256, ChainError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        let Some(Contract::Proxy {
            implementation,
            admin,
            ..
        }) = state.contracts.get(&address)
        else {
            return Ok(B256::ZERO);
        };
        if slot == IMPLEMENTATION_SLOT {
            return Ok(address_word(*implementation));
        }
        if slot == ADMIN_SLOT {
            return Ok(admin.map(address_word).unwrap_or_default());
        }
        Ok(B256::ZERO)
    }
}

// =============================================================================
// Manifest
// =============================================================================

#[derive(Default)]
struct ManifestState {
    networks: Vec<Network>,
    implementations: Vec<(NetworkId, ImplementationRecord)>,
    proxies: BTreeMap<(i64, String), ProxyRecord>,
    versions: HashMap<(i64, String), Vec<ProxyVersion>>,
}

/// Manifest kept in memory
#[derive(Default)]
pub struct MemoryManifest {
    state: Mutex<ManifestState>,
}

impl MemoryManifest {
    /// Manifest with a registered `localhost` network
    pub async fn with_localhost() -> (Self, Network) {
        let manifest = Self::default();
        let network = manifest
            .upsert(&NewNetwork {
                name: "localhost".to_string(),
                chain_id: CHAIN_ID,
                rpc_url: "http://127.0.0.1:443".to_string(),
            })
            .await
            .unwrap();
        (manifest, network)
    }
}

#[async_trait]
impl NetworkRepository for MemoryManifest {
    async fn list(&self) -> Result<Vec<Network>> {
        Ok(self.state.lock().unwrap().networks.clone())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Network>> {
        let state = self.state.lock().unwrap();
        Ok(state.networks.iter().find(|n| n.name == name).cloned())
    }

    async fn upsert(&self, network: &NewNetwork) -> Result<Network> {
        let mut state = self.state.lock().unwrap();
        let next_id = NetworkId(state.networks.len() as i64 + 1);
        if let Some(existing) = state.networks.iter_mut().find(|n| n.name == network.name) {
            existing.chain_id = network.chain_id;
            existing.rpc_url = network.rpc_url.clone();
            return Ok(existing.clone());
        }
        let created = Network {
            id: next_id,
            name: network.name.clone(),
            chain_id: network.chain_id,
            rpc_url: network.rpc_url.clone(),
        };
        state.networks.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ImplementationRepository for MemoryManifest {
    async fn find(
        &self,
        network: NetworkId,
        contract: &str,
        bytecode_hash: &B256,
    ) -> Result<Option<ImplementationRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .implementations
            .iter()
            .rev()
            .find(|(id, r)| *id == network && r.contract == contract && r.bytecode_hash == *bytecode_hash)
            .map(|(_, r)| r.clone()))
    }

    async fn record(&self, network: NetworkId, implementation: &ImplementationRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.implementations.push((network, implementation.clone()));
        Ok(())
    }

    async fn forget(&self, network: NetworkId, address: &Address) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .implementations
            .retain(|(id, r)| !(*id == network && r.address == *address));
        Ok(())
    }
}

#[async_trait]
impl ProxyRepository for MemoryManifest {
    async fn get(&self, network: NetworkId, name: &str) -> Result<Option<ProxyRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.proxies.get(&(network.0, name.to_string())).cloned())
    }

    async fn save(&self, network: NetworkId, record: &ProxyRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = (network.0, record.name.clone());
        let stored_version = state.proxies.get(&key).map_or(0, |r| r.version);
        if record.version > stored_version {
            state.versions.entry(key.clone()).or_default().push(ProxyVersion {
                version: record.version,
                implementation: record.implementation.address,
                linked_at: format!("block {}", record.version),
            });
        }
        state.proxies.insert(key, record.clone());
        Ok(())
    }

    async fn list(&self, network: NetworkId) -> Result<Vec<ProxyRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .proxies
            .iter()
            .filter(|((id, _), _)| *id == network.0)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn versions(&self, network: NetworkId, name: &str) -> Result<Vec<ProxyVersion>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .versions
            .get(&(network.0, name.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

impl Manifest for MemoryManifest {
    fn networks(&self) -> &dyn NetworkRepository {
        self
    }

    fn implementations(&self) -> &dyn ImplementationRepository {
        self
    }

    fn proxies(&self) -> &dyn ProxyRepository {
        self
    }
}
