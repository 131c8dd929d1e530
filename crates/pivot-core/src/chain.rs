//! Chain access abstraction
//!
//! The orchestrator never talks to an RPC endpoint directly. Everything it
//! needs from the chain goes through [`Chain`], so tests can substitute an
//! in-memory chain and the CLI can plug in an alloy provider.

use std::time::Duration;

use alloy::primitives::{b256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

/// EIP-1967 implementation slot: `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// EIP-1967 admin slot: `bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)`
pub const ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// A transaction to submit from the deployer account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxRequest {
    /// Contract creation with constructor arguments already appended
    Create { code: Bytes },
    /// Call into an existing contract
    Call { to: Address, data: Bytes },
}

/// Outcome of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    /// Set for successful contract creations
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

#[derive(Error, Debug)]
pub enum ChainError {
    /// The endpoint could not be reached
    #[error("{0}")]
    Unavailable(String),

    /// The node rejected or failed the request
    #[error("{0}")]
    Rpc(String),

    /// No receipt with enough confirmations arrived in time
    #[error("transaction {tx_hash} not confirmed after {}s", after.as_secs())]
    Timeout { tx_hash: B256, after: Duration },
}

/// Failed reads surface as an unreachable network
impl From<ChainError> for crate::error::Error {
    fn from(err: ChainError) -> Self {
        crate::error::Error::NetworkUnavailable(err.to_string())
    }
}

/// The subset of chain access the orchestrator relies on
#[async_trait]
pub trait Chain: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Account that signs every submitted transaction
    fn sender(&self) -> Address;

    /// Sign and broadcast, returning the transaction hash
    async fn submit(&self, tx: TxRequest) -> Result<B256, ChainError>;

    /// Wait for `confirmations` blocks on top of the inclusion block
    async fn confirm(
        &self,
        tx_hash: B256,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TxReceipt, ChainError>;

    /// Whether the node has seen the transaction, pending or mined
    async fn transaction_known(&self, tx_hash: B256) -> Result<bool, ChainError>;

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError>;
}

/// Read an address stored in a proxy slot, `None` when the slot is empty
pub async fn read_address_slot(
    chain: &dyn Chain,
    proxy: Address,
    slot: B256,
) -> Result<Option<Address>, ChainError> {
    let word = chain.storage_at(proxy, slot).await?;
    if word == B256::ZERO {
        return Ok(None);
    }
    Ok(Some(Address::from_word(word)))
}

/// Left-pad an address into a storage word
pub fn address_word(address: Address) -> B256 {
    B256::from(U256::from_be_slice(address.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    #[test]
    fn test_eip1967_slots() {
        let implementation =
            U256::from_be_bytes(keccak256("eip1967.proxy.implementation").0) - U256::from(1);
        assert_eq!(B256::from(implementation), IMPLEMENTATION_SLOT);

        let admin = U256::from_be_bytes(keccak256("eip1967.proxy.admin").0) - U256::from(1);
        assert_eq!(B256::from(admin), ADMIN_SLOT);
    }

    #[test]
    fn test_address_word_roundtrip() {
        let address = Address::repeat_byte(0xab);
        let word = address_word(address);
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(Address::from_word(word), address);
    }
}
