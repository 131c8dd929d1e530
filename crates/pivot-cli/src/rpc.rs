//! alloy-backed [`Chain`] implementation

use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
    WatchTxError,
};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::TransportError;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use pivot_core::{Chain, ChainError, TxReceipt, TxRequest};

/// Signing RPC client for one network
pub struct RpcChain {
    provider: DynProvider,
    sender: Address,
}

impl RpcChain {
    pub fn connect(rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        let sender = signer.address();

        let url: Url = rpc_url
            .parse()
            .map_err(|e| eyre!("Invalid RPC URL '{}': {}", rpc_url, e))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self { provider, sender })
    }
}

fn classify(err: TransportError) -> ChainError {
    if err.is_transport_error() {
        ChainError::Unavailable(err.to_string())
    } else {
        ChainError::Rpc(err.to_string())
    }
}

#[async_trait]
impl Chain for RpcChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(classify)
    }

    fn sender(&self) -> Address {
        self.sender
    }

    async fn submit(&self, tx: TxRequest) -> Result<B256, ChainError> {
        let request = match tx {
            TxRequest::Create { code } => TransactionRequest::default().with_deploy_code(code),
            TxRequest::Call { to, data } => {
                TransactionRequest::default().with_to(to).with_input(data)
            }
        };

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(classify)?;
        Ok(*pending.tx_hash())
    }

    async fn confirm(
        &self,
        tx_hash: B256,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TxReceipt, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(confirmations)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => ChainError::Timeout {
                    tx_hash,
                    after: timeout,
                },
                other => ChainError::Rpc(other.to_string()),
            })?;

        Ok(TxReceipt {
            tx_hash,
            success: receipt.status(),
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
        })
    }

    async fn transaction_known(&self, tx_hash: B256) -> Result<bool, ChainError> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .map_err(classify)?;
        Ok(tx.is_some())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider.get_code_at(address).await.map_err(classify)
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        let value = self
            .provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map_err(classify)?;
        Ok(B256::from(value))
    }
}
