//! Proxy deployment orchestration
//!
//! [`Orchestrator::deploy_proxy`] drives a logical proxy through
//! `ImplementationDeployed -> ProxyDeployed -> Initialized`, then upgrades it
//! in place on later runs. Every confirmed step is written to the manifest
//! before the next transaction is built, so a failed run can be resumed.

use tracing::{debug, info, warn};

use crate::abi::InitCall;
use crate::artifact::{ArtifactResolver, ContractArtifact};
use crate::chain::{read_address_slot, Chain, ChainError, TxReceipt, TxRequest, ADMIN_SLOT, IMPLEMENTATION_SLOT};
use crate::error::{DeploymentStep, Error, PartialDeployment, Result};
use crate::layout::check_compatible;
use crate::repository::Manifest;
use crate::types::{
    Address, DeploymentOptions, ImplementationRecord, InitArgs, Network, ProxyKind, ProxyRecord,
    ProxyStage, RedeployPolicy, B256,
};

/// Deploys and upgrades proxies on one network
pub struct Orchestrator<'a> {
    chain: &'a dyn Chain,
    manifest: &'a dyn Manifest,
    artifacts: &'a dyn ArtifactResolver,
    network: &'a Network,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        chain: &'a dyn Chain,
        manifest: &'a dyn Manifest,
        artifacts: &'a dyn ArtifactResolver,
        network: &'a Network,
    ) -> Self {
        Self {
            chain,
            manifest,
            artifacts,
            network,
        }
    }

    /// Deploy, resume or upgrade the proxy called `name`.
    ///
    /// Arguments and artifacts are validated before anything is submitted.
    pub async fn deploy_proxy(
        &self,
        name: &str,
        artifact: &ContractArtifact,
        args: &InitArgs,
        options: &DeploymentOptions,
    ) -> Result<ProxyRecord> {
        options.kind.validate_implementation(artifact)?;
        let init = artifact.abi.encode_initializer(&options.initializer, args)?;

        self.check_network().await?;

        let existing = self.manifest.proxies().get(self.network.id, name).await?;
        if let Some(record) = &existing {
            if record.kind != options.kind {
                return Err(Error::ProxyKindMismatch {
                    name: name.to_string(),
                    existing: record.kind,
                    requested: options.kind,
                });
            }
        }

        // Resolved up front so a missing proxy artifact fails before any transaction
        let proxy_artifact = match &existing {
            Some(record) if record.stage >= ProxyStage::ProxyDeployed => None,
            _ => {
                let artifact = self.artifacts.resolve(options.kind.proxy_artifact())?;
                options.kind.validate_proxy_artifact(&artifact)?;
                Some(artifact)
            }
        };

        let mut record = match existing {
            Some(record) if record.is_initialized() => {
                return self.upgrade(record, artifact, options).await;
            }
            Some(mut record) if record.stage == ProxyStage::ProxyDeployed => {
                if self.settle_initializer(&mut record, options).await? {
                    info!(proxy = %name, "initializer from an earlier run confirmed");
                    return Ok(record);
                }
                if implementation_changes(&record, artifact, options.redeploy_implementation) {
                    return Err(Error::ProxyNotInitialized(record.name));
                }
                info!(proxy = %name, "resuming uninitialized proxy");
                record
            }
            Some(mut record) => {
                info!(proxy = %name, "resuming before proxy deployment");
                let implementation = self
                    .unlinked_implementation(Some(&record.implementation), artifact, options)
                    .await?;
                if implementation.address != record.implementation.address {
                    record.implementation = implementation;
                    self.manifest.proxies().save(self.network.id, &record).await?;
                }
                record
            }
            None => {
                let implementation = self.unlinked_implementation(None, artifact, options).await?;
                let record = ProxyRecord::new(name, options.kind, implementation);
                self.manifest.proxies().save(self.network.id, &record).await?;
                record
            }
        };

        if let Some(proxy_artifact) = proxy_artifact {
            if record.stage == ProxyStage::ImplementationDeployed {
                self.deploy_proxy_contract(&mut record, &proxy_artifact, options)
                    .await?;
            }
        }

        self.initialize(&mut record, &init, options).await?;
        Ok(record)
    }

    async fn check_network(&self) -> Result<()> {
        let chain_id = self.chain.chain_id().await?;
        if chain_id != self.network.chain_id {
            return Err(Error::NetworkUnavailable(format!(
                "network '{}' expects chain id {}, but the RPC reports {}",
                self.network.name, self.network.chain_id, chain_id
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Implementation selection
    // -------------------------------------------------------------------------

    /// Pick the implementation of a proxy that does not exist yet
    async fn unlinked_implementation(
        &self,
        current: Option<&ImplementationRecord>,
        artifact: &ContractArtifact,
        options: &DeploymentOptions,
    ) -> Result<ImplementationRecord> {
        let hash = artifact.bytecode.hash();
        // Nothing links the recorded implementation yet; any policy reuses it for the same build
        let candidate = match (options.redeploy_implementation, current) {
            (RedeployPolicy::Never, Some(current)) => Some(current.clone()),
            (_, Some(current)) if current.bytecode_hash == hash => Some(current.clone()),
            (RedeployPolicy::Always, _) => None,
            _ => self.cached(artifact, &hash).await?,
        };

        if let Some(implementation) = self.verified(candidate).await? {
            debug!(address = %implementation.address, "reusing implementation");
            return Ok(implementation);
        }

        if options.redeploy_implementation == RedeployPolicy::Never {
            return Err(Error::NoImplementationToReuse(artifact.name.clone()));
        }

        let partial = PartialDeployment {
            stage: current.map(|_| ProxyStage::ImplementationDeployed),
            ..Default::default()
        };
        self.deploy_implementation(artifact, options, partial).await
    }

    async fn cached(
        &self,
        artifact: &ContractArtifact,
        hash: &B256,
    ) -> Result<Option<ImplementationRecord>> {
        self.manifest
            .implementations()
            .find(self.network.id, &artifact.name, hash)
            .await
    }

    /// Drop a candidate whose code is gone, e.g. after a local node restart
    async fn verified(
        &self,
        candidate: Option<ImplementationRecord>,
    ) -> Result<Option<ImplementationRecord>> {
        let Some(implementation) = candidate else {
            return Ok(None);
        };

        if !self.chain.code_at(implementation.address).await?.is_empty() {
            return Ok(Some(implementation));
        }

        warn!(
            address = %implementation.address,
            contract = %implementation.contract,
            "recorded implementation has no code, ignoring it"
        );
        self.manifest
            .implementations()
            .forget(self.network.id, &implementation.address)
            .await?;
        Ok(None)
    }

    async fn deploy_implementation(
        &self,
        artifact: &ContractArtifact,
        options: &DeploymentOptions,
        partial: PartialDeployment,
    ) -> Result<ImplementationRecord> {
        info!(contract = %artifact.name, "deploying implementation");
        let step = DeploymentStep::DeployImplementation;
        let tx = TxRequest::Create {
            code: artifact.bytecode.with_args(&[]),
        };
        let receipt = self.transact(step, tx, options, partial.clone()).await?;
        let address = created_address(&receipt, step, partial)?;

        let implementation = ImplementationRecord {
            contract: artifact.name.clone(),
            address,
            bytecode_hash: artifact.bytecode.hash(),
            tx_hash: Some(receipt.tx_hash),
            storage_layout: artifact.storage_layout.clone(),
        };
        self.manifest
            .implementations()
            .record(self.network.id, &implementation)
            .await?;

        info!(contract = %artifact.name, %address, "implementation deployed");
        Ok(implementation)
    }

    // -------------------------------------------------------------------------
    // First deployment
    // -------------------------------------------------------------------------

    async fn deploy_proxy_contract(
        &self,
        record: &mut ProxyRecord,
        proxy_artifact: &ContractArtifact,
        options: &DeploymentOptions,
    ) -> Result<()> {
        let step = DeploymentStep::DeployProxy;
        let implementation = record.implementation.address;
        let mut partial = PartialDeployment {
            stage: Some(ProxyStage::ImplementationDeployed),
            implementation: Some(implementation),
            proxy: None,
        };

        info!(proxy = %record.name, kind = %record.kind, "deploying proxy");
        let tx = record
            .kind
            .proxy_creation(proxy_artifact, implementation, self.chain.sender());
        let receipt = self.transact(step, tx, options, partial.clone()).await?;
        let proxy = created_address(&receipt, step, partial.clone())?;
        partial.proxy = Some(proxy);

        let linked = read_address_slot(self.chain, proxy, IMPLEMENTATION_SLOT)
            .await
            .map_err(|e| chain_failure(step, e, partial.clone()))?;
        if linked != Some(implementation) {
            return Err(Error::deployment_failed(
                step,
                format!("proxy {} does not point at implementation {}", proxy, implementation),
                partial,
            ));
        }

        let admin = match record.kind {
            ProxyKind::Uups => None,
            ProxyKind::Transparent => {
                let admin = read_address_slot(self.chain, proxy, ADMIN_SLOT)
                    .await
                    .map_err(|e| chain_failure(step, e, partial.clone()))?;
                Some(admin.ok_or_else(|| {
                    Error::deployment_failed(step, format!("proxy {} has no admin", proxy), partial)
                })?)
            }
        };

        record.proxy = Some(proxy);
        record.admin = admin;
        record.stage = ProxyStage::ProxyDeployed;
        record.version += 1;
        self.manifest.proxies().save(self.network.id, record).await?;

        info!(proxy = %record.name, address = %proxy, "proxy deployed");
        Ok(())
    }

    async fn initialize(
        &self,
        record: &mut ProxyRecord,
        init: &InitCall,
        options: &DeploymentOptions,
    ) -> Result<()> {
        let proxy = proxy_address(record)?;
        let partial = PartialDeployment {
            stage: Some(ProxyStage::ProxyDeployed),
            implementation: Some(record.implementation.address),
            proxy: Some(proxy),
        };

        info!(proxy = %record.name, call = %init.signature, "initializing");
        let step = DeploymentStep::Initialize;
        let tx = TxRequest::Call {
            to: proxy,
            data: init.calldata.clone(),
        };
        let tx_hash = self.send(step, tx, partial.clone()).await?;

        // Recorded before waiting so a re-run can find it if confirmation times out
        record.init_tx_hash = Some(tx_hash);
        self.manifest.proxies().save(self.network.id, record).await?;

        self.await_receipt(step, tx_hash, options, partial).await?;
        self.mark_initialized(record).await
    }

    /// Resolve the initializer a previous run sent but never saw confirmed.
    ///
    /// Returns `true` when it has since been mined successfully. `false`
    /// means the initializer has to be sent again: there was none, or the
    /// node no longer knows it, or it reverted.
    async fn settle_initializer(
        &self,
        record: &mut ProxyRecord,
        options: &DeploymentOptions,
    ) -> Result<bool> {
        let Some(tx_hash) = record.init_tx_hash else {
            return Ok(false);
        };
        let partial = PartialDeployment {
            stage: Some(ProxyStage::ProxyDeployed),
            implementation: Some(record.implementation.address),
            proxy: record.proxy,
        };
        let step = DeploymentStep::Initialize;

        let known = self
            .chain
            .transaction_known(tx_hash)
            .await
            .map_err(|e| chain_failure(step, e, partial.clone()))?;
        if !known {
            warn!(proxy = %record.name, %tx_hash, "initializer transaction was dropped");
            return Ok(false);
        }

        debug!(proxy = %record.name, %tx_hash, "waiting for earlier initializer");
        let receipt = self
            .chain
            .confirm(tx_hash, options.confirmations, options.confirmation_timeout)
            .await
            .map_err(|e| chain_failure(step, e, partial))?;
        if !receipt.success {
            warn!(proxy = %record.name, %tx_hash, "earlier initializer reverted");
            return Ok(false);
        }

        self.mark_initialized(record).await?;
        Ok(true)
    }

    async fn mark_initialized(&self, record: &mut ProxyRecord) -> Result<()> {
        record.stage = ProxyStage::Initialized;
        record.init_tx_hash = None;
        self.manifest.proxies().save(self.network.id, record).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Upgrades
    // -------------------------------------------------------------------------

    async fn upgrade(
        &self,
        mut record: ProxyRecord,
        artifact: &ContractArtifact,
        options: &DeploymentOptions,
    ) -> Result<ProxyRecord> {
        if !implementation_changes(&record, artifact, options.redeploy_implementation) {
            debug!(proxy = %record.name, "implementation unchanged");
            return Ok(record);
        }

        if options.unsafe_skip_storage_check {
            warn!(proxy = %record.name, "skipping storage layout check");
        } else {
            check_storage(&record, artifact)?;
        }

        let proxy = proxy_address(&record)?;
        let candidate = match options.redeploy_implementation {
            RedeployPolicy::Always => None,
            _ => {
                let hash = artifact.bytecode.hash();
                let cached = self.cached(artifact, &hash).await?;
                self.verified(cached).await?
            }
        };
        let implementation = match candidate {
            Some(implementation) => implementation,
            None => {
                let partial = PartialDeployment {
                    stage: Some(ProxyStage::Initialized),
                    implementation: None,
                    proxy: Some(proxy),
                };
                self.deploy_implementation(artifact, options, partial)
                    .await?
            }
        };

        let step = DeploymentStep::Upgrade;
        let partial = PartialDeployment {
            stage: Some(ProxyStage::Initialized),
            implementation: Some(implementation.address),
            proxy: Some(proxy),
        };

        info!(
            proxy = %record.name,
            from = %record.implementation.address,
            to = %implementation.address,
            "upgrading"
        );
        let tx = record
            .kind
            .upgrade_call(proxy, record.admin, implementation.address)?;
        self.transact(step, tx, options, partial.clone()).await?;

        let linked = read_address_slot(self.chain, proxy, IMPLEMENTATION_SLOT)
            .await
            .map_err(|e| chain_failure(step, e, partial.clone()))?;
        if linked != Some(implementation.address) {
            return Err(Error::deployment_failed(
                step,
                format!(
                    "proxy {} still points at {}",
                    proxy,
                    linked.unwrap_or(Address::ZERO)
                ),
                partial,
            ));
        }

        record.implementation = implementation;
        record.version += 1;
        self.manifest.proxies().save(self.network.id, &record).await?;

        info!(proxy = %record.name, version = record.version, "upgraded");
        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Submit and wait for confirmation; any failure aborts the deployment
    async fn transact(
        &self,
        step: DeploymentStep,
        tx: TxRequest,
        options: &DeploymentOptions,
        partial: PartialDeployment,
    ) -> Result<TxReceipt> {
        let tx_hash = self.send(step, tx, partial.clone()).await?;
        self.await_receipt(step, tx_hash, options, partial).await
    }

    async fn send(
        &self,
        step: DeploymentStep,
        tx: TxRequest,
        partial: PartialDeployment,
    ) -> Result<B256> {
        let tx_hash = self
            .chain
            .submit(tx)
            .await
            .map_err(|e| chain_failure(step, e, partial))?;
        debug!(%tx_hash, "submitted transaction");
        Ok(tx_hash)
    }

    async fn await_receipt(
        &self,
        step: DeploymentStep,
        tx_hash: B256,
        options: &DeploymentOptions,
        partial: PartialDeployment,
    ) -> Result<TxReceipt> {
        let receipt = self
            .chain
            .confirm(tx_hash, options.confirmations, options.confirmation_timeout)
            .await
            .map_err(|e| chain_failure(step, e, partial.clone()))?;

        if !receipt.success {
            return Err(Error::deployment_failed(
                step,
                format!("transaction {} reverted", tx_hash),
                partial,
            ));
        }

        debug!(%tx_hash, block = ?receipt.block_number, "confirmed");
        Ok(receipt)
    }
}

/// Whether the policy moves the proxy to a different implementation
fn implementation_changes(
    record: &ProxyRecord,
    artifact: &ContractArtifact,
    policy: RedeployPolicy,
) -> bool {
    match policy {
        RedeployPolicy::Always => true,
        RedeployPolicy::Never => false,
        RedeployPolicy::OnChange => record.implementation.bytecode_hash != artifact.bytecode.hash(),
    }
}

fn check_storage(record: &ProxyRecord, artifact: &ContractArtifact) -> Result<()> {
    match (&record.implementation.storage_layout, &artifact.storage_layout) {
        (Some(old), Some(new)) => {
            check_compatible(old, new).map_err(|reason| Error::IncompatibleStorageLayout {
                contract: artifact.name.clone(),
                reason,
            })
        }
        _ => {
            warn!(
                contract = %artifact.name,
                "storage layout unavailable, upgrade safety not checked"
            );
            Ok(())
        }
    }
}

/// An unreachable node is a network problem whatever the step; anything else
/// the chain reports fails the step
fn chain_failure(step: DeploymentStep, err: ChainError, partial: PartialDeployment) -> Error {
    match err {
        ChainError::Unavailable(reason) => Error::NetworkUnavailable(format!(
            "{} while {}; {}",
            reason, step, partial
        )),
        other => Error::deployment_failed(step, other, partial),
    }
}

fn created_address(
    receipt: &TxReceipt,
    step: DeploymentStep,
    partial: PartialDeployment,
) -> Result<Address> {
    receipt.contract_address.ok_or_else(|| {
        Error::deployment_failed(
            step,
            format!("receipt of {} has no contract address", receipt.tx_hash),
            partial,
        )
    })
}

fn proxy_address(record: &ProxyRecord) -> Result<Address> {
    record.proxy.ok_or_else(|| {
        Error::InvalidRecord(format!("proxy '{}' has no address at stage {}", record.name, record.stage))
    })
}
