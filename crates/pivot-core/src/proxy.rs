//! Proxy flavours: which contract to deploy, how to construct it and how to
//! point it at a new implementation.

use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

use crate::artifact::ContractArtifact;
use crate::chain::TxRequest;
use crate::error::{Error, Result};
use crate::types::ProxyKind;

sol! {
    interface IUUPSUpgradeable {
        function upgradeToAndCall(address newImplementation, bytes data) external payable;
    }

    interface IProxyAdmin {
        function upgradeAndCall(address proxy, address implementation, bytes data) external payable;
    }
}

/// Artifact name of the ERC-1967 proxy used for UUPS deployments
pub const ERC1967_PROXY: &str = "ERC1967Proxy";

/// Artifact name of the OpenZeppelin v5 transparent proxy
pub const TRANSPARENT_PROXY: &str = "TransparentUpgradeableProxy";

impl ProxyKind {
    /// Artifact holding this kind's proxy contract
    pub fn proxy_artifact(&self) -> &'static str {
        match self {
            ProxyKind::Uups => ERC1967_PROXY,
            ProxyKind::Transparent => TRANSPARENT_PROXY,
        }
    }

    fn constructor_arity(&self) -> usize {
        match self {
            ProxyKind::Uups => 2,
            ProxyKind::Transparent => 3,
        }
    }

    /// Check that a resolved proxy artifact has the expected constructor
    pub fn validate_proxy_artifact(&self, artifact: &ContractArtifact) -> Result<()> {
        let arity = artifact.abi.constructor_arity();
        if arity != self.constructor_arity() {
            return Err(Error::invalid_artifact(
                &artifact.name,
                format!(
                    "expected a {} proxy constructor with {} parameters, found {}",
                    self,
                    self.constructor_arity(),
                    arity
                ),
            ));
        }
        Ok(())
    }

    /// Check that an implementation can sit behind this kind of proxy
    pub fn validate_implementation(&self, artifact: &ContractArtifact) -> Result<()> {
        if artifact.abi.has_constructor_with_args() {
            return Err(Error::NotUpgradeable {
                contract: artifact.name.clone(),
                reason: "constructor takes arguments, which never run behind a proxy".to_string(),
            });
        }

        if *self == ProxyKind::Uups && !artifact.abi.has_function("upgradeToAndCall") {
            return Err(Error::NotUpgradeable {
                contract: artifact.name.clone(),
                reason: "UUPS implementations must expose upgradeToAndCall".to_string(),
            });
        }

        Ok(())
    }

    /// Creation transaction for a proxy pointing at `implementation`.
    ///
    /// Init data is left empty: the initializer runs as a separate step.
    pub fn proxy_creation(
        &self,
        proxy: &ContractArtifact,
        implementation: Address,
        owner: Address,
    ) -> TxRequest {
        let args = match self {
            ProxyKind::Uups => (implementation, Bytes::new()).abi_encode_params(),
            ProxyKind::Transparent => (implementation, owner, Bytes::new()).abi_encode_params(),
        };
        TxRequest::Create {
            code: proxy.bytecode.with_args(&args),
        }
    }

    /// Transaction linking `proxy` to a new implementation.
    ///
    /// UUPS proxies are upgraded through the proxy itself, transparent ones
    /// through their `ProxyAdmin`.
    pub fn upgrade_call(
        &self,
        proxy: Address,
        admin: Option<Address>,
        implementation: Address,
    ) -> Result<TxRequest> {
        match self {
            ProxyKind::Uups => Ok(TxRequest::Call {
                to: proxy,
                data: IUUPSUpgradeable::upgradeToAndCallCall {
                    newImplementation: implementation,
                    data: Bytes::new(),
                }
                .abi_encode()
                .into(),
            }),
            ProxyKind::Transparent => {
                let admin = admin.ok_or_else(|| {
                    Error::InvalidRecord(format!("transparent proxy {} has no admin", proxy))
                })?;
                Ok(TxRequest::Call {
                    to: admin,
                    data: IProxyAdmin::upgradeAndCallCall {
                        proxy,
                        implementation,
                        data: Bytes::new(),
                    }
                    .abi_encode()
                    .into(),
                })
            }
        }
    }
}
