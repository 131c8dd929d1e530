use std::fmt;

use alloy::primitives::Address;
use thiserror::Error;

use crate::types::{ProxyKind, ProxyStage};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid artifact '{name}': {reason}")]
    InvalidArtifact { name: String, reason: String },

    #[error("Invalid initializer arguments: {0}")]
    InvalidInitArgs(String),

    #[error("No implementation of '{0}' to reuse")]
    NoImplementationToReuse(String),

    #[error("Proxy '{0}' was never initialized")]
    ProxyNotInitialized(String),

    #[error("Proxy '{name}' is {existing}, cannot deploy it as {requested}")]
    ProxyKindMismatch {
        name: String,
        existing: ProxyKind,
        requested: ProxyKind,
    },

    #[error("Contract '{contract}' is not upgradeable: {reason}")]
    NotUpgradeable { contract: String, reason: String },

    #[error("Incompatible storage layout for '{contract}': {reason}")]
    IncompatibleStorageLayout { contract: String, reason: String },

    #[error("Deployment failed while {step}: {reason}")]
    DeploymentFailed {
        step: DeploymentStep,
        reason: String,
        partial: PartialDeployment,
    },

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Error {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::ArtifactNotFound(_) => "ARTIFACT_NOT_FOUND",
            Error::InvalidArtifact { .. } => "INVALID_ARTIFACT",
            Error::InvalidInitArgs(_) => "INVALID_INIT_ARGS",
            Error::NoImplementationToReuse(_) => "NO_IMPLEMENTATION_TO_REUSE",
            Error::ProxyNotInitialized(_) => "PROXY_NOT_INITIALIZED",
            Error::ProxyKindMismatch { .. } => "PROXY_KIND_MISMATCH",
            Error::NotUpgradeable { .. } => "NOT_UPGRADEABLE",
            Error::IncompatibleStorageLayout { .. } => "INCOMPATIBLE_STORAGE_LAYOUT",
            Error::DeploymentFailed { .. } => "DEPLOYMENT_FAILED",
            Error::NetworkUnavailable(_) => "NETWORK_UNAVAILABLE",
            Error::Abi(_) => "ABI_ERROR",
            Error::InvalidRecord(_) => "INVALID_RECORD",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Hex(_) => "HEX_DECODE_ERROR",
        }
    }

    /// Contracts left on-chain by a failed deployment, if any
    pub fn partial(&self) -> Option<&PartialDeployment> {
        match self {
            Error::DeploymentFailed { partial, .. } => Some(partial),
            _ => None,
        }
    }

    pub fn invalid_artifact(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArtifact {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn deployment_failed(
        step: DeploymentStep,
        reason: impl fmt::Display,
        partial: PartialDeployment,
    ) -> Self {
        Error::DeploymentFailed {
            step,
            reason: reason.to_string(),
            partial,
        }
    }
}

/// The on-chain step that was in flight when a deployment failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStep {
    DeployImplementation,
    DeployProxy,
    Initialize,
    Upgrade,
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentStep::DeployImplementation => write!(f, "deploying the implementation"),
            DeploymentStep::DeployProxy => write!(f, "deploying the proxy"),
            DeploymentStep::Initialize => write!(f, "initializing the proxy"),
            DeploymentStep::Upgrade => write!(f, "upgrading the proxy"),
        }
    }
}

/// What a failed deployment left behind.
///
/// `stage` is the last persisted stage of the proxy record (`None` when no
/// record was created). `implementation` may name an implementation that was
/// deployed but never linked; a re-run reuses it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDeployment {
    pub stage: Option<ProxyStage>,
    pub implementation: Option<Address>,
    pub proxy: Option<Address>,
}

impl PartialDeployment {
    pub fn is_empty(&self) -> bool {
        self.implementation.is_none() && self.proxy.is_none()
    }
}

impl fmt::Display for PartialDeployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing deployed");
        }
        let mut parts = Vec::new();
        if let Some(implementation) = self.implementation {
            parts.push(format!("implementation {}", implementation));
        }
        if let Some(proxy) = self.proxy {
            parts.push(format!("proxy {}", proxy));
        }
        write!(f, "{}", parts.join(", "))?;
        if let Some(stage) = self.stage {
            write!(f, " (recorded at stage {})", stage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_deployment_display() {
        assert_eq!(PartialDeployment::default().to_string(), "nothing deployed");

        let partial = PartialDeployment {
            stage: Some(ProxyStage::ImplementationDeployed),
            implementation: Some(Address::repeat_byte(0x11)),
            proxy: None,
        };
        let text = partial.to_string();
        assert!(text.starts_with(&format!("implementation {}", Address::repeat_byte(0x11))));
        assert!(text.ends_with("(recorded at stage implementation_deployed)"));
    }
}
