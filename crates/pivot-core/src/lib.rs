pub mod abi;
pub mod artifact;
pub mod bytecode;
pub mod chain;
pub mod dir;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod proxy;
pub mod repository;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use abi::{json_to_sol_value, parse_int, parse_uint, Abi, InitCall};
pub use artifact::{ArtifactInfo, ArtifactResolver, ContractArtifact, FileSystemArtifactResolver};
pub use bytecode::Bytecode;
pub use chain::{Chain, ChainError, TxReceipt, TxRequest, ADMIN_SLOT, IMPLEMENTATION_SLOT};
pub use dir::PivotDir;
pub use error::{DeploymentStep, Error, PartialDeployment, Result};
pub use layout::{check_compatible, StorageItem, StorageLayout};
pub use orchestrator::Orchestrator;
pub use repository::{ImplementationRepository, Manifest, NetworkRepository, ProxyRepository};
pub use types::*;
