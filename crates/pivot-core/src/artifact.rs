//! Artifact resolution
//!
//! Locates compiled contract definitions (bytecode + ABI) by logical name.
//!
//! - [`ArtifactResolver`] - the lookup seam used by the orchestrator
//! - [`FileSystemArtifactResolver`] - reads Foundry (`out/`) and Hardhat
//!   (`artifacts/`) build output

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::abi::Abi;
use crate::bytecode::Bytecode;
use crate::error::{Error, Result};
use crate::layout::StorageLayout;

// =============================================================================
// Artifact Types
// =============================================================================

/// A resolved, deployable contract
#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: Abi,
    /// Creation bytecode
    pub bytecode: Bytecode,
    pub storage_layout: Option<StorageLayout>,
}

impl ContractArtifact {
    /// Parse a Foundry or Hardhat artifact JSON document
    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let raw: RawArtifact = serde_json::from_str(json)
            .map_err(|e| Error::invalid_artifact(name, e.to_string()))?;

        let bytecode = Bytecode::from_hex(raw.bytecode.as_hex())
            .map_err(|e| Error::invalid_artifact(name, e.to_string()))?;
        if bytecode.is_empty() {
            return Err(Error::invalid_artifact(
                name,
                "no bytecode (may be an interface or abstract contract)",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            abi: Abi::from_value(&raw.abi)?,
            bytecode,
            storage_layout: raw.storage_layout,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    abi: serde_json::Value,
    bytecode: RawBytecode,
    #[serde(default)]
    storage_layout: Option<StorageLayout>,
}

/// Foundry nests bytecode in `{ "object": ... }`, Hardhat stores a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn as_hex(&self) -> &str {
        match self {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        }
    }
}

/// Information about a compiled artifact (for listing)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub name: String,
    pub path: PathBuf,
}

// =============================================================================
// Trait Definition
// =============================================================================

/// Looks up compiled contracts by name
pub trait ArtifactResolver: Send + Sync {
    /// Resolve a contract by name, failing with [`Error::ArtifactNotFound`]
    fn resolve(&self, name: &str) -> Result<ContractArtifact>;

    /// List all deployable artifacts, sorted by name
    fn list(&self) -> Result<Vec<ArtifactInfo>>;
}

// =============================================================================
// Filesystem Implementation
// =============================================================================

/// Resolver reading build output from disk
#[derive(Debug, Clone)]
pub struct FileSystemArtifactResolver {
    /// Directories searched in order (Foundry `out/`, Hardhat `artifacts/`)
    roots: Vec<PathBuf>,
}

impl FileSystemArtifactResolver {
    /// Default Foundry and Hardhat output directories under `project_root`
    pub fn with_paths(project_root: &Path) -> Self {
        Self {
            roots: vec![project_root.join("out"), project_root.join("artifacts")],
        }
    }

    /// Search only the given directories
    pub fn with_dirs(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Find every `<name>.json` below `root`, sorted for determinism
    fn find_in(&self, root: &Path, name: &str, found: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(root) else {
            return;
        };

        let file_name = format!("{}.json", name);
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if is_skipped_dir(&path) {
                    continue;
                }
                self.find_in(&path, name, found);
            } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name.as_str()) {
                found.push(path);
            }
        }
    }

    fn collect(&self, dir: &Path, out: &mut Vec<ArtifactInfo>) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::invalid_artifact(dir.display().to_string(), e.to_string()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if !is_skipped_dir(&path) {
                    self.collect(&path, out)?;
                }
                continue;
            }

            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            // Skip Hardhat debug files and metadata
            if stem.ends_with(".dbg") || stem.ends_with(".metadata") {
                continue;
            }

            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            if ContractArtifact::from_json(stem, &content).is_ok() {
                out.push(ArtifactInfo {
                    name: stem.to_string(),
                    path,
                });
            }
        }

        Ok(())
    }
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n == "build-info")
}

impl Default for FileSystemArtifactResolver {
    fn default() -> Self {
        Self::with_paths(Path::new("."))
    }
}

impl ArtifactResolver for FileSystemArtifactResolver {
    fn resolve(&self, name: &str) -> Result<ContractArtifact> {
        for root in &self.roots {
            let mut found = Vec::new();
            self.find_in(root, name, &mut found);
            found.sort();

            // Prefer `<name>.sol/<name>.json` over same-named files elsewhere
            found.sort_by_key(|p| {
                p.parent()
                    .and_then(|d| d.file_name())
                    .and_then(|d| d.to_str())
                    .is_none_or(|d| d != format!("{}.sol", name))
            });

            if let Some(path) = found.first() {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| Error::invalid_artifact(name, e.to_string()))?;
                return ContractArtifact::from_json(name, &content);
            }
        }

        Err(Error::ArtifactNotFound(format!(
            "{} (searched {}). Make sure the contracts were compiled.",
            name,
            self.roots
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    fn list(&self) -> Result<Vec<ArtifactInfo>> {
        let mut artifacts = Vec::new();
        for root in &self.roots {
            if root.is_dir() {
                self.collect(root, &mut artifacts)?;
            }
        }
        artifacts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Ok(artifacts)
    }
}
