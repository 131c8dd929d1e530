//! List compiled artifacts

use std::process::ExitCode;

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use pivot_core::{ArtifactResolver, FileSystemArtifactResolver};

use crate::config::PivotConfig;

/// List compiled artifacts that can be deployed
#[derive(Args)]
pub struct ArtifactsCommand;

impl ArtifactsCommand {
    pub async fn run(self) -> Result<ExitCode> {
        let paths = if PivotConfig::exists() {
            PivotConfig::load()?.artifacts.paths
        } else {
            Default::default()
        };
        let resolver = if paths.is_empty() {
            FileSystemArtifactResolver::default()
        } else {
            FileSystemArtifactResolver::with_dirs(paths)
        };

        let artifacts = resolver.list()?;
        if artifacts.is_empty() {
            println!(
                "{} No artifacts found. Compile your contracts first.",
                style("⚠").yellow()
            );
            return Ok(ExitCode::SUCCESS);
        }

        for artifact in &artifacts {
            println!(
                "{:<32} {}",
                style(&artifact.name).cyan(),
                style(artifact.path.display()).dim()
            );
        }
        println!();
        println!("Total: {} artifact(s)", artifacts.len());

        Ok(ExitCode::SUCCESS)
    }
}
