//! Initialize pivot in a contracts project

use std::path::Path;
use std::process::ExitCode;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use pivot_core::PivotDir;
use pivot_db::Database;

use crate::config::{PivotConfig, CONFIG_FILE, SAMPLE_CONFIG};

/// Initialize pivot in a contracts project
#[derive(Args)]
pub struct InitCommand;

impl InitCommand {
    pub async fn run(self) -> Result<ExitCode> {
        let dir = PivotDir::new();
        if dir.database_path().exists() {
            return Err(eyre!(
                "Pivot is already initialized in this project ({} exists)",
                PivotDir::NAME
            ));
        }

        dir.create()?;
        println!("{} Created {}/", style("✓").green(), PivotDir::NAME);

        let db = Database::open(&dir).await?;
        db.init_schema().await?;
        println!("{} Initialized deployment manifest", style("✓").green());

        if PivotConfig::exists() {
            println!(
                "{} Keeping existing {}",
                style("→").blue(),
                style(CONFIG_FILE).cyan()
            );
        } else {
            std::fs::write(CONFIG_FILE, SAMPLE_CONFIG)?;
            println!("{} Wrote sample {}", style("✓").green(), CONFIG_FILE);
        }

        add_to_gitignore(Path::new(".gitignore"), ".env")?;

        println!();
        println!("{} Pivot initialized successfully!", style("✓").green().bold());
        println!();
        println!("Next steps:");
        println!(
            "  1. Configure networks and proxies in {}",
            style(CONFIG_FILE).cyan()
        );
        println!(
            "  2. Compile your contracts, including {} and {}",
            style("ERC1967Proxy").cyan(),
            style("TransparentUpgradeableProxy").cyan()
        );
        println!(
            "  3. Run {} to deploy",
            style("pivot deploy --all --network <name>").cyan()
        );

        Ok(ExitCode::SUCCESS)
    }
}

/// Append `entry` to an existing .gitignore unless already listed
fn add_to_gitignore(gitignore_path: &Path, entry: &str) -> Result<()> {
    if !gitignore_path.exists() {
        return Ok(());
    }

    let content = std::fs::read_to_string(gitignore_path)?;
    let has_entry = content
        .lines()
        .any(|line| line.trim() == entry || line.trim() == format!("{}/", entry));
    if !has_entry {
        let mut new_content = content;
        if !new_content.is_empty() && !new_content.ends_with('\n') {
            new_content.push('\n');
        }
        new_content.push_str(entry);
        new_content.push('\n');
        std::fs::write(gitignore_path, new_content)?;
        println!("{} Added {} to .gitignore", style("✓").green(), entry);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_gitignore_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitignore");
        std::fs::write(&path, "node_modules").unwrap();

        add_to_gitignore(&path, ".env").unwrap();
        add_to_gitignore(&path, ".env").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "node_modules\n.env\n");
    }

    #[test]
    fn test_add_to_gitignore_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitignore");
        add_to_gitignore(&path, ".env").unwrap();
        assert!(!path.exists());
    }
}
