//! SQLite deployment manifest for Pivot
//!
//! [`Database`] implements the repository traits from `pivot-core`, so it can
//! be handed to the orchestrator as its [`pivot_core::Manifest`].

pub mod models;
mod repositories;
mod schema;

pub use models::*;

use pivot_core::{PivotDir, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite database connection and repository implementation
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the manifest inside a project's `.pivot/` directory
    pub async fn open(dir: &PivotDir) -> Result<Self> {
        Self::connect_to(&dir.database_url()).await
    }

    /// Connect to a specific database file or URL
    pub async fn connect_to(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens a separate database
        let max_connections = if path.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        schema::init_schema(&self.pool).await
    }
}
