//! NetworkRepository implementation for SQLite

use async_trait::async_trait;
use pivot_core::{Error, Network, NetworkRepository, NewNetwork, Result};

use crate::models::NetworkRow;
use crate::Database;

#[async_trait]
impl NetworkRepository for Database {
    async fn list(&self) -> Result<Vec<Network>> {
        let rows = sqlx::query_as::<_, NetworkRow>("SELECT * FROM networks ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Network::from).collect())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Network>> {
        let row = sqlx::query_as::<_, NetworkRow>("SELECT * FROM networks WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Network::from))
    }

    async fn upsert(&self, network: &NewNetwork) -> Result<Network> {
        sqlx::query(
            r#"
            INSERT INTO networks (name, chain_id, rpc_url)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                chain_id = excluded.chain_id,
                rpc_url = excluded.rpc_url
            "#,
        )
        .bind(&network.name)
        .bind(network.chain_id as i64)
        .bind(&network.rpc_url)
        .execute(&self.pool)
        .await?;

        NetworkRepository::get_by_name(self, &network.name)
            .await?
            .ok_or_else(|| Error::InvalidRecord(format!("network '{}' was not stored", network.name)))
    }
}
