//! ProxyRepository implementation for SQLite

use async_trait::async_trait;
use pivot_core::{NetworkId, ProxyRecord, ProxyRepository, ProxyVersion, Result};

use crate::models::{address_to_db, hash_to_db, layout_to_db, ProxyRow, ProxyVersionRow};
use crate::Database;

#[async_trait]
impl ProxyRepository for Database {
    async fn get(&self, network: NetworkId, name: &str) -> Result<Option<ProxyRecord>> {
        let row = sqlx::query_as::<_, ProxyRow>(
            "SELECT * FROM proxies WHERE network_id = ? AND name = ?",
        )
        .bind(network.0)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProxyRecord::try_from).transpose()
    }

    async fn save(&self, network: NetworkId, record: &ProxyRecord) -> Result<()> {
        let implementation = &record.implementation;
        let mut tx = self.pool.begin().await?;

        let stored_version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM proxies WHERE network_id = ? AND name = ?")
                .bind(network.0)
                .bind(&record.name)
                .fetch_optional(&mut *tx)
                .await?;

        let proxy_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO proxies (
                network_id, name, contract_name, kind, stage, address, admin_address,
                implementation_address, implementation_hash, implementation_tx_hash,
                storage_layout, version, init_tx_hash
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(network_id, name) DO UPDATE SET
                contract_name = excluded.contract_name,
                kind = excluded.kind,
                stage = excluded.stage,
                address = excluded.address,
                admin_address = excluded.admin_address,
                implementation_address = excluded.implementation_address,
                implementation_hash = excluded.implementation_hash,
                implementation_tx_hash = excluded.implementation_tx_hash,
                storage_layout = excluded.storage_layout,
                version = excluded.version,
                init_tx_hash = excluded.init_tx_hash,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id
            "#,
        )
        .bind(network.0)
        .bind(&record.name)
        .bind(&implementation.contract)
        .bind(record.kind)
        .bind(record.stage)
        .bind(record.proxy.as_ref().map(address_to_db))
        .bind(record.admin.as_ref().map(address_to_db))
        .bind(address_to_db(&implementation.address))
        .bind(hash_to_db(&implementation.bytecode_hash))
        .bind(implementation.tx_hash.map(|h| h.to_string()))
        .bind(layout_to_db(implementation.storage_layout.as_ref())?)
        .bind(record.version)
        .bind(record.init_tx_hash.map(|h| h.to_string()))
        .fetch_one(&mut *tx)
        .await?;

        if record.version > stored_version.unwrap_or(0) {
            sqlx::query(
                r#"
                INSERT INTO proxy_versions (proxy_id, version, implementation_address)
                VALUES (?, ?, ?)
                ON CONFLICT(proxy_id, version) DO UPDATE SET
                    implementation_address = excluded.implementation_address
                "#,
            )
            .bind(proxy_id)
            .bind(record.version)
            .bind(address_to_db(&implementation.address))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, network: NetworkId) -> Result<Vec<ProxyRecord>> {
        let rows = sqlx::query_as::<_, ProxyRow>(
            "SELECT * FROM proxies WHERE network_id = ? ORDER BY name",
        )
        .bind(network.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProxyRecord::try_from).collect()
    }

    async fn versions(&self, network: NetworkId, name: &str) -> Result<Vec<ProxyVersion>> {
        let rows = sqlx::query_as::<_, ProxyVersionRow>(
            r#"
            SELECT v.version, v.implementation_address, v.linked_at
            FROM proxy_versions v
            JOIN proxies p ON v.proxy_id = p.id
            WHERE p.network_id = ? AND p.name = ?
            ORDER BY v.version
            "#,
        )
        .bind(network.0)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProxyVersion::try_from).collect()
    }
}
