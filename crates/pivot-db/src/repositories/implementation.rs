//! ImplementationRepository implementation for SQLite

use async_trait::async_trait;
use pivot_core::{Address, ImplementationRecord, ImplementationRepository, NetworkId, Result, B256};

use crate::models::{address_to_db, hash_to_db, layout_to_db, ImplementationRow};
use crate::Database;

#[async_trait]
impl ImplementationRepository for Database {
    async fn find(
        &self,
        network: NetworkId,
        contract: &str,
        bytecode_hash: &B256,
    ) -> Result<Option<ImplementationRecord>> {
        let row = sqlx::query_as::<_, ImplementationRow>(
            r#"
            SELECT * FROM implementations
            WHERE network_id = ? AND contract_name = ? AND bytecode_hash = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(network.0)
        .bind(contract)
        .bind(hash_to_db(bytecode_hash))
        .fetch_optional(&self.pool)
        .await?;

        row.map(ImplementationRecord::try_from).transpose()
    }

    async fn record(&self, network: NetworkId, implementation: &ImplementationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO implementations (network_id, contract_name, address, bytecode_hash, tx_hash, storage_layout)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(network_id, address) DO UPDATE SET
                contract_name = excluded.contract_name,
                bytecode_hash = excluded.bytecode_hash,
                tx_hash = excluded.tx_hash,
                storage_layout = excluded.storage_layout
            "#,
        )
        .bind(network.0)
        .bind(&implementation.contract)
        .bind(address_to_db(&implementation.address))
        .bind(hash_to_db(&implementation.bytecode_hash))
        .bind(implementation.tx_hash.map(|h| h.to_string()))
        .bind(layout_to_db(implementation.storage_layout.as_ref())?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn forget(&self, network: NetworkId, address: &Address) -> Result<()> {
        sqlx::query("DELETE FROM implementations WHERE network_id = ? AND address = ?")
            .bind(network.0)
            .bind(address_to_db(address))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
