use sqlx::SqlitePool;

use pivot_core::Error;

/// SQL schema for initializing the manifest
pub const SCHEMA: &str = r#"
-- Networks deployed to
CREATE TABLE IF NOT EXISTS networks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    chain_id INTEGER NOT NULL,
    rpc_url TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Every implementation contract deployed, linked or not
CREATE TABLE IF NOT EXISTS implementations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    network_id INTEGER NOT NULL REFERENCES networks(id),
    contract_name TEXT NOT NULL,
    address TEXT NOT NULL,
    bytecode_hash TEXT NOT NULL,
    tx_hash TEXT,
    storage_layout JSON,
    deployed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(network_id, address)
);

CREATE INDEX IF NOT EXISTS idx_implementations_lookup
    ON implementations(network_id, contract_name, bytecode_hash);

-- Logical proxies and the implementation they currently point at
CREATE TABLE IF NOT EXISTS proxies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    network_id INTEGER NOT NULL REFERENCES networks(id),
    name TEXT NOT NULL,
    contract_name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('uups', 'transparent')),
    stage TEXT NOT NULL CHECK (stage IN ('implementation_deployed', 'proxy_deployed', 'initialized')),
    address TEXT,
    admin_address TEXT,
    implementation_address TEXT NOT NULL,
    implementation_hash TEXT NOT NULL,
    implementation_tx_hash TEXT,
    storage_layout JSON,
    version INTEGER NOT NULL DEFAULT 0,
    init_tx_hash TEXT,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(network_id, name)
);

-- One row per implementation linked to a proxy
CREATE TABLE IF NOT EXISTS proxy_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    proxy_id INTEGER NOT NULL REFERENCES proxies(id),
    version INTEGER NOT NULL,
    implementation_address TEXT NOT NULL,
    linked_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(proxy_id, version)
);
"#;

/// Initialize the database schema
pub async fn init_schema(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
