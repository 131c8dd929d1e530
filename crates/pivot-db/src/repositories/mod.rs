//! Repository trait implementations for SQLite
//!
//! Each repository is implemented in its own module.

mod implementation;
mod network;
mod proxy;

use pivot_core::{ImplementationRepository, Manifest, NetworkRepository, ProxyRepository};

use crate::Database;

impl Manifest for Database {
    fn networks(&self) -> &dyn NetworkRepository {
        self
    }

    fn implementations(&self) -> &dyn ImplementationRepository {
        self
    }

    fn proxies(&self) -> &dyn ProxyRepository {
        self
    }
}
