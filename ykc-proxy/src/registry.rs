//! Device id to connection mapping
//!
//! Entries are created when a pile verifies (01) or a station logs in (81)
//! and replaced when the same device reconnects. A closing connection only
//! evicts the entries it still owns.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::connection::Connection;
use crate::error::{ProxyError, Result};

/// Thread-safe registry of live device connections
#[derive(Debug, Default)]
pub struct Registry {
    clients: RwLock<HashMap<String, Arc<Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the superseded handle
    pub fn store(
        &self,
        device_id: impl Into<String>,
        conn: Arc<Connection>,
    ) -> Option<Arc<Connection>> {
        let device_id = device_id.into();
        debug!(device_id = %device_id, conn = %conn.id(), "Registering client");
        self.clients.write().insert(device_id, conn)
    }

    pub fn get(&self, device_id: &str) -> Result<Arc<Connection>> {
        self.clients
            .read()
            .get(device_id)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownClient(device_id.to_string()))
    }

    /// Remove `device_id` only while it still maps to `conn`
    pub fn remove(&self, device_id: &str, conn: &Connection) -> bool {
        let mut clients = self.clients.write();
        match clients.get(device_id) {
            Some(current) if current.id() == conn.id() => {
                clients.remove(device_id);
                true
            }
            _ => false,
        }
    }

    /// Drop every entry owned by a closing connection, returning their ids
    pub fn evict_connection(&self, conn_id: Uuid) -> Vec<String> {
        let mut clients = self.clients.write();
        let owned: Vec<String> = clients
            .iter()
            .filter(|(_, c)| c.id() == conn_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &owned {
            clients.remove(id);
        }
        owned
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.clients.read().keys().cloned().collect()
    }
}
