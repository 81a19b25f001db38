use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::Datastore;
use crate::core::{EntityId, Result};

/// In-memory datastore: tables of id-keyed JSON rows plus a process-wide
/// id sequence per backend instance.
pub struct MemoryBackend {
    label: String,
    tables: RwLock<HashMap<String, BTreeMap<EntityId, serde_json::Value>>>,
    next_id: AtomicI64,
}

impl MemoryBackend {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_id_seed(label, 1)
    }

    pub fn with_id_seed(label: impl Into<String>, id_seed: EntityId) -> Self {
        Self {
            label: label.into(),
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(id_seed),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Datastore for MemoryBackend {
    async fn insert(&self, table: &str, fields: &serde_json::Value) -> Result<EntityId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(id, fields.clone());
        Ok(id)
    }

    async fn get(&self, table: &str, id: EntityId) -> Result<Option<serde_json::Value>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|rows| rows.get(&id)).cloned())
    }

    async fn update(&self, table: &str, id: EntityId, fields: &serde_json::Value) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.get_mut(table).and_then(|rows| rows.get_mut(&id)) {
            Some(row) => {
                *row = fields.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, table: &str, id: EntityId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(table)
            .map(|rows| rows.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }
}
