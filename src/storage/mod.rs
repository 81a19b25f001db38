//! Datastore abstraction and the in-memory backend.
//!
//! The persistence core never speaks SQL or a wire protocol; it hands keyed
//! JSON documents to whatever implements [`Datastore`]. One backend instance
//! exists per environment, so rows written under "dev" are invisible to
//! "prod" and vice versa.

mod memory;

pub use memory::MemoryBackend;

use async_trait::async_trait;

use crate::core::{EntityId, Result};

/// Connection-level datastore operations, keyed by table and identifier.
///
/// Identifier assignment happens here: `insert` returns the id the row was
/// stored under. Timeout/retry policy belongs to the driver behind this
/// trait, not to the persistence core.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Stores a new row and returns its assigned identifier.
    async fn insert(&self, table: &str, fields: &serde_json::Value) -> Result<EntityId>;

    /// Reads a row's field snapshot; `None` if absent.
    async fn get(&self, table: &str, id: EntityId) -> Result<Option<serde_json::Value>>;

    /// Overwrites an existing row. Returns false if the row does not exist.
    async fn update(&self, table: &str, id: EntityId, fields: &serde_json::Value) -> Result<bool>;

    /// Deletes a row. Returns false if the row does not exist.
    async fn delete(&self, table: &str, id: EntityId) -> Result<bool>;

    /// Number of committed rows in a table.
    async fn row_count(&self, table: &str) -> usize;
}
