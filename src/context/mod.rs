//! The persistence context: one connection plus one unit of work per
//! environment tag, and the provider that caches them process-wide.

mod provider;
mod unit_of_work;

pub use provider::ContextProvider;

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::{ContextId, EntityId, EntityKey, Result, StoreError};
use crate::entity::{EntityHandle, EntityRegistry};
use crate::env::EnvironmentTag;
use crate::storage::Datastore;
use unit_of_work::{PendingOp, UnitOfWork};

/// Connection + unit of work bound to one environment tag.
///
/// An entity instance is managed by at most one context at a time; the
/// context stamps its [`ContextId`] into the entity's metadata while it
/// tracks the instance.
pub struct PersistenceContext {
    id: ContextId,
    tag: EnvironmentTag,
    datastore: Arc<dyn Datastore>,
    registry: Arc<EntityRegistry>,
    created_at: DateTime<Utc>,
    uow: Mutex<UnitOfWork>,
}

impl PersistenceContext {
    pub fn new(
        tag: EnvironmentTag,
        datastore: Arc<dyn Datastore>,
        registry: Arc<EntityRegistry>,
    ) -> Self {
        Self {
            id: ContextId::new(),
            tag,
            datastore,
            registry,
            created_at: Utc::now(),
            uow: Mutex::new(UnitOfWork::default()),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn tag(&self) -> EnvironmentTag {
        self.tag
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.datastore
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// True iff this exact instance is tracked by the unit of work.
    pub async fn is_tracked(&self, handle: &EntityHandle) -> bool {
        let Some(key) = handle.key().await else {
            return false;
        };
        let uow = self.uow.lock().await;
        uow.tracked_instance(&key)
            .map(|tracked| tracked.same_instance(handle))
            .unwrap_or(false)
    }

    /// Tracked-map hit only; never touches the datastore.
    pub async fn lookup(&self, entity_type: &'static str, id: EntityId) -> Option<EntityHandle> {
        let uow = self.uow.lock().await;
        uow.tracked_instance(&EntityKey::new(entity_type, id))
            .cloned()
    }

    /// Returns the tracked instance for this key, fetching and tracking a
    /// fresh one from the datastore on a miss.
    pub async fn fetch(&self, entity_type: &'static str, id: EntityId) -> Result<EntityHandle> {
        if let Some(existing) = self.lookup(entity_type, id).await {
            return Ok(existing);
        }

        let table = self.registry.table_for(entity_type)?.to_string();
        let fields = self
            .datastore
            .get(&table, id)
            .await?
            .ok_or_else(|| StoreError::EntityNotFound {
                entity_type: entity_type.to_string(),
                id,
            })?;

        let handle = self.registry.build(entity_type, id, &fields)?;
        self.track(&handle).await;
        Ok(handle)
    }

    /// Begins tracking an identifier-carrying instance. Returns false for
    /// entities without an identifier.
    pub async fn track(&self, handle: &EntityHandle) -> bool {
        let Some(key) = handle.key().await else {
            return false;
        };
        handle.write().await.metadata_mut().mark_managed(self.id);
        let mut uow = self.uow.lock().await;
        uow.track(key, handle.clone());
        true
    }

    /// Stops tracking this exact instance; the entity becomes detached.
    pub async fn evict(&self, handle: &EntityHandle) -> bool {
        let removed = {
            let mut uow = self.uow.lock().await;
            uow.untrack_instance(handle)
        };
        if removed {
            handle.write().await.metadata_mut().mark_detached();
        }
        removed
    }

    /// Evicts everything tracked and drops the pending batch. Committed
    /// rows are untouched.
    pub async fn clear(&self) {
        let handles = {
            let mut uow = self.uow.lock().await;
            uow.clear_pending();
            uow.drain_tracked()
        };
        for handle in handles {
            handle.write().await.metadata_mut().mark_detached();
        }
    }

    pub async fn register_insert(&self, handle: &EntityHandle) {
        let mut uow = self.uow.lock().await;
        uow.register(PendingOp::Insert(handle.clone()));
    }

    pub async fn register_update(&self, handle: &EntityHandle) {
        let mut uow = self.uow.lock().await;
        uow.register(PendingOp::Update(handle.clone()));
    }

    pub async fn register_remove(&self, handle: &EntityHandle) {
        let mut uow = self.uow.lock().await;
        uow.register(PendingOp::Remove(handle.clone()));
    }

    pub async fn is_pending_removal(&self, handle: &EntityHandle) -> bool {
        let uow = self.uow.lock().await;
        uow.has_pending_removal(handle)
    }

    pub async fn pending_count(&self) -> usize {
        let uow = self.uow.lock().await;
        uow.pending_count()
    }

    /// Reloads a tracked entity's fields from the datastore in place.
    pub async fn refresh_tracked(&self, handle: &EntityHandle) -> Result<()> {
        let (table, id, entity_type) = {
            let guard = handle.read().await;
            (
                guard.table_name().to_string(),
                guard.id(),
                guard.entity_type(),
            )
        };
        let Some(id) = id else {
            return Ok(());
        };

        let fields = self
            .datastore
            .get(&table, id)
            .await?
            .ok_or_else(|| StoreError::EntityNotFound {
                entity_type: entity_type.to_string(),
                id,
            })?;

        let mut guard = handle.write().await;
        guard.load_state(&fields)?;
        guard.metadata_mut().touch_loaded();
        Ok(())
    }

    /// Applies the pending batch against the datastore, strictly in
    /// registration order.
    ///
    /// Inserts assign the identifier and begin tracking; updates overwrite
    /// the row and bump the entity version; removals delete the row and
    /// evict the instance. A failed operation aborts the flush and discards
    /// the remainder of the batch.
    pub async fn flush(&self) -> Result<()> {
        let ops = {
            let mut uow = self.uow.lock().await;
            uow.take_pending()
        };

        for op in ops {
            match op {
                PendingOp::Insert(handle) => self.flush_insert(&handle).await?,
                PendingOp::Update(handle) => self.flush_update(&handle).await?,
                PendingOp::Remove(handle) => self.flush_remove(&handle).await?,
            }
        }

        Ok(())
    }

    /// Drops the registered-but-unflushed batch.
    pub async fn discard_pending(&self) {
        let mut uow = self.uow.lock().await;
        uow.clear_pending();
    }

    pub async fn stats(&self) -> ContextStats {
        let uow = self.uow.lock().await;
        ContextStats {
            tag: self.tag,
            tracked_entities: uow.tracked_count(),
            pending_operations: uow.pending_count(),
            created_at: self.created_at,
        }
    }

    async fn flush_insert(&self, handle: &EntityHandle) -> Result<()> {
        let (table, fields, existing_id, entity_type) = {
            let guard = handle.read().await;
            (
                guard.table_name().to_string(),
                guard.state()?,
                guard.id(),
                guard.entity_type(),
            )
        };

        match existing_id {
            // Re-registration of an id-carrying instance writes in place.
            // Identifiers minted elsewhere are never adopted.
            Some(id) => {
                let found = self.datastore.update(&table, id, &fields).await?;
                if !found {
                    return Err(StoreError::EntityNotFound {
                        entity_type: entity_type.to_string(),
                        id,
                    });
                }
            }
            None => {
                let id = self.datastore.insert(&table, &fields).await?;
                let mut guard = handle.write().await;
                guard.assign_id(id);
                guard.metadata_mut().mark_managed(self.id);
                guard.metadata_mut().touch_loaded();
            }
        }

        self.track(handle).await;
        Ok(())
    }

    async fn flush_update(&self, handle: &EntityHandle) -> Result<()> {
        let (table, fields, id, entity_type) = {
            let guard = handle.read().await;
            (
                guard.table_name().to_string(),
                guard.state()?,
                guard.id(),
                guard.entity_type(),
            )
        };
        let Some(id) = id else {
            return Err(StoreError::Execution(
                "Update registered for an entity without an identifier".to_string(),
            ));
        };

        let found = self.datastore.update(&table, id, &fields).await?;
        if !found {
            return Err(StoreError::EntityNotFound {
                entity_type: entity_type.to_string(),
                id,
            });
        }

        let mut guard = handle.write().await;
        guard.metadata_mut().version += 1;
        guard.metadata_mut().touch_loaded();
        Ok(())
    }

    async fn flush_remove(&self, handle: &EntityHandle) -> Result<()> {
        let (table, id) = {
            let guard = handle.read().await;
            (guard.table_name().to_string(), guard.id())
        };
        let Some(id) = id else {
            return Err(StoreError::Execution(
                "Removal registered for an entity without an identifier".to_string(),
            ));
        };

        self.datastore.delete(&table, id).await?;

        {
            let mut uow = self.uow.lock().await;
            uow.untrack_instance(handle);
        }
        handle.write().await.metadata_mut().mark_detached();
        Ok(())
    }
}

impl fmt::Debug for PersistenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceContext")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Point-in-time context diagnostics.
#[derive(Debug, Clone)]
pub struct ContextStats {
    pub tag: EnvironmentTag,
    pub tracked_entities: usize,
    pub pending_operations: usize,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for ContextStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context[{}]: {} tracked, {} pending",
            self.tag, self.tracked_entities, self.pending_operations
        )
    }
}
