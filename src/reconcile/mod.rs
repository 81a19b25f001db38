//! Entity context reconciliation: re-homing entity instances onto the
//! currently active persistence context.
//!
//! None of these operations surface errors to the caller. An underlying
//! lookup failure is logged with the entity's type and identifier and the
//! original instance is returned; the caller always gets the best available
//! reference. Re-fetch-by-identifier is the only reattachment policy offered:
//! merging an object graph across two unit-of-work instances risks silently
//! binding entities to the wrong connection.

use log::warn;
use std::sync::Arc;

use crate::context::PersistenceContext;
use crate::entity::{EntityHandle, EntityRef};

/// Normalizes entity instances against one persistence context.
#[derive(Clone)]
pub struct EntityReconciler {
    context: Arc<PersistenceContext>,
}

impl EntityReconciler {
    pub fn new(context: Arc<PersistenceContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<PersistenceContext> {
        &self.context
    }

    /// Returns an instance that is managed by the current context.
    ///
    /// Already-tracked instances come back unchanged. Identifier-carrying
    /// instances are looked up fresh in the current context, discarding the
    /// caller's possibly stale copy. New entities come back unchanged; the
    /// caller still has to register them for persistence.
    pub async fn ensure_managed(&self, entity: EntityHandle) -> EntityHandle {
        if self.context.is_tracked(&entity).await {
            return entity;
        }

        let (entity_type, id) = {
            let guard = entity.read().await;
            (guard.entity_type(), guard.id())
        };

        match id {
            Some(id) => match self.context.fetch(entity_type, id).await {
                Ok(fresh) => fresh,
                Err(err) => {
                    warn!(
                        "ensure_managed fetch failed: entity='{}' id='{}' error='{}'",
                        entity_type, id, err
                    );
                    entity
                }
            },
            None => entity,
        }
    }

    /// Reloads a tracked entity's state in place; falls back to
    /// [`EntityReconciler::ensure_managed`] for untracked instances.
    /// Entities without an identifier cannot be refreshed.
    pub async fn refresh(&self, entity: EntityHandle) -> EntityHandle {
        let (entity_type, id) = {
            let guard = entity.read().await;
            (guard.entity_type(), guard.id())
        };
        let Some(id) = id else {
            return entity;
        };

        if self.context.is_tracked(&entity).await {
            if let Err(err) = self.context.refresh_tracked(&entity).await {
                warn!(
                    "refresh failed: entity='{}' id='{}' error='{}'",
                    entity_type, id, err
                );
            }
            return entity;
        }

        self.ensure_managed(entity).await
    }

    /// True iff the current context tracks this exact instance.
    pub async fn is_managed(&self, entity: &EntityHandle) -> bool {
        self.context.is_tracked(entity).await
    }

    /// Turns a lazy reference into a loaded instance from the current
    /// context. Already-loaded refs come back unchanged, as does the
    /// original reference when the lookup fails.
    pub async fn resolve_proxy(&self, reference: EntityRef) -> EntityRef {
        match reference {
            EntityRef::Loaded(_) => reference,
            EntityRef::Reference { entity_type, id } => {
                match self.context.fetch(entity_type, id).await {
                    Ok(handle) => EntityRef::Loaded(handle),
                    Err(err) => {
                        warn!(
                            "proxy resolution failed: entity='{}' id='{}' error='{}'",
                            entity_type, id, err
                        );
                        EntityRef::Reference { entity_type, id }
                    }
                }
            }
        }
    }

    /// Stops tracking the instance. Returns whether it was tracked.
    pub async fn detach(&self, entity: &EntityHandle) -> bool {
        self.context.evict(entity).await
    }

    /// Reattaches a detached instance by re-fetching it from the current
    /// context; registers new entities for persistence. Idempotent: calling
    /// it again on the result yields the same managed instance.
    pub async fn merge_detached(&self, entity: EntityHandle) -> EntityHandle {
        if self.context.is_tracked(&entity).await {
            return entity;
        }

        let (entity_type, id) = {
            let guard = entity.read().await;
            (guard.entity_type(), guard.id())
        };

        match id {
            Some(id) => match self.context.fetch(entity_type, id).await {
                Ok(fresh) => fresh,
                Err(err) => {
                    warn!(
                        "merge_detached fetch failed: entity='{}' id='{}' error='{}'",
                        entity_type, id, err
                    );
                    entity
                }
            },
            None => {
                self.context.register_insert(&entity).await;
                entity
            }
        }
    }

    /// True iff the entity carries an identifier but this exact instance is
    /// not tracked by the current context. A brand-new entity is never
    /// detached.
    pub async fn is_detached(&self, entity: &EntityHandle) -> bool {
        let has_id = entity.read().await.id().is_some();
        has_id && !self.context.is_tracked(entity).await
    }

    /// Evicts every tracked entity from the current context's unit of work.
    /// Committed data is unaffected.
    pub async fn clear_context_cache(&self) {
        self.context.clear().await;
    }
}
