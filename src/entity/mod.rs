//! Entity contracts: the traits a domain type implements to participate in
//! dual-environment persistence, plus the shared handle type used to pass
//! instances between contexts, reconciler, and validators.

mod metadata;
mod reference;
mod registry;

pub use metadata::EntityMetadata;
pub use reference::EntityRef;
pub use registry::EntityRegistry;

use std::any::Any;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{EntityId, EntityKey, RelationDescriptor, Result};

/// Core trait for entities routed through a persistence context.
///
/// Implementors provide identifier access, a JSON field snapshot, and the
/// declarative relation table consulted by cascade validation.
pub trait Entity: Send + Sync + 'static {
    /// Unique type name of the entity.
    fn entity_type(&self) -> &'static str;
    /// Datastore table this entity is stored in.
    fn table_name(&self) -> &str;
    /// Assigned identifier, if the entity has been committed.
    fn id(&self) -> Option<EntityId>;
    /// Called once by the context when the datastore assigns an identifier.
    fn assign_id(&mut self, id: EntityId);
    /// Persistence bookkeeping.
    fn metadata(&self) -> &EntityMetadata;
    fn metadata_mut(&mut self) -> &mut EntityMetadata;
    /// Snapshot of the entity's fields as a JSON object.
    fn state(&self) -> Result<serde_json::Value>;
    /// Replaces the entity's fields in place from a stored snapshot.
    fn load_state(&mut self, fields: &serde_json::Value) -> Result<()>;
    /// Declared relations of this entity type.
    fn relations(&self) -> &'static [RelationDescriptor] {
        &[]
    }
    /// Live targets of a named relation.
    fn relation_targets(&self, _relation: &str) -> Vec<EntityRef> {
        Vec::new()
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Trait for entity types that can be reconstructed from stored state,
/// which is what fetch-by-identifier needs.
pub trait EntityFactory: Entity + Sized {
    /// Static type name, matching `Entity::entity_type`.
    fn entity_type_name() -> &'static str;

    /// Default table name for this type.
    fn default_table_name() -> String {
        format!("{}s", Self::entity_type_name())
    }

    /// Reconstructs the entity from its stored field snapshot.
    fn from_state(id: EntityId, fields: &serde_json::Value) -> Result<Self>;
}

/// Shared, lock-guarded handle to an entity instance.
///
/// Instance identity (the thing "managed" is defined over) is pointer
/// identity of the handle, not value equality.
#[derive(Clone)]
pub struct EntityHandle {
    inner: Arc<RwLock<dyn Entity>>,
}

impl EntityHandle {
    pub fn new<E: Entity>(entity: E) -> Self {
        let inner: Arc<RwLock<dyn Entity>> = Arc::new(RwLock::new(entity));
        Self { inner }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, dyn Entity> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, dyn Entity> {
        self.inner.write().await
    }

    /// True iff both handles point at the same live instance.
    pub fn same_instance(&self, other: &EntityHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Tracking key, present only once an identifier has been assigned.
    pub async fn key(&self) -> Option<EntityKey> {
        let guard = self.read().await;
        guard.id().map(|id| EntityKey::new(guard.entity_type(), id))
    }

    /// Log-friendly label: `customer#42`, or `customer#new` before commit.
    pub async fn describe(&self) -> String {
        let guard = self.read().await;
        match guard.id() {
            Some(id) => format!("{}#{}", guard.entity_type(), id),
            None => format!("{}#new", guard.entity_type()),
        }
    }
}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandle")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}
