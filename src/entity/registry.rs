use std::collections::HashMap;
use std::sync::Arc;

use super::{EntityFactory, EntityHandle};
use crate::core::{EntityId, Result, StoreError};

type FactoryFn = dyn Fn(EntityId, &serde_json::Value) -> Result<EntityHandle> + Send + Sync;

struct RegisteredType {
    table_name: String,
    factory: Arc<FactoryFn>,
}

/// Maps entity type names to their table and reconstruction function.
///
/// Every type that can be fetched by identifier must be registered here
/// before the first request touches it.
#[derive(Default)]
pub struct EntityRegistry {
    types: HashMap<&'static str, RegisteredType>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: EntityFactory>(&mut self) -> &mut Self {
        self.types.insert(
            E::entity_type_name(),
            RegisteredType {
                table_name: E::default_table_name(),
                factory: Arc::new(|id, fields| E::from_state(id, fields).map(EntityHandle::new)),
            },
        );
        self
    }

    pub fn is_registered(&self, entity_type: &str) -> bool {
        self.types.contains_key(entity_type)
    }

    pub fn table_for(&self, entity_type: &str) -> Result<&str> {
        self.types
            .get(entity_type)
            .map(|t| t.table_name.as_str())
            .ok_or_else(|| StoreError::UnknownEntityType(entity_type.to_string()))
    }

    /// Reconstructs a fresh handle from stored state.
    pub fn build(
        &self,
        entity_type: &str,
        id: EntityId,
        fields: &serde_json::Value,
    ) -> Result<EntityHandle> {
        let registered = self
            .types
            .get(entity_type)
            .ok_or_else(|| StoreError::UnknownEntityType(entity_type.to_string()))?;
        (registered.factory)(id, fields)
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}
