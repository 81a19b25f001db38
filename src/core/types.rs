use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Numeric identifier assigned by the datastore at commit time.
pub type EntityId = i64;

/// Lookup key for a tracked entity: type name plus assigned identifier.
///
/// Entities without an identifier are never tracked, so a key always
/// carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: &'static str,
    pub id: EntityId,
}

impl EntityKey {
    pub fn new(entity_type: &'static str, id: EntityId) -> Self {
        Self { entity_type, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.id)
    }
}

/// Identity of a live persistence context instance.
///
/// Entity metadata records the id of the context that manages the instance,
/// which is what makes cross-context membership checks possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Declared propagation behavior of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadePolicy {
    None,
    Persist,
    Remove,
    All,
}

impl CascadePolicy {
    pub fn propagates_persist(&self) -> bool {
        matches!(self, Self::Persist | Self::All)
    }

    pub fn propagates_remove(&self) -> bool {
        matches!(self, Self::Remove | Self::All)
    }
}

/// One row of an entity type's declarative relation table.
///
/// Relation traversal is driven entirely by these descriptors; there is no
/// runtime reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub name: &'static str,
    pub cardinality: Cardinality,
    pub nullable: bool,
    pub cascade: CascadePolicy,
}

impl RelationDescriptor {
    pub const fn to_one(name: &'static str, nullable: bool, cascade: CascadePolicy) -> Self {
        Self {
            name,
            cardinality: Cardinality::ToOne,
            nullable,
            cascade,
        }
    }

    pub const fn to_many(name: &'static str, cascade: CascadePolicy) -> Self {
        Self {
            name,
            cardinality: Cardinality::ToMany,
            nullable: true,
            cascade,
        }
    }
}
