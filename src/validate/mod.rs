//! Relation and cascade validation.
//!
//! All checks are read-only; composing their results is the safe-persistence
//! handler's job, via [`ValidationResult::merge`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::PersistenceContext;
use crate::core::{Cardinality, RelationDescriptor};
use crate::entity::{EntityHandle, EntityRef};
use crate::result::ValidationResult;

/// External structural/business validation collaborator, invoked by the
/// safe-persistence handler before any mutation.
#[async_trait]
pub trait EntityValidator: Send + Sync {
    async fn validate_for_persistence(&self, entity: &EntityHandle) -> ValidationResult;
}

/// Default wiring: every entity passes.
pub struct AcceptAllValidator;

#[async_trait]
impl EntityValidator for AcceptAllValidator {
    async fn validate_for_persistence(&self, _entity: &EntityHandle) -> ValidationResult {
        ValidationResult::ok()
    }
}

/// Walks an entity's declared relation table and checks its targets against
/// the active persistence context.
#[derive(Clone)]
pub struct RelationValidator {
    context: Arc<PersistenceContext>,
}

struct RelationEntry {
    descriptor: RelationDescriptor,
    targets: Vec<EntityRef>,
}

impl RelationValidator {
    pub fn new(context: Arc<PersistenceContext>) -> Self {
        Self { context }
    }

    /// Checks that every cascade-reachable related entity is in a state
    /// compatible with persisting or removing the root.
    ///
    /// Required to-one relations that are unset are errors; nullable unset
    /// ones are warnings. A target already registered for removal while its
    /// relation is required is an error.
    pub async fn validate_cascade_operations(&self, entity: &EntityHandle) -> ValidationResult {
        let mut result = ValidationResult::ok();
        let entries = self.relation_entries(entity).await;

        for entry in &entries {
            let descriptor = &entry.descriptor;

            if entry.targets.is_empty() && descriptor.cardinality == Cardinality::ToOne {
                if descriptor.nullable {
                    result.add_warning(format!("Relation '{}' is unset", descriptor.name));
                } else {
                    result.add_error(format!("Required relation '{}' is unset", descriptor.name));
                }
                continue;
            }

            for target in &entry.targets {
                let EntityRef::Loaded(handle) = target else {
                    continue;
                };

                let target_id = handle.read().await.id();
                if target_id.is_none() && !descriptor.cascade.propagates_persist() {
                    result.add_error(format!(
                        "Relation '{}' target {} is unpersisted and the relation does not cascade persist",
                        descriptor.name,
                        handle.describe().await
                    ));
                    continue;
                }

                if !self.context.is_pending_removal(handle).await {
                    continue;
                }
                let label = handle.describe().await;
                if descriptor.nullable {
                    result.add_warning(format!(
                        "Relation '{}' target {} is registered for removal",
                        descriptor.name, label
                    ));
                } else {
                    result.add_error(format!(
                        "Relation '{}' target {} is registered for removal but required",
                        descriptor.name, label
                    ));
                }
            }
        }

        result
    }

    /// Verifies that every reachable related entity belongs to the same
    /// persistence context as the root, or is new/unmanaged. Membership in a
    /// different context is an error naming the offending relation.
    pub async fn ensure_same_persistence_context(&self, entity: &EntityHandle) -> ValidationResult {
        let mut result = ValidationResult::ok()
            .with_context("context", self.context.id().to_string())
            .with_context("environment", self.context.tag().to_string());
        let entries = self.relation_entries(entity).await;

        for entry in &entries {
            for target in &entry.targets {
                match target {
                    EntityRef::Loaded(handle) => {
                        let managed_by = handle.read().await.metadata().managed_by;
                        if let Some(owner) = managed_by {
                            if owner != self.context.id() {
                                let label = handle.describe().await;
                                result.add_error(format!(
                                    "Relation '{}' target {} is bound to a different persistence context",
                                    entry.descriptor.name, label
                                ));
                            }
                        }
                    }
                    EntityRef::Reference { entity_type, id } => {
                        result.add_warning(format!(
                            "Relation '{}' carries an unresolved reference to {}#{}",
                            entry.descriptor.name, entity_type, id
                        ));
                    }
                }
            }
        }

        result
    }

    /// Runs the external validator over each loaded related entity and
    /// aggregates the outcomes, prefixed by relation name.
    pub async fn validate_related_entity_states(
        &self,
        entity: &EntityHandle,
        validator: &Arc<dyn EntityValidator>,
    ) -> ValidationResult {
        let mut result = ValidationResult::ok();
        let entries = self.relation_entries(entity).await;

        for entry in &entries {
            for target in &entry.targets {
                let EntityRef::Loaded(handle) = target else {
                    continue;
                };
                let related = validator.validate_for_persistence(handle).await;
                for error in related.errors() {
                    result.add_error(format!("Relation '{}': {}", entry.descriptor.name, error));
                }
                for warning in related.warnings() {
                    result.add_warning(format!("Relation '{}': {}", entry.descriptor.name, warning));
                }
            }
        }

        result
    }

    // Snapshot descriptors and targets under one read guard, released before
    // any target is locked.
    async fn relation_entries(&self, entity: &EntityHandle) -> Vec<RelationEntry> {
        let guard = entity.read().await;
        guard
            .relations()
            .iter()
            .map(|descriptor| RelationEntry {
                descriptor: *descriptor,
                targets: guard.relation_targets(descriptor.name),
            })
            .collect()
    }
}
