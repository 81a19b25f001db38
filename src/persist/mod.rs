//! Safe persistence: validation, reconciliation, cascade checks, and the
//! actual write, orchestrated into one operation per persist/update/remove.
//!
//! Every path returns a [`SafePersistenceResult`]; callers never need error
//! handling around these calls. This module is the single place an internal
//! [`StoreError`] becomes a logged, user-safe failed result.

use std::sync::Arc;
use tracing::{debug, error};

use crate::context::PersistenceContext;
use crate::core::StoreError;
use crate::entity::EntityHandle;
use crate::reconcile::EntityReconciler;
use crate::result::{SafePersistenceResult, ValidationResult};
use crate::validate::{EntityValidator, RelationValidator};

/// Orchestrates validated persistence against one context.
#[derive(Clone)]
pub struct SafePersistence {
    context: Arc<PersistenceContext>,
    reconciler: EntityReconciler,
    relations: RelationValidator,
    validator: Arc<dyn EntityValidator>,
}

impl SafePersistence {
    pub fn new(context: Arc<PersistenceContext>, validator: Arc<dyn EntityValidator>) -> Self {
        Self {
            reconciler: EntityReconciler::new(context.clone()),
            relations: RelationValidator::new(context.clone()),
            context,
            validator,
        }
    }

    pub fn context(&self) -> &Arc<PersistenceContext> {
        &self.context
    }

    /// Validates and registers a new entity for persistence; with `flush`
    /// the write is committed immediately and the identifier assigned.
    pub async fn safe_persist(&self, entity: EntityHandle, flush: bool) -> SafePersistenceResult {
        debug!("safe persist: entity='{}'", entity.describe().await);

        let structural = self.validator.validate_for_persistence(&entity).await;
        if !structural.is_valid() {
            return SafePersistenceResult::failed("Entity failed validation")
                .absorb(structural)
                .with_entity(entity);
        }

        let entity = self.reconciler.ensure_managed(entity).await;

        let cascade = self.relations.validate_cascade_operations(&entity).await;
        if !cascade.is_valid() {
            return SafePersistenceResult::failed("Cascade validation failed")
                .absorb(structural.merge(cascade))
                .with_entity(entity);
        }

        let same_context = self.relations.ensure_same_persistence_context(&entity).await;
        if !same_context.is_valid() {
            return SafePersistenceResult::failed("Persistence context mismatch")
                .absorb(structural.merge(cascade).merge(same_context))
                .with_entity(entity);
        }

        self.context.register_insert(&entity).await;

        if flush {
            if let Err(err) = self.context.flush().await {
                return self.flush_failure("persist", &entity, err).await;
            }
        }

        let mut result = SafePersistenceResult::succeeded("Entity persisted")
            .absorb(structural.merge(cascade).merge(same_context))
            .with_entity(entity);
        if flush {
            result = result.push_info("Changes committed");
        }
        result
    }

    /// Updates an already-identified entity. Entities without an identifier
    /// fail with a recoverable error before anything touches the context.
    pub async fn safe_update(&self, entity: EntityHandle, flush: bool) -> SafePersistenceResult {
        debug!("safe update: entity='{}'", entity.describe().await);

        if entity.read().await.id().is_none() {
            return SafePersistenceResult::failed("Cannot update an entity without an identifier")
                .push_error("Identifier required for update")
                .with_entity(entity);
        }

        let entity = self.reconciler.ensure_managed(entity).await;

        let structural = self.validator.validate_for_persistence(&entity).await;
        if !structural.is_valid() {
            return SafePersistenceResult::failed("Entity failed validation")
                .absorb(structural)
                .with_entity(entity);
        }

        let related = self
            .relations
            .validate_related_entity_states(&entity, &self.validator)
            .await;
        if !related.is_valid() {
            return SafePersistenceResult::failed("Related entity validation failed")
                .absorb(structural.merge(related))
                .with_entity(entity);
        }

        self.context.register_update(&entity).await;

        if flush {
            if let Err(err) = self.context.flush().await {
                return self.flush_failure("update", &entity, err).await;
            }
        }

        let mut result = SafePersistenceResult::succeeded("Entity updated")
            .absorb(structural.merge(related))
            .with_entity(entity);
        if flush {
            result = result.push_info("Changes committed");
        }
        result
    }

    /// Removes an already-identified entity after cascade-remove checks.
    pub async fn safe_remove(&self, entity: EntityHandle, flush: bool) -> SafePersistenceResult {
        debug!("safe remove: entity='{}'", entity.describe().await);

        if entity.read().await.id().is_none() {
            return SafePersistenceResult::failed("Cannot remove an entity without an identifier")
                .push_error("Identifier required for removal")
                .with_entity(entity);
        }

        let entity = self.reconciler.ensure_managed(entity).await;

        let cascade = self.relations.validate_cascade_operations(&entity).await;
        if !cascade.is_valid() {
            return SafePersistenceResult::failed("Cascade validation failed")
                .absorb(cascade)
                .with_entity(entity);
        }

        self.context.register_remove(&entity).await;

        if flush {
            if let Err(err) = self.context.flush().await {
                return self.flush_failure("remove", &entity, err).await;
            }
        }

        let mut result = SafePersistenceResult::succeeded("Entity removed")
            .absorb(cascade)
            .with_entity(entity);
        if flush {
            result = result.push_info("Changes committed");
        }
        result
    }

    /// Read-only pre-flight: structural, cascade, same-context, and related
    /// entity state validation combined. Mutates nothing.
    pub async fn validate_before_persistence(&self, entity: &EntityHandle) -> ValidationResult {
        let structural = self.validator.validate_for_persistence(entity).await;
        let cascade = self.relations.validate_cascade_operations(entity).await;
        let same_context = self.relations.ensure_same_persistence_context(entity).await;
        let related = self
            .relations
            .validate_related_entity_states(entity, &self.validator)
            .await;

        structural.merge(cascade).merge(same_context).merge(related)
    }

    // Flush errors discard the rest of the batch; report with the generic
    // message and preserve the raw error for the detail list.
    async fn flush_failure(
        &self,
        operation: &str,
        entity: &EntityHandle,
        err: StoreError,
    ) -> SafePersistenceResult {
        let label = entity.describe().await;
        error!(
            "safe {} flush failed: entity='{}' context='{}' error='{}'",
            operation,
            label,
            self.context.id(),
            err
        );
        SafePersistenceResult::failed("Persistence operation failed")
            .push_error(err.to_string())
            .with_entity(entity.clone())
    }
}
