/// Safe persistence tests
///
/// Tests for the persist/update/remove pipelines, structured results, and
/// the read-only pre-flight check
/// Run with: cargo test --test safe_persistence_tests
mod common;

use std::sync::Arc;

use common::{Customer, customer_name, dev_session, fixture_store};
use dualstore::{EntityHandle, RequestSignals, Store, StoreConfig};

#[tokio::test]
async fn test_safe_persist_with_flush_assigns_identifier() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), true)
        .await;

    assert!(result.is_success(), "errors: {:?}", result.errors());
    assert!(result.info().iter().any(|i| i.contains("committed")));
    let entity = result.entity().unwrap();
    assert!(entity.read().await.id().is_some());
    assert!(session.is_managed(entity).await);
    assert_eq!(session.context().datastore().row_count("customers").await, 1);
}

#[tokio::test]
async fn test_safe_persist_without_flush_defers_commit() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), false)
        .await;

    assert!(result.is_success());
    let entity = result.entity().unwrap().clone();
    assert!(entity.read().await.id().is_none());
    assert_eq!(session.context().pending_count().await, 1);
    assert_eq!(session.context().datastore().row_count("customers").await, 0);

    session.flush().await.unwrap();
    assert!(entity.read().await.id().is_some());
    assert_eq!(session.context().datastore().row_count("customers").await, 1);
}

#[tokio::test]
async fn test_safe_persist_collects_nullable_relation_warnings() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), true)
        .await;

    assert!(result.is_success());
    assert!(result.warnings().iter().any(|w| w.contains("shop")));
}

#[tokio::test]
async fn test_safe_update_without_identifier_fails_recoverably() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_update(EntityHandle::new(Customer::new("Alice")), true)
        .await;

    assert!(!result.is_success());
    assert!(!result.message().is_empty());
    assert!(
        result
            .errors()
            .iter()
            .any(|e| e.contains("Identifier required"))
    );

    // The commit path was never reached.
    assert_eq!(session.context().pending_count().await, 0);
    assert_eq!(session.context().datastore().row_count("customers").await, 0);
}

#[tokio::test]
async fn test_safe_update_writes_changed_state() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let persisted = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), true)
        .await;
    let managed = persisted.entity().unwrap().clone();
    let id = managed.read().await.id().unwrap();

    {
        let mut guard = managed.write().await;
        guard
            .as_any_mut()
            .downcast_mut::<Customer>()
            .unwrap()
            .set_name("Alice Renamed");
    }

    let result = session.safe_update(managed.clone(), true).await;
    assert!(result.is_success(), "errors: {:?}", result.errors());
    assert_eq!(managed.read().await.metadata().version, 1);

    let stored = session
        .context()
        .datastore()
        .get("customers", id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["name"], "Alice Renamed");
}

#[tokio::test]
async fn test_safe_update_on_vanished_row_reports_failure() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    // Identifier present, but no row behind it.
    let ghost = EntityHandle::new(Customer::with_id(777, "Ghost"));
    let result = session.safe_update(ghost, true).await;

    assert!(!result.is_success());
    assert_eq!(result.message(), "Persistence operation failed");
    assert!(!result.errors().is_empty());
}

#[tokio::test]
async fn test_safe_remove_deletes_and_detaches() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let persisted = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), true)
        .await;
    let managed = persisted.entity().unwrap().clone();

    let result = session.safe_remove(managed.clone(), true).await;
    assert!(result.is_success(), "errors: {:?}", result.errors());
    assert_eq!(session.context().datastore().row_count("customers").await, 0);
    assert!(!session.is_managed(&managed).await);
    assert!(session.is_detached(&managed).await);
}

#[tokio::test]
async fn test_safe_remove_without_identifier_fails_recoverably() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_remove(EntityHandle::new(Customer::new("Alice")), true)
        .await;

    assert!(!result.is_success());
    assert!(
        result
            .errors()
            .iter()
            .any(|e| e.contains("Identifier required"))
    );
}

#[tokio::test]
async fn test_structural_validation_blocks_persist() {
    let store = Store::builder(StoreConfig::dual())
        .register_entity::<Customer>()
        .validator(Arc::new(common::RejectEmptyNames))
        .build()
        .unwrap();
    let session = store.request(RequestSignals::query("dev")).await.unwrap();

    let result = session
        .safe_persist(EntityHandle::new(Customer::new("")), true)
        .await;

    assert!(!result.is_success());
    assert_eq!(result.message(), "Entity failed validation");
    assert!(result.errors()[0].contains("name must not be empty"));
    assert_eq!(session.context().datastore().row_count("customers").await, 0);
}

#[tokio::test]
async fn test_validate_before_persistence_mutates_nothing() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let entity = EntityHandle::new(Customer::new("Alice"));
    let outcome = session.validate_before_persistence(&entity).await;

    assert!(outcome.is_valid());
    assert!(outcome.warnings().iter().any(|w| w.contains("shop")));
    assert_eq!(session.context().pending_count().await, 0);
    assert!(!session.is_managed(&entity).await);
    assert_eq!(session.context().datastore().row_count("customers").await, 0);
}

#[tokio::test]
async fn test_results_survive_round_trip_through_caller() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), true)
        .await;

    // The result is a plain value: cloning and reading it later must not
    // disturb the persisted entity.
    let copy = result.clone();
    assert_eq!(copy.is_success(), result.is_success());
    assert_eq!(copy.message(), result.message());
    assert_eq!(
        customer_name(copy.entity().unwrap()).await,
        customer_name(result.entity().unwrap()).await
    );
}

#[tokio::test]
async fn test_discard_pending_drops_uncommitted_batch() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let result = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), false)
        .await;
    assert!(result.is_success());
    assert_eq!(session.context().pending_count().await, 1);

    session.context().discard_pending().await;
    assert_eq!(session.context().pending_count().await, 0);

    session.flush().await.unwrap();
    assert_eq!(session.context().datastore().row_count("customers").await, 0);
    assert!(result.entity().unwrap().read().await.id().is_none());
}

#[tokio::test]
async fn test_sequential_operations_flush_in_order() {
    let store = fixture_store();
    let session = dev_session(&store).await;

    let first = session
        .safe_persist(EntityHandle::new(Customer::new("Alice")), false)
        .await;
    let second = session
        .safe_persist(EntityHandle::new(Customer::new("Amina")), false)
        .await;
    assert_eq!(session.context().pending_count().await, 2);

    session.flush().await.unwrap();

    let first_id = first.entity().unwrap().read().await.id().unwrap();
    let second_id = second.entity().unwrap().read().await.id().unwrap();
    assert!(first_id < second_id);
}
