//! High-level client surface: build a [`Store`] once, open a
//! [`RequestSession`] per inbound request.

use std::sync::Arc;

use crate::connection::{DatastoreConnector, MemoryConnector, StoreConfig};
use crate::context::{ContextProvider, PersistenceContext};
use crate::core::Result;
use crate::entity::{EntityFactory, EntityHandle, EntityRef, EntityRegistry};
use crate::env::{EnvironmentResolver, EnvironmentTag, RequestEnvironment, RequestSignals, StickyStore};
use crate::persist::SafePersistence;
use crate::reconcile::EntityReconciler;
use crate::result::{SafePersistenceResult, ValidationResult};
use crate::validate::{AcceptAllValidator, EntityValidator};

/// Dual-environment persistence client.
///
/// Owns the environment resolver and the process-wide context provider.
/// Cheap to share behind an `Arc`; controllers call [`Store::request`] once
/// per inbound request and work through the returned session.
///
/// # Examples
///
/// ```
/// use dualstore::{Store, StoreConfig, RequestSignals, EntityHandle};
/// # use dualstore::{Entity, EntityFactory, EntityMetadata, Result};
/// # use std::any::Any;
/// # #[derive(Default)]
/// # struct Customer { id: Option<i64>, name: String, metadata: EntityMetadata }
/// # impl Entity for Customer {
/// #     fn entity_type(&self) -> &'static str { "customer" }
/// #     fn table_name(&self) -> &str { "customers" }
/// #     fn id(&self) -> Option<i64> { self.id }
/// #     fn assign_id(&mut self, id: i64) { self.id = Some(id); }
/// #     fn metadata(&self) -> &EntityMetadata { &self.metadata }
/// #     fn metadata_mut(&mut self) -> &mut EntityMetadata { &mut self.metadata }
/// #     fn state(&self) -> Result<serde_json::Value> { Ok(serde_json::json!({ "name": self.name })) }
/// #     fn load_state(&mut self, fields: &serde_json::Value) -> Result<()> {
/// #         self.name = fields.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
/// #         Ok(())
/// #     }
/// #     fn as_any(&self) -> &dyn Any { self }
/// #     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// # }
/// # impl EntityFactory for Customer {
/// #     fn entity_type_name() -> &'static str { "customer" }
/// #     fn from_state(id: i64, fields: &serde_json::Value) -> Result<Self> {
/// #         let mut customer = Customer::default();
/// #         customer.load_state(fields)?;
/// #         customer.id = Some(id);
/// #         Ok(customer)
/// #     }
/// # }
/// # tokio_test::block_on(async {
/// let store = Store::builder(StoreConfig::dual())
///     .register_entity::<Customer>()
///     .build()
///     .unwrap();
///
/// // One session per inbound request; the tag is fixed for its lifetime.
/// let session = store.request(RequestSignals::query("dev")).await.unwrap();
/// let result = session
///     .safe_persist(
///         EntityHandle::new(Customer { name: "Alice".into(), ..Default::default() }),
///         true,
///     )
///     .await;
/// assert!(result.is_success());
/// assert!(result.entity().unwrap().read().await.id().is_some());
/// # });
/// ```
pub struct Store {
    resolver: EnvironmentResolver,
    provider: Arc<ContextProvider>,
    validator: Arc<dyn EntityValidator>,
}

impl Store {
    pub fn builder(config: StoreConfig) -> StoreBuilder {
        StoreBuilder::new(config)
    }

    /// Resolves the environment for one request and opens a session bound to
    /// that environment's context. The tag cannot change for the session's
    /// lifetime.
    pub async fn request(&self, signals: RequestSignals) -> Result<RequestSession> {
        let request = self.resolver.resolve_request(&signals);
        let context = self.provider.context_for_request(&request).await?;
        Ok(RequestSession::new(request, context, self.validator.clone()))
    }

    pub fn resolver(&self) -> &EnvironmentResolver {
        &self.resolver
    }

    pub fn provider(&self) -> &Arc<ContextProvider> {
        &self.provider
    }
}

/// Assembles a [`Store`] from configuration, registered entity types, and
/// optional custom collaborators.
pub struct StoreBuilder {
    config: StoreConfig,
    registry: EntityRegistry,
    connector: Option<Arc<dyn DatastoreConnector>>,
    validator: Option<Arc<dyn EntityValidator>>,
    sticky: Option<StickyStore>,
}

impl StoreBuilder {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            registry: EntityRegistry::new(),
            connector: None,
            validator: None,
            sticky: None,
        }
    }

    pub fn register_entity<E: EntityFactory>(mut self) -> Self {
        self.registry.register::<E>();
        self
    }

    /// Replace the default in-memory connector, e.g. with a real driver or a
    /// counting connector in tests.
    pub fn connector(mut self, connector: Arc<dyn DatastoreConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Wire in the external structural/business validator.
    pub fn validator(mut self, validator: Arc<dyn EntityValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Share a sticky store with the session layer.
    pub fn sticky_store(mut self, sticky: StickyStore) -> Self {
        self.sticky = Some(sticky);
        self
    }

    pub fn build(self) -> Result<Store> {
        self.config.validate()?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(MemoryConnector::new(self.config.clone())));
        let resolver = match self.sticky {
            Some(sticky) => EnvironmentResolver::with_sticky(sticky),
            None => EnvironmentResolver::new(),
        };

        Ok(Store {
            resolver,
            provider: Arc::new(ContextProvider::new(connector, Arc::new(self.registry))),
            validator: self.validator.unwrap_or_else(|| Arc::new(AcceptAllValidator)),
        })
    }
}

/// One request's worth of persistence: the resolved environment, its
/// context, and the reconciler/safe-persistence pair bound to it.
pub struct RequestSession {
    request: RequestEnvironment,
    context: Arc<PersistenceContext>,
    reconciler: EntityReconciler,
    persistence: SafePersistence,
}

impl RequestSession {
    fn new(
        request: RequestEnvironment,
        context: Arc<PersistenceContext>,
        validator: Arc<dyn EntityValidator>,
    ) -> Self {
        Self {
            reconciler: EntityReconciler::new(context.clone()),
            persistence: SafePersistence::new(context.clone(), validator),
            request,
            context,
        }
    }

    pub fn environment(&self) -> EnvironmentTag {
        self.request.tag()
    }

    pub fn context(&self) -> &Arc<PersistenceContext> {
        &self.context
    }

    pub fn reconciler(&self) -> &EntityReconciler {
        &self.reconciler
    }

    pub fn persistence(&self) -> &SafePersistence {
        &self.persistence
    }

    // Reconciler pass-throughs.

    pub async fn ensure_managed(&self, entity: EntityHandle) -> EntityHandle {
        self.reconciler.ensure_managed(entity).await
    }

    pub async fn refresh(&self, entity: EntityHandle) -> EntityHandle {
        self.reconciler.refresh(entity).await
    }

    pub async fn is_managed(&self, entity: &EntityHandle) -> bool {
        self.reconciler.is_managed(entity).await
    }

    pub async fn is_detached(&self, entity: &EntityHandle) -> bool {
        self.reconciler.is_detached(entity).await
    }

    pub async fn detach(&self, entity: &EntityHandle) -> bool {
        self.reconciler.detach(entity).await
    }

    pub async fn merge_detached(&self, entity: EntityHandle) -> EntityHandle {
        self.reconciler.merge_detached(entity).await
    }

    pub async fn resolve_proxy(&self, reference: EntityRef) -> EntityRef {
        self.reconciler.resolve_proxy(reference).await
    }

    pub async fn clear_context_cache(&self) {
        self.reconciler.clear_context_cache().await
    }

    // Safe-persistence pass-throughs.

    pub async fn safe_persist(&self, entity: EntityHandle, flush: bool) -> SafePersistenceResult {
        self.persistence.safe_persist(entity, flush).await
    }

    pub async fn safe_update(&self, entity: EntityHandle, flush: bool) -> SafePersistenceResult {
        self.persistence.safe_update(entity, flush).await
    }

    pub async fn safe_remove(&self, entity: EntityHandle, flush: bool) -> SafePersistenceResult {
        self.persistence.safe_remove(entity, flush).await
    }

    pub async fn validate_before_persistence(&self, entity: &EntityHandle) -> ValidationResult {
        self.persistence.validate_before_persistence(entity).await
    }

    /// Commits the registered batch against this session's context.
    pub async fn flush(&self) -> Result<()> {
        self.context.flush().await
    }
}
