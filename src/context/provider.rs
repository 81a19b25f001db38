use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::PersistenceContext;
use crate::connection::DatastoreConnector;
use crate::core::Result;
use crate::entity::EntityRegistry;
use crate::env::{EnvironmentTag, RequestEnvironment};

/// Process-wide registry of persistence contexts, one per environment tag.
///
/// Contexts are created lazily on first access and cached for the provider's
/// lifetime: the same tag always yields the same live instance. Creation on
/// a cache miss happens under the write lock, so concurrent first requests
/// for the same tag cannot race two contexts into existence.
pub struct ContextProvider {
    connector: Arc<dyn DatastoreConnector>,
    registry: Arc<EntityRegistry>,
    contexts: RwLock<HashMap<EnvironmentTag, Arc<PersistenceContext>>>,
}

impl ContextProvider {
    pub fn new(connector: Arc<dyn DatastoreConnector>, registry: Arc<EntityRegistry>) -> Self {
        Self {
            connector,
            registry,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// The live context for a tag, connecting the backend on first access.
    ///
    /// A connection failure is a fatal configuration problem: the error is
    /// returned immediately and nothing is cached or retried.
    pub async fn context(&self, tag: EnvironmentTag) -> Result<Arc<PersistenceContext>> {
        {
            let contexts = self.contexts.read().await;
            if let Some(context) = contexts.get(&tag) {
                return Ok(context.clone());
            }
        }

        let mut contexts = self.contexts.write().await;
        if let Some(context) = contexts.get(&tag) {
            return Ok(context.clone());
        }

        let datastore = self.connector.connect(tag).await?;
        let context = Arc::new(PersistenceContext::new(
            tag,
            datastore,
            self.registry.clone(),
        ));
        contexts.insert(tag, context.clone());
        Ok(context)
    }

    /// The context bound to an already-resolved request environment.
    pub async fn context_for_request(
        &self,
        request: &RequestEnvironment,
    ) -> Result<Arc<PersistenceContext>> {
        self.context(request.tag()).await
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    pub async fn context_count(&self) -> usize {
        self.contexts.read().await.len()
    }
}
