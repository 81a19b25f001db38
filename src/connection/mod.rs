//! Connecting environment tags to datastore backends.
//!
//! [`DatastoreConnector`] is the seam between the persistence core and the
//! actual driver: the context provider calls it exactly once per tag, on the
//! first request that resolves to that environment. Failure to connect is
//! treated as a deployment misconfiguration, surfaced immediately and never
//! retried.

mod config;

pub use config::{BackendConfig, StoreConfig};

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::Result;
use crate::env::EnvironmentTag;
use crate::storage::{Datastore, MemoryBackend};

/// Establishes the datastore connection backing one environment.
#[async_trait]
pub trait DatastoreConnector: Send + Sync {
    async fn connect(&self, tag: EnvironmentTag) -> Result<Arc<dyn Datastore>>;
}

/// Default connector: one [`MemoryBackend`] per configured environment.
pub struct MemoryConnector {
    config: StoreConfig,
}

impl MemoryConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DatastoreConnector for MemoryConnector {
    async fn connect(&self, tag: EnvironmentTag) -> Result<Arc<dyn Datastore>> {
        let backend = self.config.get(tag).ok_or_else(|| {
            crate::core::StoreError::Configuration(format!(
                "No datastore configured for environment '{}'",
                tag
            ))
        })?;
        backend.validate()?;

        Ok(Arc::new(MemoryBackend::with_id_seed(
            backend.label.clone(),
            backend.id_seed,
        )))
    }
}
