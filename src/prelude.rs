//! Recommended API entrypoints grouped by abstraction level.
//!
//! `client` is the stable default for request-handling application code.
//! `advanced` is an explicit escape hatch for persistence internals.

pub mod client {
    //! Stable high-level surface for request handlers.
    //!
    //! Intended usage in app code:
    //! - build one `Store` at startup, registering entity types,
    //! - open a `RequestSession` per inbound request,
    //! - branch on `SafePersistenceResult::is_success()`.
    pub use crate::{
        Entity, EntityFactory, EntityHandle, EntityMetadata, EntityRef, EnvironmentTag,
        RequestSession, RequestSignals, Result, SafePersistenceResult, Store, StoreConfig,
        StoreError, ValidationResult,
    };
}

pub mod advanced {
    //! Escape hatch for persistence internals.
    //!
    //! App-level product code should normally stay on `prelude::client`.
    pub use crate::connection::{BackendConfig, DatastoreConnector, MemoryConnector};
    pub use crate::context::{ContextProvider, ContextStats, PersistenceContext};
    pub use crate::env::{EnvironmentResolver, RequestEnvironment, StickyStore};
    pub use crate::reconcile::EntityReconciler;
    pub use crate::storage::{Datastore, MemoryBackend};
    pub use crate::validate::{AcceptAllValidator, EntityValidator, RelationValidator};
}
