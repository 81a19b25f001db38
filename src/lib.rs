// ============================================================================
// DualStore Library
// ============================================================================

//! Dual-environment persistence routing.
//!
//! Every inbound request selects one of two isolated datastore environments
//! ("dev" / "prod"). The selection is made once per request and is immutable
//! afterwards; all entity reads, writes, and cascade operations for that
//! request are bound to the single persistence context belonging to the
//! chosen environment.
//!
//! The moving parts, leaf to root:
//!
//! - [`env`] resolves the environment tag from request signals, with a
//!   sticky session fallback defaulting to production.
//! - [`context`] holds one lazily-created [`PersistenceContext`] (connection
//!   plus unit of work) per tag, shared process-wide.
//! - [`reconcile`] re-homes entity instances onto the active context:
//!   reattachment, refresh, proxy resolution, detachment.
//! - [`validate`] checks declared relations for cascade safety and verifies
//!   no relation spans two persistence contexts.
//! - [`persist`] orchestrates validation + reconciliation + the actual write
//!   into [`SafePersistence`] operations returning structured results.
//! - [`facade`] packages it all behind [`Store`] / [`RequestSession`].
//!
//! Expected failure modes (missing identifier, validation errors, context
//! mismatches) are reported as values, [`ValidationResult`] and
//! [`SafePersistenceResult`], never as errors to catch. Only configuration
//! problems (an environment without a backend) surface as [`StoreError`].

pub mod connection;
pub mod context;
pub mod core;
pub mod entity;
pub mod env;
pub mod facade;
pub mod persist;
pub mod prelude;
pub mod reconcile;
pub mod result;
pub mod storage;
pub mod validate;

// Re-export main types for convenience
pub use crate::core::{
    Cardinality, CascadePolicy, ContextId, EntityId, EntityKey, RelationDescriptor, Result,
    StoreError,
};
pub use crate::entity::{
    Entity, EntityFactory, EntityHandle, EntityMetadata, EntityRef, EntityRegistry,
};
pub use crate::env::{
    EnvironmentResolver, EnvironmentTag, RequestEnvironment, RequestSignals, StickyStore,
};
pub use crate::result::{SafePersistenceResult, ValidationResult};

// Re-export connection and context API
pub use crate::connection::{BackendConfig, DatastoreConnector, MemoryConnector, StoreConfig};
pub use crate::context::{ContextProvider, ContextStats, PersistenceContext};
pub use crate::facade::{RequestSession, Store, StoreBuilder};
pub use crate::persist::SafePersistence;
pub use crate::reconcile::EntityReconciler;
pub use crate::storage::{Datastore, MemoryBackend};
pub use crate::validate::{AcceptAllValidator, EntityValidator, RelationValidator};
