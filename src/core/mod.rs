mod error;
mod types;

pub use error::{Result, StoreError};
pub use types::{Cardinality, CascadePolicy, ContextId, EntityId, EntityKey, RelationDescriptor};
