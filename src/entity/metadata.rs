use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ContextId;

/// Persistence bookkeeping carried by every entity instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Context currently tracking this instance, if any.
    pub managed_by: Option<ContextId>,
    /// When the state was last loaded from or written to the datastore.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Bumped on every flushed update.
    pub version: i64,
}

impl EntityMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_managed(&self) -> bool {
        self.managed_by.is_some()
    }

    pub(crate) fn mark_managed(&mut self, context: ContextId) {
        self.managed_by = Some(context);
        if self.loaded_at.is_none() {
            self.loaded_at = Some(Utc::now());
        }
    }

    pub(crate) fn mark_detached(&mut self) {
        self.managed_by = None;
    }

    pub(crate) fn touch_loaded(&mut self) {
        self.loaded_at = Some(Utc::now());
    }
}
