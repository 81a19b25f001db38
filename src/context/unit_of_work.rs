use std::collections::HashMap;

use crate::core::EntityKey;
use crate::entity::EntityHandle;

/// A persistence operation registered against the context, applied at flush
/// time in registration order.
pub(crate) enum PendingOp {
    Insert(EntityHandle),
    Update(EntityHandle),
    Remove(EntityHandle),
}

impl PendingOp {
    fn handle(&self) -> &EntityHandle {
        match self {
            Self::Insert(h) | Self::Update(h) | Self::Remove(h) => h,
        }
    }

    fn same_kind(&self, other: &PendingOp) -> bool {
        matches!(
            (self, other),
            (Self::Insert(_), Self::Insert(_))
                | (Self::Update(_), Self::Update(_))
                | (Self::Remove(_), Self::Remove(_))
        )
    }
}

/// Tracked-entity map plus the ordered batch of registered operations.
///
/// Invariant: every tracked entry carries an identifier (the map key embeds
/// it); new entities live only in the pending batch until flush assigns
/// their id.
#[derive(Default)]
pub(crate) struct UnitOfWork {
    tracked: HashMap<EntityKey, EntityHandle>,
    pending: Vec<PendingOp>,
}

impl UnitOfWork {
    pub fn tracked_instance(&self, key: &EntityKey) -> Option<&EntityHandle> {
        self.tracked.get(key)
    }

    pub fn track(&mut self, key: EntityKey, handle: EntityHandle) {
        self.tracked.insert(key, handle);
    }

    /// Removes the tracked entry holding this exact instance.
    pub fn untrack_instance(&mut self, handle: &EntityHandle) -> bool {
        let key = self
            .tracked
            .iter()
            .find(|(_, tracked)| tracked.same_instance(handle))
            .map(|(key, _)| *key);
        match key {
            Some(key) => {
                self.tracked.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn drain_tracked(&mut self) -> Vec<EntityHandle> {
        self.tracked.drain().map(|(_, handle)| handle).collect()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Registers an operation, skipping exact duplicates (same kind, same
    /// instance) so repeated registration stays idempotent.
    pub fn register(&mut self, op: PendingOp) {
        let duplicate = self
            .pending
            .iter()
            .any(|existing| existing.same_kind(&op) && existing.handle().same_instance(op.handle()));
        if !duplicate {
            self.pending.push(op);
        }
    }

    pub fn has_pending_removal(&self, handle: &EntityHandle) -> bool {
        self.pending.iter().any(|op| {
            matches!(op, PendingOp::Remove(pending) if pending.same_instance(handle))
        })
    }

    pub fn take_pending(&mut self) -> Vec<PendingOp> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
