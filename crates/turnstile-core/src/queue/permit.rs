//! Slot ownership.

use std::fmt;
use std::sync::Arc;

use super::core::{Shared, SlotRelease};
use crate::domain::{TaskId, TaskState};

/// One occupied slot.
///
/// The slot is given back exactly once: through `finish` / `abandon`, or on
/// drop. Dropping without `finish` means the operation never returned
/// normally (it panicked, or the caller dropped the running future), so it is
/// recorded as a failure.
pub(crate) struct SlotPermit {
    shared: Option<Arc<Shared>>,
    task_id: TaskId,
}

impl SlotPermit {
    pub(super) fn new(shared: Arc<Shared>, task_id: TaskId) -> Self {
        Self {
            shared: Some(shared),
            task_id,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Operation settled with `outcome` (`Completed` or `Failed`).
    pub fn finish(mut self, outcome: TaskState) {
        self.release(SlotRelease::Finished(outcome));
    }

    /// Granted, but the caller went away before running anything.
    pub fn abandon(mut self) {
        self.release(SlotRelease::Abandoned);
    }

    /// Forget the slot without touching queue state.
    /// Only for callers that already hold the state lock and fix up the
    /// running count themselves.
    pub(super) fn disarm(&mut self) {
        self.shared = None;
    }

    fn release(&mut self, how: SlotRelease) {
        if let Some(shared) = self.shared.take() {
            shared.release(self.task_id, how);
        }
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.release(SlotRelease::Finished(TaskState::Failed));
    }
}

impl fmt::Debug for SlotPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPermit")
            .field("task_id", &self.task_id)
            .field("armed", &self.shared.is_some())
            .finish()
    }
}
