//! Deferred release of fragment bodies.
//!
//! Lists retire under the manager lock, often from the frame-end interrupt,
//! where DMA memory must not be freed. Their fragments are parked on the
//! pool's garbage queue instead, and the platform's deferred work item is
//! scheduled to call [`Manager::collect_garbage`] from a context that may
//! block.

use crate::body::Body;
use alloc::collections::LinkedList;
use crate::error::DlError;
use crate::manager::{DlPlatform, Manager};
use log::trace;

impl<P: DlPlatform> Manager<P> {
    /// Free every fragment retired so far. Returns how many were freed.
    ///
    /// This is the body of the deferred work item. May block; never call it
    /// from interrupt context.
    pub fn collect_garbage(&self) -> usize {
        let mut count = 0;
        // one body per acquisition, the lock is dropped before freeing
        while let Some(node) = self.detach_garbage() {
            for dlb in node {
                dlb.free(&self.platform);
                count += 1;
            }
        }
        if count > 0 {
            trace!("wpf{}: freed {count} fragments", self.index);
        }
        count
    }

    fn detach_garbage(&self) -> Option<LinkedList<Body>> {
        self.state.lock_irqsave().pool.detach_garbage()
    }

    /// Fragments waiting for [`collect_garbage`](Self::collect_garbage).
    #[must_use]
    pub fn gc_pending(&self) -> usize {
        self.state.lock_irqsave().pool.gc.len()
    }

    /// Allocate a stand-alone body of `num_entries` entries, to be filled and
    /// attached with [`DisplayList::add_fragment`](crate::DisplayList::add_fragment).
    ///
    /// May block.
    ///
    /// # Errors
    /// [`DlError::OutOfMemory`] if the body cannot be allocated.
    pub fn alloc_fragment(&self, num_entries: usize) -> Result<Body, DlError> {
        Body::alloc(&self.platform, num_entries, 0)
    }

    /// Free a fragment that was never attached to a list, or was handed back
    /// by a refused [`add_fragment`](crate::DisplayList::add_fragment).
    ///
    /// May block.
    pub fn free_fragment(&self, body: Body) {
        body.free(&self.platform);
    }
}
