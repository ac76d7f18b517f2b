use crate::body::Body;
use crate::list::DisplayList;
use alloc::collections::{LinkedList, VecDeque};

/// Lists not in use, plus fragments waiting to be freed.
///
/// Only ever touched under the manager lock. The free queue is sized for the
/// whole pool up front, so returning a list never allocates.
#[derive(Debug)]
pub(crate) struct Pool {
    pub free: VecDeque<DisplayList>,
    pub gc: LinkedList<Body>,
}

impl Pool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: VecDeque::with_capacity(capacity),
            gc: LinkedList::new(),
        }
    }

    pub fn take(&mut self) -> Option<DisplayList> {
        self.free.pop_front()
    }

    /// Return `list` and every list chained behind it to the free queue.
    ///
    /// Fragments are queued for the garbage collector. Returns whether any
    /// were, in which case the collector needs scheduling once the lock is
    /// dropped.
    pub fn retire(&mut self, mut list: DisplayList) -> bool {
        let mut queued = list.recycle(&mut self.gc);
        for child in list.drain_chain() {
            queued |= self.retire(child);
        }
        self.free.push_back(list);
        queued
    }

    /// Detach the oldest garbage body, still in its list node.
    ///
    /// Relinking allocates and frees nothing; the caller drops the node
    /// after the lock.
    pub fn detach_garbage(&mut self) -> Option<LinkedList<Body>> {
        if self.gc.is_empty() {
            return None;
        }
        let rest = self.gc.split_off(1);
        Some(core::mem::replace(&mut self.gc, rest))
    }

    /// [`retire`](Self::retire) for a slot that may be empty.
    pub fn retire_slot(&mut self, slot: &mut Option<DisplayList>) -> bool {
        slot.take().is_some_and(|list| self.retire(list))
    }
}
