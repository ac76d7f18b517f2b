use alloc::sync::Arc;

/// A single deferred work item running in a context that may sleep.
///
/// The driver only asks for the item to be queued; the platform owns the
/// worker and calls back into the driver from it. Scheduling an item that is
/// already queued is a no-op, as with a kernel `work_struct`.
pub trait DeferredWork {
    /// Queue the work item. Callable from interrupt context and with spin
    /// locks held.
    fn schedule(&self);

    /// Cancel the work item and wait for a running instance to finish.
    /// Never call this from interrupt context.
    fn cancel_sync(&self);
}

impl<T: DeferredWork + ?Sized> DeferredWork for &T {
    #[inline]
    fn schedule(&self) {
        (**self).schedule();
    }

    #[inline]
    fn cancel_sync(&self) {
        (**self).cancel_sync();
    }
}

impl<T: DeferredWork + ?Sized> DeferredWork for Arc<T> {
    #[inline]
    fn schedule(&self) {
        (**self).schedule();
    }

    #[inline]
    fn cancel_sync(&self) {
        (**self).cancel_sync();
    }
}
