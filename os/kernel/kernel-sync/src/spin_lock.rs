use crate::irq::IrqGuard;
use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A spinning lock that may be shared with an interrupt handler.
///
/// The lock never sleeps, so it is usable from hard interrupt context. Two
/// acquisition flavours exist, mirroring the usual kernel convention:
///
/// - [`lock_irqsave`](Self::lock_irqsave) from process context: masks local
///   interrupts first, then spins. Interrupts are restored after the lock is
///   released.
/// - [`lock`](Self::lock) from the interrupt handler itself, where interrupts
///   are already masked.
///
/// Critical sections must stay short: no allocation, no blocking calls.
pub struct SpinLock<T> {
    /// lock state
    /// * `false`: unlocked
    /// * `true`: locked
    locked: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: mutual exclusion; only T: Send may cross threads.
unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Test-and-test-and-set: spin on a plain load, retry the CAS when it flips.
    #[inline]
    fn acquire(&self) {
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    /// Try once; returns immediately.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.try_acquire().then_some(SpinLockGuard { lock: self })
    }

    /// Spin until acquired without touching the interrupt state.
    ///
    /// Only call this where local interrupts are already masked (the
    /// interrupt handler) or where the lock is never taken from interrupt
    /// context.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.acquire();
        SpinLockGuard { lock: self }
    }

    /// Mask local interrupts, then spin until acquired.
    ///
    /// The guard releases the lock before restoring the interrupt state.
    #[inline]
    pub fn lock_irqsave(&self) -> SpinLockIrqGuard<'_, T> {
        let irq = IrqGuard::new();
        let guard = self.lock();
        SpinLockIrqGuard { guard, _irq: irq }
    }

    /// Closure convenience over [`lock_irqsave`](Self::lock_irqsave).
    #[inline]
    pub fn with_lock_irqsave<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock_irqsave();
        f(&mut g)
    }

    /// Snapshot of the lock word; only meaningful for diagnostics.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Guard returned by [`SpinLock::lock`] and [`SpinLock::try_lock`].
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        // Release publishes the critical section.
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// Guard returned by [`SpinLock::lock_irqsave`].
///
/// Field order matters: the lock guard drops (unlocks) before the interrupt
/// guard restores the saved state.
pub struct SpinLockIrqGuard<'a, T> {
    guard: SpinLockGuard<'a, T>,
    _irq: IrqGuard,
}

impl<T> Deref for SpinLockIrqGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for SpinLockIrqGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
