//! Local interrupt masking.
//!
//! Locks that are shared with an interrupt handler must be taken with local
//! interrupts disabled from every other context, otherwise the handler can
//! preempt the holder on the same CPU and spin forever on a lock that will
//! never be released.
//!
//! # Platform
//!
//! On bare-metal `x86_64` (`target_os = "none"`) the helpers snapshot the
//! `IF` bit (bit 9 of `RFLAGS`) and issue `cli`/`sti`. Hosted builds
//! (unit tests, simulators) run in user mode where neither instruction is
//! legal; there the state is always reported as "disabled" and restoring it
//! is a no-op.

/// Interrupt state captured by [`local_irq_save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the saved state must be handed back to local_irq_restore"]
pub struct IrqState {
    /// Whether interrupts were enabled (IF=1) when the state was saved.
    were_enabled: bool,
}

impl IrqState {
    /// Returns `true` if interrupts were enabled before they were masked.
    #[inline]
    #[must_use]
    pub const fn were_enabled(self) -> bool {
        self.were_enabled
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod arch {
    /// `RFLAGS.IF`.
    const RFLAGS_IF: u64 = 1 << 9;

    #[inline]
    pub fn interrupts_enabled() -> bool {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
        (r & RFLAGS_IF) != 0
    }

    #[inline]
    pub fn disable() {
        unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    pub fn enable() {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod arch {
    #[inline]
    pub const fn interrupts_enabled() -> bool {
        false
    }

    #[inline]
    pub const fn disable() {}

    #[inline]
    pub const fn enable() {}
}

/// Disables local interrupts and returns the previous state.
///
/// # Safety & Privilege
///
/// On bare metal this must run in a context where `cli` is permitted
/// (ring 0).
#[inline]
pub fn local_irq_save() -> IrqState {
    let were_enabled = arch::interrupts_enabled();
    if were_enabled {
        arch::disable();
    }
    IrqState { were_enabled }
}

/// Restores the interrupt state captured by [`local_irq_save`].
///
/// Interrupts are re-enabled **only** if they were enabled when the state
/// was saved, so nested save/restore pairs compose.
#[inline]
pub fn local_irq_restore(state: IrqState) {
    if state.were_enabled {
        arch::enable();
    }
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// # Examples
///
/// ```
/// use kernel_sync::IrqGuard;
///
/// {
///     let _g = IrqGuard::new(); // interrupts masked here if they were enabled
///     // critical section
/// }
/// // previous state restored
/// ```
pub struct IrqGuard {
    state: IrqState,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: local_irq_save(),
        }
    }

    /// The state that will be restored when the guard is dropped.
    #[inline]
    #[must_use]
    pub const fn saved(&self) -> IrqState {
        self.state
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        local_irq_restore(self.state);
    }
}
