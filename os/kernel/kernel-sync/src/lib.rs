//! # Kernel synchronization primitives
//!
//! Interrupt-aware spinning locks for state shared between process context
//! and hard interrupt handlers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::{IrqGuard, IrqState, local_irq_restore, local_irq_save};
pub use spin_lock::{SpinLock, SpinLockGuard, SpinLockIrqGuard};
