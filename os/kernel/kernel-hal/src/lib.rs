//! # Device Boundary Traits
//!
//! The narrow interface a device driver core needs from the platform it runs
//! on, kept separate so the core can be exercised on a host with fakes.
//!
//! | Concern | Trait | Provided here |
//! |---------|-------|---------------|
//! | 32-bit register access | [`RegisterIo`] | [`Mmio`] (volatile MMIO window) |
//! | DMA-coherent memory | [`DmaAlloc`] | [`DmaRegion`], [`DmaAddress`] |
//! | Deferred (sleepable) work | [`DeferredWork`] | none |
//!
//! All traits are implemented for `&T` and `Arc<T>` so that one platform
//! object can back several drivers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod dma;
mod mmio;
mod work;

pub use dma::{DmaAddress, DmaAlloc, DmaRegion};
pub use mmio::{Mmio, RegisterIo};
pub use work::DeferredWork;
