//! # VSP1 display lists
//!
//! A display list is a batch of `(register, value)` writes that the VSP1
//! fetches and applies on its own through DMA. One [`Manager`] per hardware
//! output (WPF) owns a fixed pool of lists and tracks which of them hardware
//! currently holds.
//!
//! ```text
//!            get()                       commit()
//!   free ─────────────▶ caller ─────────────────────────┐
//!    ▲                   │ put()                         ▼
//!    ├───────────────────┘               ┌───────── update pending? ─────────┐
//!    │                                   │ no                                │ yes
//!    │                                   ▼                                   ▼
//!    │      old queued, superseded ◀── queued ◀──── frame end ─────────── pending
//!    │      pending                       │ frame end
//!    │                                    ▼
//!    └──────────────── old active ◀──── active
//! ```
//!
//! Single-shot managers skip the double buffering: `commit` goes straight to
//! active and the next frame end retires it.
//!
//! In header mode every list carries a [`DlHeader`] describing its primary
//! body, up to seven fragment bodies and the link to the next header, and
//! lists can be chained so hardware runs them back to back. In headerless
//! mode the single body is handed over through registers.
//!
//! The lock is never held across allocation or release of DMA memory.
//! Fragments of retired lists are freed by [`Manager::collect_garbage`],
//! which the platform runs from the deferred work item it provides through
//! [`DeferredWork`](kernel_hal::DeferredWork).

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod body;
mod config;
mod error;
mod gc;
mod handoff;
pub mod header;
mod list;
mod manager;
mod pool;
pub mod regs;

pub use body::Body;
pub use config::{DL_ENTRY_SIZE, DL_MAX_BODIES, DL_NUM_ENTRIES, DlMode, ManagerConfig};
pub use error::{DlError, Rejected};
pub use header::{DlEntry, DlHeader, DlHeaderFlags, DlHeaderList};
pub use list::{DisplayList, ListId};
pub use manager::{DlPlatform, FrameEnd, Manager, ManagerId, Slots};
