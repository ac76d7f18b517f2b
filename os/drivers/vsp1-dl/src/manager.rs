use crate::config::{DlMode, ManagerConfig};
use crate::error::{DlError, Rejected};
use crate::handoff::HandOff;
use crate::list::{DisplayList, ListId};
use crate::pool::Pool;
use crate::regs::{self, DlCtrl, DlSwap};
use bitfield_struct::bitfield;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};
use kernel_hal::{DeferredWork, DmaAlloc, RegisterIo};
use kernel_sync::SpinLock;
use log::{debug, error, trace, warn};

/// Everything a manager needs from the platform.
pub trait DlPlatform: RegisterIo + DmaAlloc + DeferredWork {}

impl<T: RegisterIo + DmaAlloc + DeferredWork + ?Sized> DlPlatform for T {}

/// Identity of one [`Manager`] instance, stamped into every list it
/// allocates.
///
/// Unlike the output index this tells apart managers of the same output on
/// different devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerId(u32);

impl ManagerId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dlm{}", self.0)
    }
}

/// Status returned by [`Manager::irq_frame_end`].
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct FrameEnd {
    /// The previous list completed. Not set when a commit raced the
    /// interrupt; completion then moves to the next frame end.
    pub completed: bool,
    /// The completed list was committed with the internal flag.
    pub internal: bool,
    #[bits(6)]
    __: u8,
}

/// Ids of the lists currently owned by hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slots {
    /// Being executed.
    pub active: Option<ListId>,
    /// Handed to hardware, not started yet.
    pub queued: Option<ListId>,
    /// Committed while the last hand-off was still unlatched.
    pub pending: Option<ListId>,
}

#[derive(Debug)]
pub(crate) struct DlState {
    pub pool: Pool,
    pub active: Option<DisplayList>,
    pub queued: Option<DisplayList>,
    pub pending: Option<DisplayList>,
}

/// Display-list manager for one hardware output.
///
/// Owns a fixed pool of lists and the active/queued/pending set, all behind
/// one interrupt-safe spin lock held only to move lists around. Nothing is
/// allocated or freed with the lock held: retired fragments are queued and
/// released by [`collect_garbage`](Self::collect_garbage), which the
/// platform runs from its deferred work item.
///
/// Dropping the manager cancels the work item and releases all memory it
/// owns; see [`destroy`](Self::destroy).
pub struct Manager<P: DlPlatform> {
    pub(crate) id: ManagerId,
    pub(crate) index: u32,
    pub(crate) mode: DlMode,
    pub(crate) handoff: HandOff,
    pub(crate) singleshot: bool,
    pub(crate) prealloc: usize,
    pub(crate) num_entries: usize,
    pub(crate) platform: P,
    pub(crate) state: SpinLock<DlState>,
}

impl<P: DlPlatform> Manager<P> {
    /// Create the manager and allocate its pool.
    ///
    /// May block. Every list is allocated before the manager exists; on
    /// failure the lists allocated so far are released again.
    ///
    /// # Errors
    /// [`DlError::OutOfMemory`] if a list cannot be allocated.
    pub fn create(platform: P, config: ManagerConfig) -> Result<Self, DlError> {
        let ManagerConfig {
            index,
            mode,
            singleshot,
            prealloc,
            num_entries,
        } = config;

        let owner = ManagerId::next();
        let mut pool = Pool::with_capacity(prealloc);
        for i in 0..prealloc {
            let id = ListId::new(i);
            match DisplayList::alloc(&platform, id, owner, num_entries, mode == DlMode::Header) {
                Ok(dl) => pool.free.push_back(dl),
                Err(e) => {
                    error!("wpf{index}: failed to allocate display list {i} of {prealloc}: {e}");
                    for dl in pool.free.drain(..) {
                        dl.free(&platform);
                    }
                    return Err(e);
                }
            }
        }

        debug!(
            "wpf{index}: display list manager with {prealloc} lists, {mode:?} mode, {}",
            if singleshot { "single-shot" } else { "continuous" }
        );

        Ok(Self {
            id: owner,
            index,
            mode,
            handoff: HandOff::new(mode, index),
            singleshot,
            prealloc,
            num_entries,
            platform,
            state: SpinLock::new(DlState {
                pool,
                active: None,
                queued: None,
                pending: None,
            }),
        })
    }

    /// Tear the manager down. Same as dropping it.
    ///
    /// The deferred work item is cancelled, lists still owned by hardware are
    /// retired, and every pooled list and queued fragment is freed. Hardware
    /// must be stopped. May block.
    pub fn destroy(self) {
        drop(self);
    }

    /// Program the global display-list control registers.
    ///
    /// Continuous managers enable continuous frame mode and headerless
    /// operation of the first output; single-shot managers use manual
    /// start.
    pub fn setup(&self) {
        let mut ctrl = DlCtrl::new()
            .with_ar_wait(256)
            .with_dc2(true)
            .with_dc1(true)
            .with_dc0(true)
            .with_dle(true);
        if !self.singleshot {
            ctrl = ctrl.with_cfm0(true).with_nh0(true);
        }
        debug!("wpf{}: DL_CTRL {:#010x}", self.index, ctrl.into_bits());

        self.platform.write(regs::DL_CTRL, ctrl.into_bits());
        self.platform
            .write(regs::DL_SWAP, DlSwap::new().with_lws(true).into_bits());
    }

    /// Take an empty list from the pool.
    ///
    /// `None` means the pool is exhausted. Callers should skip the update
    /// rather than spin; lists come back as hardware retires them.
    pub fn get(&self) -> Option<DisplayList> {
        let dl = self.state.lock_irqsave().pool.take()?;
        debug_assert_eq!(dl.num_entries(), 0);
        debug_assert_eq!(dl.chain_len(), 0);
        Some(dl)
    }

    /// Return a list and everything chained behind it to the pool.
    ///
    /// Fragments are released later by the garbage collector. Passing `None`
    /// does nothing.
    ///
    /// # Errors
    /// [`DlError::ForeignList`] if the list was allocated by another manager.
    /// It is handed back untouched.
    pub fn put(&self, dl: impl Into<Option<DisplayList>>) -> Result<(), Rejected<DisplayList>> {
        let Some(dl) = dl.into() else {
            return Ok(());
        };
        let dl = self.check_owner(dl)?;

        let gc = self.state.lock_irqsave().pool.retire(dl);
        if gc {
            self.platform.schedule();
        }
        Ok(())
    }

    fn check_owner(&self, dl: DisplayList) -> Result<DisplayList, Rejected<DisplayList>> {
        if dl.owner() == self.id {
            return Ok(dl);
        }
        warn!(
            "wpf{}: refusing {} of {}, this is {}",
            self.index,
            dl.id(),
            dl.owner(),
            self.id
        );
        Err(Rejected::new(DlError::ForeignList, dl))
    }

    /// Finalize `dl` and hand it to hardware.
    ///
    /// In header mode the headers of `dl` and its chain are written first.
    /// `internal` asks [`irq_frame_end`](Self::irq_frame_end) to report the
    /// list's completion with [`FrameEnd::internal`].
    ///
    /// A single-shot manager programs hardware immediately; hardware must be
    /// idle. A continuous manager queues the list behind the running one,
    /// or holds it as pending while hardware has not latched the previous
    /// hand-off yet. A pending list is replaced by a newer commit.
    ///
    /// # Errors
    /// [`DlError::ForeignList`] if the list was allocated by another manager.
    /// It is handed back and hardware is not touched.
    pub fn commit(&self, dl: DisplayList, internal: bool) -> Result<(), Rejected<DisplayList>> {
        let mut dl = self.check_owner(dl)?;

        if self.mode == DlMode::Header {
            dl.fill_headers(self.singleshot);
        }
        dl.set_internal(internal);

        let gc = {
            let mut state = self.state.lock_irqsave();
            if self.singleshot {
                self.commit_singleshot(&mut state, dl)
            } else {
                self.commit_continuous(&mut state, dl)
            }
        };
        if gc {
            self.platform.schedule();
        }
        Ok(())
    }

    fn commit_singleshot(&self, state: &mut DlState, dl: DisplayList) -> bool {
        self.handoff.enqueue(&self.platform, &dl);

        let id = dl.id();
        state.active.replace(dl).is_some_and(|old| {
            warn!("wpf{}: {id} committed over active {}", self.index, old.id());
            state.pool.retire(old)
        })
    }

    fn commit_continuous(&self, state: &mut DlState, dl: DisplayList) -> bool {
        if self.handoff.update_pending(&self.platform, state.queued.as_ref()) {
            trace!("wpf{}: update pending, {} held back", self.index, dl.id());
            return state.pending.replace(dl).is_some_and(|old| {
                if old.is_internal() {
                    warn!(
                        "wpf{}: pending internal {} superseded before completion",
                        self.index,
                        old.id()
                    );
                }
                state.pool.retire(old)
            });
        }

        self.handoff.enqueue(&self.platform, &dl);
        let old = state.queued.replace(dl);
        old.is_some_and(|old| state.pool.retire(old))
    }

    /// Advance the pipeline at a frame-end interrupt.
    ///
    /// Runs in interrupt context. Single-shot managers retire the active
    /// list and always report completion. Continuous managers promote the
    /// queued list to active and hand the pending list to hardware, unless
    /// hardware has not latched the last hand-off yet; the frame is then
    /// skipped and retried at the next interrupt.
    #[must_use]
    pub fn irq_frame_end(&self) -> FrameEnd {
        let mut flags = FrameEnd::new();

        let gc = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if self.singleshot {
                flags.set_completed(true);
                state.pool.retire_slot(&mut state.active)
            } else if self.handoff.update_pending(&self.platform, state.queued.as_ref()) {
                trace!("wpf{}: frame end raced a commit, retrying", self.index);
                false
            } else {
                let mut gc = false;

                if let Some(mut dl) = state.queued.take() {
                    flags.set_internal(dl.is_internal());
                    flags.set_completed(true);
                    dl.set_internal(false);
                    trace!("wpf{}: {} active", self.index, dl.id());

                    gc |= state.pool.retire_slot(&mut state.active);
                    state.active = Some(dl);
                }

                if let Some(dl) = state.pending.take() {
                    self.handoff.enqueue(&self.platform, &dl);
                    state.queued = Some(dl);
                }
                gc
            }
        };
        if gc {
            self.platform.schedule();
        }

        flags
    }

    /// Retire every list owned by hardware.
    ///
    /// Hardware must already be stopped; nothing synchronizes with a running
    /// list.
    pub fn reset(&self) {
        let gc = {
            let mut guard = self.state.lock_irqsave();
            guard.retire_all()
        };
        if gc {
            self.platform.schedule();
        }
    }

    /// Lists in the free pool.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.state.lock_irqsave().pool.free.len()
    }

    #[must_use]
    pub fn slots(&self) -> Slots {
        let state = self.state.lock_irqsave();
        Slots {
            active: state.active.as_ref().map(DisplayList::id),
            queued: state.queued.as_ref().map(DisplayList::id),
            pending: state.pending.as_ref().map(DisplayList::id),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ManagerId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> DlMode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub const fn is_singleshot(&self) -> bool {
        self.singleshot
    }

    /// Lists allocated at creation.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.prealloc
    }

    /// Entries each list's primary body holds.
    #[inline]
    #[must_use]
    pub const fn num_entries(&self) -> usize {
        self.num_entries
    }
}

impl DlState {
    /// Retire active, queued and pending. Returns whether fragments were
    /// queued for collection.
    pub fn retire_all(&mut self) -> bool {
        let mut gc = self.pool.retire_slot(&mut self.active);
        gc |= self.pool.retire_slot(&mut self.queued);
        gc |= self.pool.retire_slot(&mut self.pending);
        gc
    }
}

impl<P: DlPlatform> Drop for Manager<P> {
    fn drop(&mut self) {
        self.platform.cancel_sync();

        let state = self.state.get_mut();
        for (name, slot) in [
            ("active", &mut state.active),
            ("queued", &mut state.queued),
            ("pending", &mut state.pending),
        ] {
            if let Some(dl) = slot.take() {
                warn!("wpf{}: {name} {} still owned by hardware at teardown", self.index, dl.id());
                state.pool.retire(dl);
            }
        }

        let free = state.pool.free.len();
        if free != self.prealloc {
            warn!(
                "wpf{}: {} of {} display lists not returned",
                self.index,
                self.prealloc.saturating_sub(free),
                self.prealloc
            );
        }

        for dl in state.pool.free.drain(..) {
            dl.free(&self.platform);
        }
        let fragments = core::mem::take(&mut state.pool.gc);
        let collected = fragments.len();
        for dlb in fragments {
            dlb.free(&self.platform);
        }

        debug!(
            "wpf{}: display list manager destroyed, {free} lists and {collected} fragments freed",
            self.index
        );
    }
}

impl<P: DlPlatform> fmt::Debug for Manager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("mode", &self.mode)
            .field("singleshot", &self.singleshot)
            .field("prealloc", &self.prealloc)
            .finish_non_exhaustive()
    }
}
