use crate::body::{Body, bytes_u32};
use crate::config::DL_MAX_BODIES;
use crate::error::{DlError, Rejected};
use crate::header::{DL_HEADER_ALLOC, DlHeader, DlHeaderFlags, DlHeaderList};
use crate::manager::ManagerId;
use alloc::collections::LinkedList;
use alloc::vec::{self, Vec};
use core::fmt;
use kernel_hal::{DmaAddress, DmaAlloc};

/// Identity of a pooled display list within its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListId(usize);

impl ListId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dl{}", self.0)
    }
}

/// One committable batch of register writes.
///
/// Lists are owned by their [`Manager`](crate::Manager) and lent out by
/// [`Manager::get`](crate::Manager::get). While checked out the caller owns
/// the list outright; [`Manager::commit`](crate::Manager::commit) and
/// [`Manager::put`](crate::Manager::put) hand it back. Dropping a list
/// instead leaks its DMA memory and shrinks the pool.
#[derive(Debug)]
#[must_use = "display lists must be committed or put back"]
pub struct DisplayList {
    id: ListId,
    /// The manager the list belongs to.
    owner: ManagerId,
    body0: Body,
    /// Device address of the header, `None` for headerless lists.
    header: Option<DmaAddress>,
    fragments: LinkedList<Body>,
    chain: Vec<DisplayList>,
    internal: bool,
}

impl DisplayList {
    pub(crate) fn alloc(
        dma: &impl DmaAlloc,
        id: ListId,
        owner: ManagerId,
        num_entries: usize,
        with_header: bool,
    ) -> Result<Self, DlError> {
        // The header shares the primary body's allocation, right after the
        // entries.
        let extra = if with_header { DL_HEADER_ALLOC } else { 0 };
        let mut body0 = Body::alloc(dma, num_entries, extra)?;

        let header = with_header.then(|| {
            let mut hdr = DlHeader::default();
            hdr.lists[0].addr = body0.dma();
            hdr.store(body0.tail_words_mut());
            body0.tail_dma()
        });

        Ok(Self {
            id,
            owner,
            body0,
            header,
            fragments: LinkedList::new(),
            chain: Vec::new(),
            internal: false,
        })
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ListId {
        self.id
    }

    /// The manager the list was allocated by.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> ManagerId {
        self.owner
    }

    /// Append a register write to the primary body.
    ///
    /// Up to the manager's `num_entries` writes fit in a list.
    #[inline]
    pub fn write(&mut self, reg: u32, data: u32) {
        self.body0.write(reg, data);
    }

    /// Entries written to the primary body.
    #[inline]
    #[must_use]
    pub const fn num_entries(&self) -> usize {
        self.body0.num_entries()
    }

    #[must_use]
    pub fn num_fragments(&self) -> usize {
        self.fragments.len()
    }

    /// Lists chained behind this one.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.internal
    }

    /// Device address of the header, if the list has one.
    #[inline]
    #[must_use]
    pub const fn header_address(&self) -> Option<DmaAddress> {
        self.header
    }

    /// Device address of the primary body.
    #[inline]
    #[must_use]
    pub const fn body_address(&self) -> DmaAddress {
        self.body0.dma()
    }

    /// Byte size of the primary body's written entries.
    #[inline]
    #[must_use]
    pub const fn body_size(&self) -> u32 {
        self.body0.byte_size()
    }

    /// The header as currently stored in DMA memory.
    #[must_use]
    pub fn header(&self) -> Option<DlHeader> {
        self.header.map(|_| DlHeader::load(self.body0.tail_words()))
    }

    /// Add a fragment body, processed after the primary body and after every
    /// fragment added before it.
    ///
    /// The list takes ownership of the fragment and releases it when the
    /// list is put back.
    ///
    /// # Errors
    /// - [`DlError::HeaderlessList`] if the list has no header.
    /// - [`DlError::TooManyBodies`] if the header is full.
    ///
    /// The fragment is handed back in either case.
    pub fn add_fragment(&mut self, body: Body) -> Result<(), Rejected<Body>> {
        if self.header.is_none() {
            return Err(Rejected::new(DlError::HeaderlessList, body));
        }
        if self.fragments.len() + 1 >= DL_MAX_BODIES {
            return Err(Rejected::new(DlError::TooManyBodies, body));
        }
        self.fragments.push_back(body);
        Ok(())
    }

    /// Chain `list` behind this one and every list chained before it.
    ///
    /// Hardware processes a chain without CPU intervention and completes
    /// once, after its last list. The head takes ownership of `list`; lists
    /// already chained behind `list` move along in order.
    ///
    /// # Errors
    /// - [`DlError::HeaderlessList`] if this list has no header.
    /// - [`DlError::ForeignList`] if `list` belongs to another manager.
    ///
    /// `list` is handed back in either case.
    pub fn add_chain(&mut self, mut list: Self) -> Result<(), Rejected<Self>> {
        if self.header.is_none() {
            return Err(Rejected::new(DlError::HeaderlessList, list));
        }
        if list.owner != self.owner {
            return Err(Rejected::new(DlError::ForeignList, list));
        }

        let tail = core::mem::take(&mut list.chain);
        self.chain.push(list);
        self.chain.extend(tail);
        Ok(())
    }

    pub(crate) const fn set_internal(&mut self, internal: bool) {
        self.internal = internal;
    }

    /// The address hardware is handed: the header, or the body for
    /// headerless lists.
    pub(crate) fn hw_address(&self) -> DmaAddress {
        self.header.unwrap_or_else(|| self.body0.dma())
    }

    /// Finalize the headers of this list and every chained list.
    pub(crate) fn fill_headers(&mut self, singleshot: bool) {
        let first = self.chain.first().and_then(|dl| dl.header);
        self.fill_header(first, singleshot);

        for i in 0..self.chain.len() {
            let next = self.chain.get(i + 1).and_then(|dl| dl.header);
            self.chain[i].fill_header(next, singleshot);
        }
    }

    /// Describe every body in processing order and link to `next`, if any.
    ///
    /// - chained and not last: jump to `next` automatically, no interrupt.
    /// - continuous: loop back onto itself and interrupt at every frame end.
    /// - single-shot: interrupt and stop.
    fn fill_header(&mut self, next: Option<DmaAddress>, singleshot: bool) {
        let Some(own) = self.header else {
            return;
        };

        let mut hdr = DlHeader::default();
        hdr.lists[0] = DlHeaderList {
            num_bytes: self.body0.byte_size(),
            addr: self.body0.dma(),
        };
        for (slot, dlb) in hdr.lists[1..].iter_mut().zip(&self.fragments) {
            *slot = DlHeaderList {
                num_bytes: dlb.byte_size(),
                addr: dlb.dma(),
            };
        }
        hdr.num_lists = bytes_u32(self.fragments.len());

        (hdr.next_header, hdr.flags) = match next {
            Some(next) => (next, DlHeaderFlags::new().with_auto_start(true)),
            None if !singleshot => (
                own,
                DlHeaderFlags::new().with_auto_start(true).with_int_enable(true),
            ),
            None => (DmaAddress::default(), DlHeaderFlags::new().with_int_enable(true)),
        };

        hdr.store(self.body0.tail_words_mut());
    }

    /// Bodies in processing order, for inspection.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        core::iter::once(&self.body0).chain(self.fragments.iter())
    }

    /// Empty the list for the free pool and move its fragments onto `gc`.
    /// Returns whether any fragment was moved.
    ///
    /// Moves only; nothing is allocated or freed.
    pub(crate) fn recycle(&mut self, gc: &mut LinkedList<Body>) -> bool {
        let had_fragments = !self.fragments.is_empty();
        gc.append(&mut self.fragments);
        self.body0.reset();
        self.internal = false;
        had_fragments
    }

    /// Detach the chained lists. The chain keeps its storage for reuse.
    pub(crate) fn drain_chain(&mut self) -> vec::Drain<'_, Self> {
        self.chain.drain(..)
    }

    /// Release all DMA memory. May block.
    pub(crate) fn free(self, dma: &impl DmaAlloc) {
        debug_assert!(self.chain.is_empty());
        for dlb in self.fragments {
            dlb.free(dma);
        }
        self.body0.free(dma);
    }
}
