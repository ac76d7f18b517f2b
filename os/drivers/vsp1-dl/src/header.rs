//! # Display list header
//!
//! The header is read by the DL unit through DMA. Its layout, in 32-bit
//! words:
//!
//! ```text
//! word  0        num_lists      number of bodies - 1
//! words 1..=16   lists[8]       (num_bytes, addr) per body
//! word  17       next_header    device address of the next header
//! word  18       flags          bit0 auto-start, bit1 interrupt enable
//! ```
//!
//! Words are stored in CPU order; any swap is configured through `DL_SWAP`.

use crate::config::DL_MAX_BODIES;
use bitfield_struct::bitfield;
use kernel_hal::DmaAddress;

/// Words in a serialized header.
pub const DL_HEADER_WORDS: usize = 1 + 2 * DL_MAX_BODIES + 2;

/// Bytes reserved after the primary body for the header (8-byte aligned).
pub const DL_HEADER_ALLOC: usize = (DL_HEADER_WORDS * 4).next_multiple_of(8);

/// Header `flags` word.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct DlHeaderFlags {
    /// Bit 0: start processing `next_header` when this list completes.
    pub auto_start: bool,
    /// Bit 1: raise the frame-end interrupt when this list completes.
    pub int_enable: bool,
    #[bits(30)]
    __: u32,
}

/// One `(register, value)` pair of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DlEntry {
    pub addr: u32,
    pub data: u32,
}

/// Body descriptor inside a header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DlHeaderList {
    pub num_bytes: u32,
    pub addr: DmaAddress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DlHeader {
    pub num_lists: u32,
    pub lists: [DlHeaderList; DL_MAX_BODIES],
    pub next_header: DmaAddress,
    pub flags: DlHeaderFlags,
}

impl DlHeader {
    /// The descriptors hardware will process, in order.
    #[must_use]
    pub fn bodies(&self) -> &[DlHeaderList] {
        let n = (self.num_lists as usize + 1).min(DL_MAX_BODIES);
        &self.lists[..n]
    }

    /// Serialize into the first [`DL_HEADER_WORDS`] words of `words`.
    ///
    /// # Panics
    /// If `words` is shorter than [`DL_HEADER_WORDS`].
    pub fn store(&self, words: &mut [u32]) {
        let words = &mut words[..DL_HEADER_WORDS];
        words[0] = self.num_lists;
        for (slot, list) in words[1..=2 * DL_MAX_BODIES]
            .chunks_exact_mut(2)
            .zip(&self.lists)
        {
            slot[0] = list.num_bytes;
            slot[1] = list.addr.as_u32();
        }
        words[DL_HEADER_WORDS - 2] = self.next_header.as_u32();
        words[DL_HEADER_WORDS - 1] = self.flags.into_bits();
    }

    /// Deserialize from the first [`DL_HEADER_WORDS`] words of `words`.
    ///
    /// # Panics
    /// If `words` is shorter than [`DL_HEADER_WORDS`].
    #[must_use]
    pub fn load(words: &[u32]) -> Self {
        let words = &words[..DL_HEADER_WORDS];
        let mut lists = [DlHeaderList::default(); DL_MAX_BODIES];
        for (list, slot) in lists.iter_mut().zip(words[1..=2 * DL_MAX_BODIES].chunks_exact(2)) {
            *list = DlHeaderList {
                num_bytes: slot[0],
                addr: DmaAddress::new(slot[1]),
            };
        }
        Self {
            num_lists: words[0],
            lists,
            next_header: DmaAddress::new(words[DL_HEADER_WORDS - 2]),
            flags: DlHeaderFlags::from_bits(words[DL_HEADER_WORDS - 1]),
        }
    }
}
