use crate::config::DL_ENTRY_SIZE;
use crate::error::DlError;
use crate::header::DlEntry;
use kernel_hal::{DmaAddress, DmaAlloc, DmaRegion};

/// Words per entry in DMA memory.
const ENTRY_WORDS: usize = DL_ENTRY_SIZE / 4;

/// Byte count as the 32-bit quantity the hardware takes.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn bytes_u32(bytes: usize) -> u32 {
    bytes as u32
}

/// A fixed-capacity, append-only buffer of `(register, value)` entries in
/// DMA-coherent memory.
///
/// Bodies are either the primary body of a [`DisplayList`](crate::DisplayList)
/// or stand-alone fragments from
/// [`Manager::alloc_fragment`](crate::Manager::alloc_fragment). The DMA
/// region is not released on drop; it goes back through the manager.
#[derive(Debug)]
pub struct Body {
    region: DmaRegion,
    capacity: usize,
    num_entries: usize,
}

impl Body {
    /// Allocate room for `capacity` entries followed by `extra` bytes.
    pub(crate) fn alloc(dma: &impl DmaAlloc, capacity: usize, extra: usize) -> Result<Self, DlError> {
        let size = capacity * DL_ENTRY_SIZE + extra;
        let region = dma.alloc_coherent(size).ok_or(DlError::OutOfMemory)?;
        Ok(Self {
            region,
            capacity,
            num_entries: 0,
        })
    }

    /// Append one entry. The value is stored verbatim.
    ///
    /// Staying within [`capacity`](Self::capacity) is the caller's job.
    ///
    /// # Panics
    /// If the body is already full.
    #[inline]
    pub fn write(&mut self, reg: u32, data: u32) {
        debug_assert!(self.num_entries < self.capacity, "display list body overflow");
        let i = self.num_entries * ENTRY_WORDS;
        let entries = &mut self.region.words_mut()[..self.capacity * ENTRY_WORDS];
        entries[i] = reg;
        entries[i + 1] = data;
        self.num_entries += 1;
    }

    #[inline]
    #[must_use]
    pub const fn num_entries(&self) -> usize {
        self.num_entries
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Device address of the first entry.
    #[inline]
    #[must_use]
    pub const fn dma(&self) -> DmaAddress {
        self.region.dma()
    }

    /// Size of the written entries in bytes, as programmed into hardware.
    #[inline]
    #[must_use]
    pub const fn byte_size(&self) -> u32 {
        bytes_u32(self.num_entries * DL_ENTRY_SIZE)
    }

    #[must_use]
    pub fn entries(&self) -> impl Iterator<Item = DlEntry> + '_ {
        self.region.words()[..self.num_entries * ENTRY_WORDS]
            .chunks_exact(ENTRY_WORDS)
            .map(|e| DlEntry {
                addr: e[0],
                data: e[1],
            })
    }

    #[inline]
    pub(crate) const fn reset(&mut self) {
        self.num_entries = 0;
    }

    /// Device address of the bytes following the entries.
    pub(crate) const fn tail_dma(&self) -> DmaAddress {
        self.region
            .dma()
            .offset(bytes_u32(self.capacity * DL_ENTRY_SIZE))
    }

    pub(crate) fn tail_words(&self) -> &[u32] {
        &self.region.words()[self.capacity * ENTRY_WORDS..]
    }

    pub(crate) fn tail_words_mut(&mut self) -> &mut [u32] {
        &mut self.region.words_mut()[self.capacity * ENTRY_WORDS..]
    }

    /// Release the DMA memory. May block.
    pub(crate) fn free(self, dma: &impl DmaAlloc) {
        dma.free_coherent(self.region);
    }
}
