use alloc::sync::Arc;
use core::fmt;
use core::ptr::NonNull;

/// A bus address as seen by a 32-bit DMA master.
///
/// Distinct from CPU pointers so the two can't be mixed up: the device only
/// ever receives `DmaAddress`es, the CPU only ever dereferences the pointer
/// inside a [`DmaRegion`].
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DmaAddress(u32);

impl DmaAddress {
    #[inline]
    #[must_use]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Offset this address by `bytes`.
    ///
    /// # Panics
    /// If the result leaves the 32-bit bus window.
    #[inline]
    #[must_use]
    pub const fn offset(self, bytes: u32) -> Self {
        match self.0.checked_add(bytes) {
            Some(a) => Self(a),
            None => panic!("DMA address overflow"),
        }
    }
}

impl fmt::Debug for DmaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DmaAddress({:#010x})", self.0)
    }
}

impl fmt::Display for DmaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// One DMA-coherent allocation: a CPU mapping plus the device address of the
/// same memory.
///
/// The region is viewed as 32-bit words, the access width of every structure
/// the devices in this tree read through DMA. A region is not freed on drop;
/// it has to go back through [`DmaAlloc::free_coherent`], which may block and
/// therefore must not run under a spin lock or in interrupt context.
pub struct DmaRegion {
    cpu: NonNull<u32>,
    dma: DmaAddress,
    size: usize,
}

// Safety: the region is exclusively owned; the pointer is never shared.
unsafe impl Send for DmaRegion {}

impl DmaRegion {
    /// # Safety
    /// - `cpu` must be valid for reads and writes of `size` bytes, 4-byte
    ///   aligned, and exclusively owned by the returned region until it is
    ///   handed back to the allocator that produced it.
    /// - `dma` must be the device address of the same memory.
    /// - `size` must be a multiple of 4.
    #[must_use]
    pub const unsafe fn from_raw_parts(cpu: NonNull<u32>, dma: DmaAddress, size: usize) -> Self {
        Self { cpu, dma, size }
    }

    /// Device address of the first byte.
    #[inline]
    #[must_use]
    pub const fn dma(&self) -> DmaAddress {
        self.dma
    }

    /// CPU address of the first byte.
    #[inline]
    #[must_use]
    pub const fn cpu(&self) -> NonNull<u32> {
        self.cpu
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn words(&self) -> &[u32] {
        unsafe { core::slice::from_raw_parts(self.cpu.as_ptr(), self.size / 4) }
    }

    #[inline]
    #[must_use]
    pub const fn words_mut(&mut self) -> &mut [u32] {
        unsafe { core::slice::from_raw_parts_mut(self.cpu.as_ptr(), self.size / 4) }
    }
}

impl fmt::Debug for DmaRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaRegion")
            .field("dma", &self.dma)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Allocator for DMA-coherent (write-combined) memory.
pub trait DmaAlloc {
    /// Allocate a zeroed region of at least `size` bytes.
    ///
    /// Returns `None` on out-of-memory. May block.
    fn alloc_coherent(&self, size: usize) -> Option<DmaRegion>;

    /// Return a region obtained from [`alloc_coherent`](Self::alloc_coherent)
    /// on the same allocator. May block.
    fn free_coherent(&self, region: DmaRegion);
}

impl<T: DmaAlloc + ?Sized> DmaAlloc for &T {
    #[inline]
    fn alloc_coherent(&self, size: usize) -> Option<DmaRegion> {
        (**self).alloc_coherent(size)
    }

    #[inline]
    fn free_coherent(&self, region: DmaRegion) {
        (**self).free_coherent(region);
    }
}

impl<T: DmaAlloc + ?Sized> DmaAlloc for Arc<T> {
    #[inline]
    fn alloc_coherent(&self, size: usize) -> Option<DmaRegion> {
        (**self).alloc_coherent(size)
    }

    #[inline]
    fn free_coherent(&self, region: DmaRegion) {
        (**self).free_coherent(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_offsets() {
        let a = DmaAddress::new(0x4000_0000);
        assert_eq!(a.offset(0x800).as_u32(), 0x4000_0800);
        assert_eq!(format!("{a}"), "0x40000000");
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn address_overflow_panics() {
        let _ = DmaAddress::new(u32::MAX).offset(4);
    }

    #[test]
    fn region_views_words() {
        let mut backing = vec![0u32; 4];
        let ptr = NonNull::new(backing.as_mut_ptr()).unwrap();
        let mut region = unsafe { DmaRegion::from_raw_parts(ptr, DmaAddress::new(0x1000), 16) };
        region.words_mut()[2] = 9;
        assert_eq!(region.words(), &[0, 0, 9, 0]);
        assert_eq!(region.size(), 16);
        drop(region);
        assert_eq!(backing[2], 9);
    }
}
