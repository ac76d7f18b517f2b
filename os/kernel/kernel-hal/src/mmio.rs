use alloc::sync::Arc;
use core::ptr::NonNull;

/// 32-bit register access at a byte offset from a device's register base.
///
/// Implementations must order all prior normal-memory writes (e.g. to DMA
/// buffers) before a register write becomes visible to the device, the way
/// `writel` does.
pub trait RegisterIo {
    /// Read the register at byte offset `reg`.
    fn read(&self, reg: u32) -> u32;

    /// Write `value` to the register at byte offset `reg`.
    fn write(&self, reg: u32, value: u32);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    #[inline]
    fn read(&self, reg: u32) -> u32 {
        (**self).read(reg)
    }

    #[inline]
    fn write(&self, reg: u32, value: u32) {
        (**self).write(reg, value);
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for Arc<T> {
    #[inline]
    fn read(&self, reg: u32) -> u32 {
        (**self).read(reg)
    }

    #[inline]
    fn write(&self, reg: u32, value: u32) {
        (**self).write(reg, value);
    }
}

/// A memory-mapped register window accessed with volatile 32-bit loads and
/// stores.
pub struct Mmio {
    base: NonNull<u32>,
    len: usize,
}

// Safety: MMIO accesses are single volatile word operations.
unsafe impl Send for Mmio {}
unsafe impl Sync for Mmio {}

impl Mmio {
    /// # Safety
    /// - `base` must point to a mapped register window of at least `len`
    ///   bytes, aligned to 4 bytes, valid for the lifetime of the `Mmio`.
    /// - The mapping must be uncached / device memory.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u32>, len: usize) -> Self {
        Self { base, len }
    }

    #[inline]
    fn slot(&self, reg: u32) -> *mut u32 {
        let off = reg as usize;
        assert!(
            off % 4 == 0 && off + 4 <= self.len,
            "register offset {off:#x} outside window"
        );
        unsafe { self.base.as_ptr().add(off / 4) }
    }
}

impl RegisterIo for Mmio {
    #[inline]
    fn read(&self, reg: u32) -> u32 {
        unsafe { self.slot(reg).read_volatile() }
    }

    #[inline]
    fn write(&self, reg: u32, value: u32) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::Release);
        unsafe { self.slot(reg).write_volatile(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_window_round_trips_words() {
        let mut regs = [0u32; 0x50];
        let mmio = unsafe { Mmio::new(NonNull::new(regs.as_mut_ptr()).unwrap(), 0x140) };

        mmio.write(0x100, 0xdead_beef);
        mmio.write(0x0, 7);
        assert_eq!(mmio.read(0x100), 0xdead_beef);
        assert_eq!(mmio.read(0x0), 7);
        assert_eq!(mmio.read(0x4), 0);
        drop(mmio);
        assert_eq!(regs[0x40], 0xdead_beef);
    }

    #[test]
    #[should_panic(expected = "outside window")]
    fn access_beyond_window_panics() {
        let mut regs = [0u32; 4];
        let mmio = unsafe { Mmio::new(NonNull::new(regs.as_mut_ptr()).unwrap(), 16) };
        mmio.read(16);
    }

    #[test]
    fn shared_references_forward() {
        let mut regs = [0u32; 4];
        let mmio = unsafe { Mmio::new(NonNull::new(regs.as_mut_ptr()).unwrap(), 16) };
        let by_ref: &dyn RegisterIo = &mmio;
        (&by_ref).write(8, 3);
        assert_eq!(mmio.read(8), 3);
    }
}
