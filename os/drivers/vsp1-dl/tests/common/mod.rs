//! Host-side stand-in for the VSP1 platform: a register file, a DMA heap with
//! allocation accounting, and a counter-only deferred work item.

#![allow(dead_code)]

use kernel_hal::{DeferredWork, DmaAddress, DmaAlloc, DmaRegion, RegisterIo};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ptr::NonNull;
use std::sync::{Mutex, Once};
use std::sync::atomic::{AtomicUsize, Ordering};
use vsp1_dl::regs::{self, Cmd, DlBodySize};
use vsp1_dl::{DlHeader, ManagerConfig};

const DMA_BASE: u32 = 0x4000_0000;
const DMA_STRIDE: u32 = 0x1000;

struct Allocation {
    ptr: usize,
    words: usize,
}

#[derive(Default)]
struct Heap {
    next: u32,
    live: BTreeMap<u32, Allocation>,
    /// Allocations still allowed before `alloc_coherent` fails.
    budget: Option<usize>,
}

#[derive(Default)]
pub struct FakePlatform {
    regs: Mutex<BTreeMap<u32, u32>>,
    writes: Mutex<Vec<(u32, u32)>>,
    heap: Mutex<Heap>,
    freed: Mutex<Vec<DmaAddress>>,
    pub allocs: AtomicUsize,
    pub frees: AtomicUsize,
    pub scheduled: AtomicUsize,
    pub cancelled: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every allocation after the next `n`.
    pub fn fail_after(&self, n: usize) {
        self.heap.lock().unwrap().budget = Some(n);
    }

    pub fn live_allocations(&self) -> usize {
        self.heap.lock().unwrap().live.len()
    }

    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Device addresses released so far, oldest first.
    pub fn freed(&self) -> Vec<DmaAddress> {
        self.freed.lock().unwrap().clone()
    }

    pub fn reg(&self, reg: u32) -> u32 {
        self.regs.lock().unwrap().get(&reg).copied().unwrap_or(0)
    }

    pub fn set_reg(&self, reg: u32, value: u32) {
        self.regs.lock().unwrap().insert(reg, value);
    }

    /// Model hardware holding (or having latched) a header hand-off.
    pub fn set_updhdr(&self, index: u32, pending: bool) {
        let cmd = Cmd::from_bits(self.reg(regs::cmd(index))).with_updhdr(pending);
        self.set_reg(regs::cmd(index), cmd.into_bits());
    }

    /// Model hardware holding (or having latched) a headerless hand-off.
    pub fn set_body_upd(&self, pending: bool) {
        let size = DlBodySize::from_bits(self.reg(regs::DL_BODY_SIZE)).with_upd(pending);
        self.set_reg(regs::DL_BODY_SIZE, size.into_bits());
    }

    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Read `n` words of DMA memory starting at device address `addr`.
    pub fn read_words(&self, addr: DmaAddress, n: usize) -> Vec<u32> {
        let heap = self.heap.lock().unwrap();
        let (&base, alloc) = heap
            .live
            .range(..=addr.as_u32())
            .next_back()
            .expect("address not in any live allocation");
        let first = ((addr.as_u32() - base) / 4) as usize;
        assert!(first + n <= alloc.words, "read past the end of the allocation");

        let words = unsafe { std::slice::from_raw_parts(alloc.ptr as *const u32, alloc.words) };
        words[first..first + n].to_vec()
    }

    /// Decode the header hardware would fetch from `addr`.
    pub fn read_header(&self, addr: DmaAddress) -> DlHeader {
        DlHeader::load(&self.read_words(addr, vsp1_dl::header::DL_HEADER_WORDS))
    }
}

impl RegisterIo for FakePlatform {
    fn read(&self, reg: u32) -> u32 {
        self.reg(reg)
    }

    fn write(&self, reg: u32, value: u32) {
        self.writes.lock().unwrap().push((reg, value));
        self.set_reg(reg, value);
    }
}

impl DmaAlloc for FakePlatform {
    fn alloc_coherent(&self, size: usize) -> Option<DmaRegion> {
        let mut heap = self.heap.lock().unwrap();
        if let Some(budget) = heap.budget.as_mut() {
            if *budget == 0 {
                return None;
            }
            *budget -= 1;
        }
        assert!(size <= DMA_STRIDE as usize);

        let words = size.div_ceil(4);
        let ptr = Box::into_raw(vec![0u32; words].into_boxed_slice()).cast::<u32>();
        let dma = DMA_BASE + heap.next * DMA_STRIDE;
        heap.next += 1;
        heap.live.insert(dma, Allocation { ptr: ptr as usize, words });
        self.allocs.fetch_add(1, Ordering::SeqCst);

        Some(unsafe { DmaRegion::from_raw_parts(NonNull::new(ptr)?, DmaAddress::new(dma), words * 4) })
    }

    fn free_coherent(&self, region: DmaRegion) {
        let alloc = self
            .heap
            .lock()
            .unwrap()
            .live
            .remove(&region.dma().as_u32())
            .expect("freeing an unknown region");
        assert_eq!(alloc.ptr, region.cpu().as_ptr() as usize);

        let slice = std::ptr::slice_from_raw_parts_mut(alloc.ptr as *mut u32, alloc.words);
        drop(unsafe { Box::from_raw(slice) });
        self.freed.lock().unwrap().push(region.dma());
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

impl DeferredWork for FakePlatform {
    fn schedule(&self) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel_sync(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

/// Header-mode continuous manager, as used by display outputs other than 0.
pub fn continuous(prealloc: usize) -> ManagerConfig {
    ManagerConfig::for_output(1, prealloc, false)
}

/// Headerless continuous manager of output 0.
pub fn headerless(prealloc: usize) -> ManagerConfig {
    ManagerConfig::for_output(0, prealloc, false)
}

/// Header-mode single-shot manager of a mem-to-mem device.
pub fn singleshot(prealloc: usize) -> ManagerConfig {
    ManagerConfig::for_output(0, prealloc, true)
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

/// Records messages of the current thread while a [`capture_logs`] is running.
struct Capture;

impl Log for Capture {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.with_borrow_mut(|captured| {
            if let Some(lines) = captured {
                lines.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;
static INSTALL: Once = Once::new();

/// Run `f` and return what it logged on this thread.
pub fn capture_logs(f: impl FnOnce()) -> Vec<(Level, String)> {
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURE).expect("no other logger in tests");
        log::set_max_level(LevelFilter::Trace);
    });
    CAPTURED.set(Some(Vec::new()));
    f();
    CAPTURED.take().unwrap_or_default()
}

/// Only the warnings of a [`capture_logs`] run.
pub fn warnings(logs: &[(Level, String)]) -> Vec<&str> {
    logs.iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, msg)| msg.as_str())
        .collect()
}
