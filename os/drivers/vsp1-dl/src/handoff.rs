//! How a list is handed to hardware, and how to tell whether hardware has
//! taken it yet.
//!
//! Hardware switches to a newly written list on its own, at a frame boundary
//! the interrupt only reports afterwards. Until it has latched the new
//! address the hand-off registers must not be rewritten, or a list could
//! be clobbered while hardware reads it.

use crate::config::DlMode;
use crate::list::DisplayList;
use crate::regs::{self, Cmd, DlBodySize};
use kernel_hal::RegisterIo;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandOff {
    /// Header address through `DL_HDR_ADDR(index)`, latch tracked by
    /// `CMD(index).UPDHDR`.
    Header { index: u32 },
    /// Body address and size through `DL_HDR_ADDR(0)` and `DL_BODY_SIZE`,
    /// latch tracked by `DL_BODY_SIZE.UPD`.
    Headerless,
}

impl HandOff {
    pub const fn new(mode: DlMode, index: u32) -> Self {
        match mode {
            DlMode::Header => Self::Header { index },
            DlMode::Headerless => Self::Headerless,
        }
    }

    /// Whether the last hand-off is still waiting for hardware to latch it.
    ///
    /// Without a queued list nothing was handed off, and the flag is not
    /// consulted.
    pub fn update_pending(self, io: &impl RegisterIo, queued: Option<&DisplayList>) -> bool {
        if queued.is_none() {
            return false;
        }
        match self {
            Self::Header { index } => Cmd::from_bits(io.read(regs::cmd(index))).updhdr(),
            Self::Headerless => DlBodySize::from_bits(io.read(regs::DL_BODY_SIZE)).upd(),
        }
    }

    /// Program `dl` as the next list hardware picks up.
    pub fn enqueue(self, io: &impl RegisterIo, dl: &DisplayList) {
        match self {
            Self::Header { index } => {
                let addr = dl.hw_address();
                trace!("wpf{index}: hand off {} header {addr}", dl.id());
                io.write(regs::dl_hdr_addr(index), addr.as_u32());
            }
            Self::Headerless => {
                trace!(
                    "wpf0: hand off {} body {} ({} bytes)",
                    dl.id(),
                    dl.body_address(),
                    dl.body_size()
                );
                io.write(regs::dl_hdr_addr(0), dl.body_address().as_u32());
                let size = DlBodySize::new().with_upd(true).with_bs(dl.body_size());
                io.write(regs::DL_BODY_SIZE, size.into_bits());
            }
        }
    }
}
