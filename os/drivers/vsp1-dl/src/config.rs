/// Entries in a display list's primary body.
pub const DL_NUM_ENTRIES: usize = 256;

/// Bodies a header can describe: the primary body plus up to seven fragments.
pub const DL_MAX_BODIES: usize = 8;

/// Bytes per `(register, value)` entry.
pub const DL_ENTRY_SIZE: usize = 8;

/// How lists are handed to hardware. Fixed per manager at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlMode {
    /// Lists carry a hardware-read header describing one or more bodies and
    /// may be chained.
    Header,
    /// A single body's address and size are written straight into the
    /// `DL_HDR_ADDR(0)`/`DL_BODY_SIZE` registers. Only WPF0 supports this.
    Headerless,
}

/// Construction parameters of a [`Manager`](crate::Manager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Index of the hardware output (WPF) the manager drives.
    pub index: u32,
    pub mode: DlMode,
    /// One list per explicit start, no double buffering (mem-to-mem).
    pub singleshot: bool,
    /// Lists allocated into the free pool up front.
    pub prealloc: usize,
    /// Capacity of each list's primary body.
    pub num_entries: usize,
}

impl ManagerConfig {
    /// Derive the configuration for output `index`.
    ///
    /// Mem-to-mem (`uapi`) devices run every output single-shot in header
    /// mode. Display pipelines run continuously; their first output is driven
    /// headerless, the others through headers.
    #[must_use]
    pub const fn for_output(index: u32, prealloc: usize, uapi: bool) -> Self {
        let mode = if index == 0 && !uapi {
            DlMode::Headerless
        } else {
            DlMode::Header
        };
        Self {
            index,
            mode,
            singleshot: uapi,
            prealloc,
            num_entries: DL_NUM_ENTRIES,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: DlMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_singleshot(mut self, singleshot: bool) -> Self {
        self.singleshot = singleshot;
        self
    }

    #[must_use]
    pub const fn with_num_entries(mut self, num_entries: usize) -> Self {
        self.num_entries = num_entries;
        self
    }
}
