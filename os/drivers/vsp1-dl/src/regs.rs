//! # VSP1 display-list registers
//!
//! Offsets are bytes from the VSP1 register base. Only the registers the
//! display-list unit touches are modelled.

use bitfield_struct::bitfield;

/// `VI6_CMD(n)`: per-WPF command register.
#[inline]
#[must_use]
pub const fn cmd(index: u32) -> u32 {
    index * 4
}

/// `VI6_DL_CTRL`: global display-list control.
pub const DL_CTRL: u32 = 0x0100;

/// `VI6_DL_HDR_ADDR(n)`: header (or headerless body) address for WPF `n`.
#[inline]
#[must_use]
pub const fn dl_hdr_addr(index: u32) -> u32 {
    0x0104 + index * 4
}

/// `VI6_DL_SWAP`: byte/word swapping applied when fetching lists.
pub const DL_SWAP: u32 = 0x0114;

/// `VI6_DL_BODY_SIZE`: headerless body size and update flag.
pub const DL_BODY_SIZE: u32 = 0x0120;

/// `VI6_CMD(n)`.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Cmd {
    /// Bit 0, STRCMD: start the WPF.
    pub strcmd: bool,
    #[bits(3)]
    __: u8,
    /// Bit 4, UPDHDR: a header address written to `DL_HDR_ADDR` has not been
    /// taken by hardware yet. Cleared when the new header is latched.
    pub updhdr: bool,
    #[bits(27)]
    __: u32,
}

/// `VI6_DL_CTRL`.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct DlCtrl {
    /// Bit 0, DLE: display list enable.
    pub dle: bool,
    /// Bit 1, NH0: no header for WPF0 (headerless body registers).
    pub nh0: bool,
    /// Bit 2, CFM0: continuous frame mode for WPF0.
    pub cfm0: bool,
    #[bits(1)]
    __: u8,
    /// Bit 4, DC0: display list auto-start for WPF0.
    pub dc0: bool,
    #[bits(3)]
    __: u8,
    /// Bit 8: DC1.
    pub dc1: bool,
    #[bits(3)]
    __: u8,
    /// Bit 12: DC2.
    pub dc2: bool,
    #[bits(3)]
    __: u8,
    /// Bits 16..=31, AR_WAIT: wait cycles between register writes.
    #[bits(16)]
    pub ar_wait: u16,
}

/// `VI6_DL_SWAP`.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct DlSwap {
    /// Bit 0, BTS: byte swap.
    pub bts: bool,
    /// Bit 1, WDS: 16-bit word swap.
    pub wds: bool,
    /// Bit 2, LWS: 32-bit longword swap.
    pub lws: bool,
    #[bits(29)]
    __: u32,
}

/// `VI6_DL_BODY_SIZE`.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct DlBodySize {
    /// Bits 0..=16, BS: body size in bytes.
    #[bits(17)]
    pub bs: u32,
    #[bits(7)]
    __: u8,
    /// Bit 24, UPD: set by software with a new body, cleared by hardware
    /// once the body is latched.
    pub upd: bool,
    #[bits(7)]
    __: u8,
}
