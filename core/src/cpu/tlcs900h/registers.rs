//! Banked register file.
//!
//! Each 32-bit register is a four-byte little-endian buffer; byte, word and
//! long views are sub-ranges of that buffer, so writing `A` changes the low
//! byte of `XWA` and nothing else.

use crate::core::Width;

/// Flag bits in the low byte of SR (the F register).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    C = 0x01, // Carry
    N = 0x02, // Add/Subtract
    V = 0x04, // Overflow / Parity
    H = 0x10, // Half carry
    Z = 0x40, // Zero
    S = 0x80, // Sign
}

/// Status register.
///
/// ```text
///  15   14-12  11   10-8   7 6 5 4 3 2 1 0
/// SYSM   IFF   MAX  RFP    S Z - H - V N C
/// ```
/// The layout is part of the save-state format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusRegister(u16);

impl StatusRegister {
    const SYSM: u16 = 0x8000;
    const MAX: u16 = 0x0800;

    /// Value after reset: system mode, interrupts masked (IFF = 7), bank 0, flags clear.
    pub const RESET: StatusRegister = StatusRegister(0xF800);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn flags(self) -> u8 {
        self.0 as u8
    }

    pub fn set_flags(&mut self, f: u8) {
        self.0 = (self.0 & 0xFF00) | f as u16;
    }

    pub fn flag(self, flag: Flag) -> bool {
        self.flags() & flag as u8 != 0
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        if on {
            self.0 |= flag as u16;
        } else {
            self.0 &= !(flag as u16);
        }
    }

    /// Interrupt mask level (IFF2-0).
    pub fn iff(self) -> u8 {
        ((self.0 >> 12) & 7) as u8
    }

    pub fn set_iff(&mut self, level: u8) {
        self.0 = (self.0 & !0x7000) | (((level & 7) as u16) << 12);
    }

    /// Register file pointer (active bank). The 900/H implements four banks.
    pub fn rfp(self) -> u8 {
        ((self.0 >> 8) & 3) as u8
    }

    pub fn set_rfp(&mut self, bank: u8) {
        self.0 = (self.0 & !0x0700) | (((bank & 3) as u16) << 8);
    }

    pub fn system_mode(self) -> bool {
        self.0 & Self::SYSM != 0
    }

    pub fn max_mode(self) -> bool {
        self.0 & Self::MAX != 0
    }
}

impl Default for StatusRegister {
    fn default() -> Self {
        Self::RESET
    }
}

/// Which 32-bit register a reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegSlot {
    /// Slot 0-3 (XWA, XBC, XDE, XHL) of the active bank.
    Current(u8),
    /// Slot 0-3 of the bank below the active one (RFP - 1).
    Previous(u8),
    /// Slot 0-3 of an explicit bank, independent of RFP.
    Bank(u8, u8),
    /// XIX, XIY, XIZ, XSP (0-3). Not banked.
    Dedicated(u8),
}

/// A register operand: a 32-bit slot plus the byte offset the view starts at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegRef {
    pub slot: RegSlot,
    pub offset: u8,
}

pub const XWA: u8 = 0;
pub const XBC: u8 = 1;
pub const XDE: u8 = 2;
pub const XHL: u8 = 3;
pub const XIX: u8 = 4;
pub const XIY: u8 = 5;
pub const XIZ: u8 = 6;
pub const XSP: u8 = 7;

impl RegRef {
    pub const fn new(slot: RegSlot, offset: u8) -> Self {
        Self { slot, offset }
    }

    /// Three-bit byte register code from an opcode: W, A, B, C, D, E, H, L.
    /// Always the active bank; W/B/D/H are the high byte of the low word.
    pub const fn byte3(r: u8) -> Self {
        Self::new(RegSlot::Current((r >> 1) & 3), if r & 1 == 0 { 1 } else { 0 })
    }

    /// Three-bit word or long register code: WA/XWA .. SP/XSP.
    pub const fn short(r: u8) -> Self {
        let r = r & 7;
        if r < 4 {
            Self::new(RegSlot::Current(r), 0)
        } else {
            Self::new(RegSlot::Dedicated(r - 4), 0)
        }
    }

    /// Three-bit code interpreted at `width`.
    pub const fn short_for(width: Width, r: u8) -> Self {
        match width {
            Width::Byte => Self::byte3(r),
            Width::Word | Width::Long => Self::short(r),
        }
    }

    /// Full eight-bit register code ("r" byte of the extended register forms).
    ///
    /// `0x00-0x3F` bank-absolute, `0xD0-0xDF` previous bank, `0xE0-0xEF`
    /// current bank, `0xF0-0xFF` dedicated registers. Codes outside those
    /// ranges, or misaligned for `width`, are not registers.
    pub const fn from_code(code: u8, width: Width) -> Option<Self> {
        let aligned = match width {
            Width::Byte => true,
            Width::Word => code & 1 == 0,
            Width::Long => code & 3 == 0,
        };
        if !aligned {
            return None;
        }
        let slot_index = (code >> 2) & 3;
        let offset = code & 3;
        let slot = match code {
            0x00..=0x3F => RegSlot::Bank(code >> 4, slot_index),
            0xD0..=0xDF => RegSlot::Previous(slot_index),
            0xE0..=0xEF => RegSlot::Current(slot_index),
            0xF0..=0xFF => RegSlot::Dedicated(slot_index),
            _ => return None,
        };
        Some(Self::new(slot, offset))
    }

    /// The register one size up that has this register as its low part.
    /// `A` widens to `WA`, `WA` to `XWA`; `W` and `QWA` have no such parent.
    pub fn widen(self, width: Width) -> Option<Self> {
        match width {
            Width::Byte | Width::Word if self.offset == 0 => Some(self),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    banks: [[[u8; 4]; 4]; 4],
    dedicated: [[u8; 4]; 4],
    pub pc: u32,
    pub sr: StatusRegister,
    /// F' (alternate flag register, swapped with `EX F,F'`).
    pub f_alt: u8,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            banks: [[[0; 4]; 4]; 4],
            dedicated: [[0; 4]; 4],
            pc: 0,
            sr: StatusRegister::RESET,
            f_alt: 0,
        }
    }

    fn slot(&self, slot: RegSlot) -> &[u8; 4] {
        match slot {
            RegSlot::Current(s) => &self.banks[self.sr.rfp() as usize][s as usize & 3],
            RegSlot::Previous(s) => {
                &self.banks[self.sr.rfp().wrapping_sub(1) as usize & 3][s as usize & 3]
            }
            RegSlot::Bank(b, s) => &self.banks[b as usize & 3][s as usize & 3],
            RegSlot::Dedicated(s) => &self.dedicated[s as usize & 3],
        }
    }

    fn slot_mut(&mut self, slot: RegSlot) -> &mut [u8; 4] {
        let rfp = self.sr.rfp() as usize;
        match slot {
            RegSlot::Current(s) => &mut self.banks[rfp][s as usize & 3],
            RegSlot::Previous(s) => &mut self.banks[rfp.wrapping_sub(1) & 3][s as usize & 3],
            RegSlot::Bank(b, s) => &mut self.banks[b as usize & 3][s as usize & 3],
            RegSlot::Dedicated(s) => &mut self.dedicated[s as usize & 3],
        }
    }

    /// Start byte for a view of `width` at `offset` inside a slot.
    fn view_start(offset: u8, width: Width) -> usize {
        match width {
            Width::Byte => (offset & 3) as usize,
            Width::Word => (offset & 2) as usize,
            Width::Long => 0,
        }
    }

    pub fn read(&self, reg: RegRef, width: Width) -> u32 {
        let bytes = self.slot(reg.slot);
        let start = Self::view_start(reg.offset, width);
        bytes[start..start + width.bytes() as usize]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    }

    pub fn write(&mut self, reg: RegRef, width: Width, value: u32) {
        let start = Self::view_start(reg.offset, width);
        let bytes = self.slot_mut(reg.slot);
        for (i, byte) in bytes[start..start + width.bytes() as usize]
            .iter_mut()
            .enumerate()
        {
            *byte = (value >> (8 * i)) as u8;
        }
    }

    pub fn select_bank(&mut self, bank: u8) {
        self.sr.set_rfp(bank);
    }

    pub fn current_bank(&self) -> u8 {
        self.sr.rfp()
    }

    /// Select `bank` and return the previously active bank.
    pub fn swap_bank(&mut self, bank: u8) -> u8 {
        let old = self.sr.rfp();
        self.sr.set_rfp(bank);
        old
    }

    // Convenience accessors for the registers instructions name implicitly.

    pub fn xsp(&self) -> u32 {
        self.read(RegRef::short(XSP), Width::Long)
    }

    pub fn set_xsp(&mut self, value: u32) {
        self.write(RegRef::short(XSP), Width::Long, value);
    }

    pub fn a(&self) -> u8 {
        self.read(RegRef::byte3(1), Width::Byte) as u8
    }

    pub fn set_a(&mut self, value: u8) {
        self.write(RegRef::byte3(1), Width::Byte, value as u32);
    }

    pub fn long(&self, r: u8) -> u32 {
        self.read(RegRef::short(r), Width::Long)
    }

    pub fn set_long(&mut self, r: u8, value: u32) {
        self.write(RegRef::short(r), Width::Long, value);
    }

    pub fn word(&self, r: u8) -> u16 {
        self.read(RegRef::short(r), Width::Word) as u16
    }

    pub fn set_word(&mut self, r: u8, value: u16) {
        self.write(RegRef::short(r), Width::Word, value as u32);
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.sr.flag(flag)
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        self.sr.set_flag(flag, on);
    }

    /// Raw long value of slot `slot` in `bank`, for snapshots.
    pub fn bank_long(&self, bank: u8, slot: u8) -> u32 {
        self.read(RegRef::new(RegSlot::Bank(bank, slot), 0), Width::Long)
    }

    pub(crate) fn raw_banks(&self) -> &[[[u8; 4]; 4]; 4] {
        &self.banks
    }

    pub(crate) fn raw_banks_mut(&mut self) -> &mut [[[u8; 4]; 4]; 4] {
        &mut self.banks
    }

    pub(crate) fn raw_dedicated(&self) -> &[[u8; 4]; 4] {
        &self.dedicated
    }

    pub(crate) fn raw_dedicated_mut(&mut self) -> &mut [[u8; 4]; 4] {
        &mut self.dedicated
    }
}
