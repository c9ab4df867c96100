use crate::core::interrupt::PendingInterrupt;

/// Identifies who is accessing the bus (for multi-CPU/DMA arbitration)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusMaster {
    Cpu(usize), // CPU 0 = TLCS-900/H, CPU 1 = sound CPU
    Dma,        // Micro-DMA transfers started by an interrupt source
}

/// Operand width shared by the register file, the ALU and wide bus accesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Word,
    Long,
}

impl Width {
    pub const fn bytes(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Long => 4,
        }
    }

    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    pub const fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
            Width::Long => 0xFFFF_FFFF,
        }
    }

    pub const fn sign_bit(self) -> u32 {
        1 << (self.bits() - 1)
    }

    /// The next wider operand size (byte → word → long). Long has none.
    pub const fn wider(self) -> Option<Width> {
        match self {
            Width::Byte => Some(Width::Word),
            Width::Word => Some(Width::Long),
            Width::Long => None,
        }
    }

    /// Sign-extend a value of this width to 32 bits.
    pub const fn sign_extend(self, value: u32) -> u32 {
        match self {
            Width::Byte => value as u8 as i8 as i32 as u32,
            Width::Word => value as u16 as i16 as i32 as u32,
            Width::Long => value,
        }
    }
}

/// Generic bus interface. The TLCS-900/H sees a 24-bit byte-addressed space.
pub trait Bus {
    type Address: Copy + Into<u64>; // u32 (24 bits used) for the TLCS-900/H
    type Data; // u8

    fn read(&mut self, master: BusMaster, addr: Self::Address) -> Self::Data;
    fn write(&mut self, master: BusMaster, addr: Self::Address, data: Self::Data);

    /// Generic interrupt query. Returns the highest-priority pending request for `target`.
    fn check_interrupts(&self, target: BusMaster) -> InterruptState;

    /// Called by a CPU once it has vectored into `source`. Clears the latched request.
    fn acknowledge_interrupt(&mut self, _target: BusMaster, _source: u8) {}
}

/// Little-endian multi-byte access layered over byte reads and writes, so that
/// register ↔ memory transfers use the same byte order as the register file.
pub trait BusExt: Bus<Address = u32, Data = u8> {
    fn load(&mut self, master: BusMaster, addr: u32, width: Width) -> u32 {
        let mut value = 0u32;
        for i in 0..width.bytes() {
            let byte = self.read(master, addr.wrapping_add(i) & 0x00FF_FFFF);
            value |= (byte as u32) << (8 * i);
        }
        value
    }

    fn store(&mut self, master: BusMaster, addr: u32, width: Width, value: u32) {
        for i in 0..width.bytes() {
            self.write(master, addr.wrapping_add(i) & 0x00FF_FFFF, (value >> (8 * i)) as u8);
        }
    }
}

impl<B: Bus<Address = u32, Data = u8> + ?Sized> BusExt for B {}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct InterruptState {
    /// Highest-priority pending request, if any. Eligibility against the
    /// CPU's mask level is decided by the CPU.
    pub highest: Option<PendingInterrupt>,
}
