use super::{Peripheral, PeripheralFault};
use crate::core::save_state::{StateError, StateReader, StateWriter};

pub const SHARED_RAM_SIZE: usize = 0x1000;

/// Memory shared with the sound CPU plus the one-byte communication latch.
///
/// The sound CPU itself is not emulated, so both sides are plain storage: the
/// main CPU sees whatever it last wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedRam {
    data: Box<[u8; SHARED_RAM_SIZE]>,
    comm: u8,
}

impl Default for SharedRam {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRam {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; SHARED_RAM_SIZE]),
            comm: 0,
        }
    }

    pub fn reset(&mut self) {
        self.data.fill(0);
        self.comm = 0;
    }

    pub fn comm(&self) -> u8 {
        self.comm
    }

    pub fn set_comm(&mut self, value: u8) {
        self.comm = value;
    }

    pub fn save(&self, w: &mut StateWriter) {
        w.put_slice(&self.data[..]);
        w.put_u8(self.comm);
    }

    pub fn load(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        r.copy_to(&mut self.data[..])?;
        self.comm = r.get_u8()?;
        Ok(())
    }
}

impl Peripheral for SharedRam {
    fn read(&mut self, offset: u32) -> u8 {
        self.data[offset as usize % SHARED_RAM_SIZE]
    }

    fn write(&mut self, offset: u32, value: u8) -> Result<(), PeripheralFault> {
        self.data[offset as usize % SHARED_RAM_SIZE] = value;
        Ok(())
    }
}
