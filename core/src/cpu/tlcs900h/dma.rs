//! Micro-DMA.
//!
//! An interrupt whose vector number has been written to a channel's start
//! vector register performs one transfer using that channel's DMAS/DMAD/DMAC/
//! DMAM registers instead of vectoring. The board decides when a transfer is
//! due; the CPU only owns the registers and does the copy.

use super::Tlcs900h;
use crate::core::{Bus, BusExt, BusMaster, Width};
use crate::device::PeripheralFault;

/// Cycles charged for one transfer.
const TRANSFER_CYCLES: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DmaTransfer {
    pub channel: usize,
    pub cycles: u32,
    /// The count register reached zero with this transfer.
    pub finished: bool,
}

impl Tlcs900h {
    /// Perform one micro-DMA transfer on `channel`.
    ///
    /// DMAM bits 4-2 select the pointer update, bits 1-0 the size:
    ///
    /// | mode | transfer                    |
    /// |------|-----------------------------|
    /// | 0    | (DMAD+) <- (DMAS)           |
    /// | 1    | (DMAD-) <- (DMAS)           |
    /// | 2    | (DMAD) <- (DMAS+)           |
    /// | 3    | (DMAD) <- (DMAS-)           |
    /// | 4    | (DMAD) <- (DMAS)            |
    /// | 5    | DMAS += 1 (counter mode)    |
    pub fn micro_dma<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        channel: usize,
    ) -> Result<DmaTransfer, PeripheralFault> {
        let channel = channel & 3;
        let mode = self.control.dma_mode(channel);
        let width = match mode & 3 {
            0 => Width::Byte,
            1 => Width::Word,
            2 => Width::Long,
            _ => {
                return Err(PeripheralFault::UnsupportedDmaMode {
                    channel: channel as u8,
                    mode,
                });
            }
        };
        let step = width.bytes();
        let src = self.control.dma_source(channel);
        let dst = self.control.dma_dest(channel);

        match (mode >> 2) & 7 {
            0 => {
                copy(bus, src, dst, width);
                self.control.set_dma_dest(channel, dst.wrapping_add(step));
            }
            1 => {
                copy(bus, src, dst, width);
                self.control.set_dma_dest(channel, dst.wrapping_sub(step));
            }
            2 => {
                copy(bus, src, dst, width);
                self.control.set_dma_source(channel, src.wrapping_add(step));
            }
            3 => {
                copy(bus, src, dst, width);
                self.control.set_dma_source(channel, src.wrapping_sub(step));
            }
            4 => copy(bus, src, dst, width),
            5 => self.control.set_dma_source(channel, src.wrapping_add(1)),
            _ => {
                return Err(PeripheralFault::UnsupportedDmaMode {
                    channel: channel as u8,
                    mode,
                });
            }
        }

        let count = self.control.dma_count(channel).wrapping_sub(1);
        self.control.set_dma_count(channel, count);
        Ok(DmaTransfer {
            channel,
            cycles: TRANSFER_CYCLES,
            finished: count == 0,
        })
    }
}

fn copy<B: Bus<Address = u32, Data = u8> + ?Sized>(bus: &mut B, src: u32, dst: u32, width: Width) {
    let value = bus.load(BusMaster::Dma, src, width);
    bus.store(BusMaster::Dma, dst, width, value);
}
