use super::{Peripheral, PeripheralFault};
use crate::core::save_state::{StateError, StateReader, StateWriter};
use crate::core::{Component, TickKind};

/// TLCS-900/H on-chip 8-bit timers 0-3.
///
/// # Register map (offsets from 0x20)
///
/// | Offset | Register | Description                              |
/// |--------|----------|------------------------------------------|
/// | 0x00   | TRUN     | bit 7 prescaler run, bits 3-0 timer run  |
/// | 0x02   | TREG0    | timer 0 compare value                    |
/// | 0x03   | TREG1    | timer 1 compare value                    |
/// | 0x04   | T01MOD   | timer 0/1 clock select                   |
/// | 0x06   | TREG2    | timer 2 compare value                    |
/// | 0x07   | TREG3    | timer 3 compare value                    |
/// | 0x08   | T23MOD   | timer 2/3 clock select                   |
///
/// Other offsets in the block are plain storage.
///
/// # Clock sources
///
/// | select | timer 0 | timer 1   | timer 2 | timer 3   |
/// |--------|---------|-----------|---------|-----------|
/// | 0      | HBlank  | T0 match  | (none)  | T2 match  |
/// | 1      | T1      | T1        | T1      | T1        |
/// | 2      | T4      | T16       | T4      | T16       |
/// | 3      | T16     | T256      | T16     | T256      |
///
/// T1, T4, T16 and T256 tick every 8, 32, 128 and 2048 CPU cycles. A counter
/// that reaches its compare value (0 means 256) clears and flags a match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timers {
    regs: [u8; BLOCK_SIZE],
    counter: [u16; 4],
    /// Cycles accumulated toward the next prescaler clock, per timer.
    accum: [u32; 4],
    /// Bit n set when timer n matched since the last `take_matches`.
    matched: u8,
}

const BLOCK_SIZE: usize = 0x10;

const TRUN: usize = 0x00;
const TREG: [usize; 4] = [0x02, 0x03, 0x06, 0x07];
const T01MOD: usize = 0x04;
const T23MOD: usize = 0x08;

const PRESCALER_RUN: u8 = 0x80;
/// Longest prescaler period (T256), in CPU cycles.
const MAX_PERIOD: u32 = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Clock {
    HBlank,
    Cascade,
    Prescaler(u32),
    None,
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

impl Timers {
    pub fn new() -> Self {
        Self {
            regs: [0; BLOCK_SIZE],
            counter: [0; 4],
            accum: [0; 4],
            matched: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn running(&self, timer: usize) -> bool {
        self.regs[TRUN] & (1 << timer) != 0
    }

    fn clock(&self, timer: usize) -> Clock {
        let (mode, shift) = if timer < 2 { (self.regs[T01MOD], timer * 2) } else { (self.regs[T23MOD], (timer - 2) * 2) };
        let select = (mode >> shift) & 3;
        match (timer & 1, select) {
            (0, 0) if timer == 0 => Clock::HBlank,
            (0, 0) => Clock::None,
            (1, 0) => Clock::Cascade,
            (_, 1) => Clock::Prescaler(8),
            (0, 2) => Clock::Prescaler(32),
            (0, _) => Clock::Prescaler(128),
            (_, 2) => Clock::Prescaler(128),
            (_, _) => Clock::Prescaler(MAX_PERIOD),
        }
    }

    /// Count one input clock on `timer`, cascading into the odd timer of the pair.
    fn count(&mut self, timer: usize) {
        if !self.running(timer) {
            return;
        }
        let target = match self.regs[TREG[timer]] {
            0 => 256,
            n => n as u16,
        };
        self.counter[timer] += 1;
        if self.counter[timer] >= target {
            self.counter[timer] = 0;
            self.matched |= 1 << timer;
            if timer & 1 == 0 && self.clock(timer + 1) == Clock::Cascade {
                self.count(timer + 1);
            }
        }
    }

    /// Horizontal blank input (timer 0 external clock).
    pub fn hblank(&mut self) {
        if self.clock(0) == Clock::HBlank {
            self.count(0);
        }
    }

    /// Timers that matched since the last call, as a bit set. Clears the set.
    pub fn take_matches(&mut self) -> u8 {
        std::mem::take(&mut self.matched)
    }

    /// Current up-counter value of `timer`.
    pub fn counter(&self, timer: usize) -> u8 {
        self.counter[timer & 3] as u8
    }

    fn check_clocks(&self) -> Result<(), PeripheralFault> {
        if self.running(2) && self.clock(2) == Clock::None {
            return Err(PeripheralFault::UnsupportedClock {
                timer: 2,
                source_select: 0,
            });
        }
        Ok(())
    }

    pub fn save(&self, w: &mut StateWriter) {
        w.put_slice(&self.regs);
        for n in 0..4 {
            w.put_u16(self.counter[n]);
            w.put_u32(self.accum[n]);
        }
        w.put_u8(self.matched);
    }

    pub fn load(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        r.copy_to(&mut self.regs)?;
        for n in 0..4 {
            let counter = r.get_u16()?;
            if counter > 0xFF {
                return Err(StateError::InvalidField {
                    field: "timer counter",
                    value: counter as u32,
                });
            }
            let accum = r.get_u32()?;
            if accum >= MAX_PERIOD {
                return Err(StateError::InvalidField {
                    field: "timer prescaler",
                    value: accum,
                });
            }
            self.counter[n] = counter;
            self.accum[n] = accum;
        }
        self.matched = r.get_u8()? & 0x0F;
        Ok(())
    }
}

impl Component for Timers {
    /// Run the prescaler-clocked timers for `cycles` CPU cycles. Returns true
    /// if any timer matched.
    fn advance(&mut self, cycles: u32) -> bool {
        let before = self.matched;
        if self.regs[TRUN] & PRESCALER_RUN != 0 {
            for timer in 0..4 {
                let Clock::Prescaler(period) = self.clock(timer) else {
                    continue;
                };
                if !self.running(timer) {
                    continue;
                }
                self.accum[timer] += cycles;
                while self.accum[timer] >= period {
                    self.accum[timer] -= period;
                    self.count(timer);
                }
            }
        }
        self.matched != before
    }
}

impl Peripheral for Timers {
    fn read(&mut self, offset: u32) -> u8 {
        self.regs.get(offset as usize).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, offset: u32, value: u8) -> Result<(), PeripheralFault> {
        let offset = offset as usize;
        if offset >= BLOCK_SIZE {
            return Ok(());
        }
        if offset == TRUN {
            // Stopping a timer clears its counter.
            for timer in 0..4 {
                if value & (1 << timer) == 0 {
                    self.counter[timer] = 0;
                    self.accum[timer] = 0;
                }
            }
        }
        self.regs[offset] = value;
        if offset == TRUN || offset == T23MOD {
            self.check_clocks()?;
        }
        Ok(())
    }

    fn tick(&mut self, kind: TickKind) {
        if kind == TickKind::Scanline {
            self.hblank();
        }
    }
}
