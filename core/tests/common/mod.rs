#![allow(dead_code)]

use pocket_core::core::{Bus, BusMaster, InterruptState, PendingInterrupt};

const SPACE: usize = 0x100_0000;

/// Minimal bus for testing: flat 16MB read/write memory, one injectable
/// interrupt request, no peripherals.
pub struct TestBus {
    pub memory: Vec<u8>,
    pub pending: Option<PendingInterrupt>,
    /// Sources the CPU acknowledged, in order.
    pub acknowledged: Vec<u8>,
    /// Request that becomes pending when the CPU reads the given address.
    pub raise_on_read: Option<(u32, PendingInterrupt)>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: vec![0; SPACE],
            pending: None,
            acknowledged: Vec::new(),
            raise_on_read: None,
        }
    }

    pub fn load(&mut self, addr: u32, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn read_long(&self, addr: u32) -> u32 {
        let a = addr as usize;
        u32::from_le_bytes([self.memory[a], self.memory[a + 1], self.memory[a + 2], self.memory[a + 3]])
    }

    pub fn read_word(&self, addr: u32) -> u16 {
        let a = addr as usize;
        u16::from_le_bytes([self.memory[a], self.memory[a + 1]])
    }

    pub fn raise(&mut self, source: u8, priority: u8, vector: u32) {
        self.pending = Some(PendingInterrupt::new(source, priority, vector));
    }
}

impl Bus for TestBus {
    type Address = u32;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u32) -> u8 {
        if let Some((at, irq)) = self.raise_on_read {
            if at == addr {
                self.pending = Some(irq);
                self.raise_on_read = None;
            }
        }
        self.memory[addr as usize & (SPACE - 1)]
    }

    fn write(&mut self, _master: BusMaster, addr: u32, data: u8) {
        self.memory[addr as usize & (SPACE - 1)] = data;
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            highest: self.pending,
        }
    }

    fn acknowledge_interrupt(&mut self, _target: BusMaster, source: u8) {
        if self.pending.is_some_and(|irq| irq.source == source) {
            self.pending = None;
        }
        self.acknowledged.push(source);
    }
}
