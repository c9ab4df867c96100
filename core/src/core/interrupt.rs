//! Prioritised interrupt request latch.
//!
//! Peripherals raise requests identified by a small source number; the CPU
//! samples the highest-priority request at every instruction boundary and
//! acknowledges it once it has vectored.

use crate::core::save_state::{StateError, StateReader, StateWriter};

/// Number of distinct interrupt sources the controller can latch.
pub const MAX_SOURCES: usize = 32;

/// Priority level that cannot be masked by the CPU's IFF field.
pub const NON_MASKABLE: u8 = 7;

/// A latched interrupt request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingInterrupt {
    /// Source identifier (index into the system vector table on the NGP).
    pub source: u8,
    /// Priority level 1-7. Level 0 means the source is disabled.
    pub priority: u8,
    /// Absolute address of the service routine.
    pub vector: u32,
}

impl PendingInterrupt {
    pub fn new(source: u8, priority: u8, vector: u32) -> Self {
        Self {
            source,
            priority: priority & 7,
            vector: vector & 0x00FF_FFFF,
        }
    }

    /// Whether this request may be delivered while the CPU's IFF field is `iff`.
    ///
    /// IFF holds the lowest accepted level, so the request must exceed
    /// `iff - 1`. Level 7 always passes, level 0 never does.
    pub fn is_eligible(&self, iff: u8) -> bool {
        self.priority != 0 && (self.priority >= iff || self.priority == NON_MASKABLE)
    }
}

/// Pick the request the CPU should see from `requests`, given in source
/// order. Level 0 requests are skipped. Ties go to the lower source number,
/// matching the fixed ordering of the hardware vector table.
pub fn select_highest(
    requests: impl IntoIterator<Item = PendingInterrupt>,
) -> Option<PendingInterrupt> {
    requests
        .into_iter()
        .filter(|irq| irq.priority != 0)
        .fold(None, |best: Option<PendingInterrupt>, irq| match best {
            Some(b) if b.priority >= irq.priority => Some(b),
            _ => Some(irq),
        })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptController {
    slots: [Option<PendingInterrupt>; MAX_SOURCES],
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_SOURCES],
        }
    }

    /// Latch a request. A second request from the same source replaces the first.
    /// Requests at priority 0 stay latched but are never selected.
    pub fn raise(&mut self, irq: PendingInterrupt) {
        let Some(slot) = self.slots.get_mut(irq.source as usize) else {
            tracing::warn!(source = irq.source, "interrupt source out of range, ignored");
            return;
        };
        *slot = Some(irq);
    }

    /// Clear a latched request, returning it if one was pending.
    pub fn acknowledge(&mut self, source: u8) -> Option<PendingInterrupt> {
        self.slots.get_mut(source as usize).and_then(Option::take)
    }

    pub fn is_pending(&self, source: u8) -> bool {
        self.slots
            .get(source as usize)
            .is_some_and(|slot| slot.is_some())
    }

    /// Source numbers with a latched request, lowest first.
    pub fn pending_sources(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(source, _)| source as u8)
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_SOURCES];
    }

    pub fn save(&self, w: &mut StateWriter) {
        for slot in &self.slots {
            match slot {
                Some(irq) => {
                    w.put_bool(true);
                    w.put_u8(irq.priority);
                    w.put_u32(irq.vector);
                }
                None => {
                    w.put_bool(false);
                    w.put_u8(0);
                    w.put_u32(0);
                }
            }
        }
    }

    pub fn load(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        for (source, slot) in self.slots.iter_mut().enumerate() {
            let present = r.get_bool()?;
            let priority = r.get_u8()?;
            let vector = r.get_u32()?;
            *slot = present.then(|| PendingInterrupt::new(source as u8, priority, vector));
        }
        Ok(())
    }
}
