//! Cycle accounting and periodic hardware events.
//!
//! The execution loop feeds every instruction's cycle cost into a
//! [`Scheduler`]; whenever the running clock crosses one of the registered
//! periods (scanline, frame, sound sample) the matching [`TickKind`] is handed
//! back to the caller, which forwards it to the peripheral emulators.

use crate::core::save_state::{StateError, StateReader, StateWriter};

/// Latest clock value a restored state may carry.
const MAX_CLOCK: u64 = u64::MAX / 2;

/// Periodic boundaries the scheduler can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickKind {
    Scanline,
    Frame,
    SoundSample,
}

/// Cycles elapsed since the last frame boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleBudget {
    elapsed: u64,
}

impl CycleBudget {
    pub fn add(&mut self, cycles: u64) {
        self.elapsed += cycles;
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PeriodicEvent {
    kind: TickKind,
    period: u64,
    next_due: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scheduler {
    now: u64,
    budget: CycleBudget,
    events: Vec<PeriodicEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a periodic event. The first occurrence is one full period from now.
    pub fn add_periodic(&mut self, kind: TickKind, period: u64) {
        assert!(period > 0, "periodic event {kind:?} needs a non-zero period");
        self.events.push(PeriodicEvent {
            kind,
            period,
            next_due: self.now + period,
        });
    }

    /// Total cycles since power-on or the last reset.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn budget(&self) -> &CycleBudget {
        &self.budget
    }

    /// Cycles left before the earliest pending event fires.
    pub fn cycles_until_next(&self) -> Option<u64> {
        self.events.iter().map(|e| e.next_due - self.now).min()
    }

    /// Advance the clock by `cycles`, invoking `on_tick` for every boundary crossed,
    /// in chronological order. A frame boundary resets the cycle budget.
    pub fn advance(&mut self, cycles: u64, mut on_tick: impl FnMut(TickKind)) {
        let target = self.now + cycles;
        loop {
            let due = self
                .events
                .iter_mut()
                .filter(|e| e.next_due <= target)
                .min_by_key(|e| e.next_due);
            let Some(event) = due else { break };

            let step = event.next_due - self.now;
            let kind = event.kind;
            event.next_due += event.period;
            self.now += step;
            self.budget.add(step);
            if kind == TickKind::Frame {
                self.budget.reset();
            }
            on_tick(kind);
        }
        self.budget.add(target - self.now);
        self.now = target;
    }

    /// Rewind the clock and re-arm all events one period ahead.
    pub fn reset(&mut self) {
        self.now = 0;
        self.budget.reset();
        for event in &mut self.events {
            event.next_due = event.period;
        }
    }

    pub fn save(&self, w: &mut StateWriter) {
        w.put_u64(self.now);
        w.put_u64(self.budget.elapsed);
        for event in &self.events {
            w.put_u64(event.next_due);
        }
    }

    /// Restore clock positions. The set of registered events must match the saver's.
    pub fn load(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        let now = r.get_u64()?;
        if now > MAX_CLOCK {
            return Err(StateError::InvalidField {
                field: "scheduler clock",
                value: u32::try_from(now).unwrap_or(u32::MAX),
            });
        }
        let elapsed = r.get_u64()?;
        if elapsed > now {
            return Err(StateError::InvalidField {
                field: "frame budget",
                value: elapsed as u32,
            });
        }
        let mut due = Vec::with_capacity(self.events.len());
        for event in &self.events {
            let next = r.get_u64()?;
            if next.checked_sub(now).is_none_or(|ahead| ahead > event.period) {
                return Err(StateError::InvalidField {
                    field: "scheduler event",
                    value: next as u32,
                });
            }
            due.push(next);
        }

        self.now = now;
        self.budget.elapsed = elapsed;
        for (event, next) in self.events.iter_mut().zip(due) {
            event.next_due = next;
        }
        Ok(())
    }
}
