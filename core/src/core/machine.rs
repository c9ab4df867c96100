use crate::core::save_state::StateError;
use crate::cpu::CpuFault;
use crate::device::PeripheralFault;

/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "Up", "Option").
    pub name: &'static str,
}

/// Outcome of a `run_cycles` call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunReport {
    /// Cycles consumed by this call. Equal to the request unless `stop` is set.
    pub consumed: u64,
    /// Fatal CPU condition that ended the run early. The CPU stays stopped until reset.
    pub stop: Option<CpuFault>,
    /// Non-fatal faults reported by peripherals during the run.
    pub faults: Vec<PeripheralFault>,
}

impl RunReport {
    pub fn is_stopped(&self) -> bool {
        self.stop.is_some()
    }
}

/// Machine-agnostic host driver interface.
///
/// The host owns pacing: it calls `run_cycles` (or `run_frame`) repeatedly and
/// services its own audio/video between calls. The machine never looks at
/// wall-clock time.
pub trait Machine {
    /// CPU cycles in one video frame.
    fn cycles_per_frame(&self) -> u64;

    /// Run until `cycles` CPU cycles have elapsed or a fatal condition stops the CPU.
    fn run_cycles(&mut self, cycles: u64) -> RunReport;

    /// Run one frame of emulation (advance the clock by one frame's worth of cycles).
    fn run_frame(&mut self) -> RunReport {
        let cycles = self.cycles_per_frame();
        self.run_cycles(cycles)
    }

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    /// `pressed` is true for key-down, false for key-up.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Serialize the complete machine state into an opaque blob.
    fn save_state(&self) -> Vec<u8>;

    /// Restore a blob produced by `save_state`. On error the running state is untouched.
    fn load_state(&mut self, blob: &[u8]) -> Result<(), StateError>;
}
