use super::bus::BusMaster;

/// Anything clocked by the CPU (on-chip timers, sound chips)
pub trait Component {
    /// Advance by `cycles` CPU clocks.
    /// Returns true if a "significant event" occurred (e.g., timer match).
    fn advance(&mut self, cycles: u32) -> bool;
}

/// Extension for components that act as bus masters (CPUs, DMA controllers)
pub trait BusMasterComponent {
    type Bus: super::bus::Bus + ?Sized;
    type Step;
    type Fault;

    /// Execute one instruction (or interrupt response) with bus access.
    fn step_with_bus(&mut self, bus: &mut Self::Bus, master: BusMaster) -> Result<Self::Step, Self::Fault>;
}
