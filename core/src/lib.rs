pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{InputButton, Machine, RunReport};
    pub use crate::core::{Bus, BusExt, BusMaster, BusMasterComponent, Component, Width};
    pub use crate::core::{InterruptController, InterruptState, PendingInterrupt};
    pub use crate::cpu::{Cpu, CpuFault, Tlcs900h};
}
