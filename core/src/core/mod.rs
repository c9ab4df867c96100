pub mod bus;
pub mod component;
pub mod interrupt;
pub mod machine;
pub mod memory_map;
pub mod save_state;
pub mod timing;

pub use bus::{Bus, BusExt, BusMaster, InterruptState, Width};
pub use component::{BusMasterComponent, Component};
pub use interrupt::{InterruptController, PendingInterrupt, select_highest};
pub use machine::{InputButton, Machine, RunReport};
pub use memory_map::{Backing, Mapped, MemoryMap};
pub use save_state::{StateError, StateReader, StateWriter};
pub use timing::{CycleBudget, Scheduler, TickKind};
