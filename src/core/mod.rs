// Radio-facing data model shared by the driver adapters
pub mod constants;
pub mod memory;
pub mod power;

pub use constants::*;
pub use memory::{Memory, MemoryError};
pub use power::{PowerError, PowerLevel};
