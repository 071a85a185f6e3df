pub mod collector;
pub mod context;
pub mod gate;
pub mod reduce;

pub use collector::{CycleReport, FleetCollector};
pub use context::PoolContext;
