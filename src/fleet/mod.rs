pub mod client;
pub mod types;

pub use client::{retain_operator_pools, FleetClient, HttpFleetClient};
pub use types::{Agent, Envelope, Job, Pool};
