//! # Collectors
//!
//! - **`Collector` trait**: what the exposition layer scrapes
//! - **`Orchestrator`**: concurrent fan-out over the accounts of one source
//! - **`Exporter`**: pairs an orchestrator with the fixed set of descriptors
//!   for its source

pub mod collector;
pub mod exporter;
pub mod orchestrator;

pub use collector::Collector;
pub use exporter::Exporter;
pub use orchestrator::{
    CollectError,
    Orchestrator,
};
