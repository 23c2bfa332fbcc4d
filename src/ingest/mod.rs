//! Inbound message ingestion.

mod handler;
mod poller;

pub use handler::{UpdateHandler, UpdateOutcome};
pub use poller::{UpdatePoller, UpdateSource};
