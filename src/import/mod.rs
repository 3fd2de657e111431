pub mod address;
pub mod ledger;
pub mod merger;
pub mod orchestrator;
pub mod scheduler;
pub mod worker;

pub use orchestrator::{Orchestrator, RunSummary};
