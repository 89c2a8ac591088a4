pub mod policy;
pub mod catalog;
pub mod filter;
pub mod selector;
pub mod swww;
pub mod command_builder;
pub mod executor;
pub mod duration;
pub mod ipc;
pub mod state;
pub mod watcher;
pub mod error;

#[cfg(test)]
mod assignment_scenarios;

pub use policy::{MultiMonitorMode, Policy, MAX_ASPECT_MISMATCH_PERMILLE};
pub use catalog::{Catalog, Dimensions};
pub use filter::{aspect_mismatch_permille, filter, is_eligible};
pub use selector::{assign, assign_with_rng, Assignment, Slot, SlotDecision, SlotOutcome};
pub use swww::{locate_swww, DisplayOutput};
pub use command_builder::{CommandBuilder, DisplayMode};
pub use executor::ProcessExecutor;
pub use duration::{format_duration, parse_duration};
pub use ipc::{IpcClient, IpcServer, IpcCommand, IpcResponse, OutputStatus};
pub use state::{AssignmentState, OutputState};
pub use watcher::DirectoryWatcher;
pub use error::{WallfitError, Result, ErrorReporting};
