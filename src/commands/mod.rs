//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components to perform user tasks.

pub mod simulate;

// Re-export main command functions
pub use simulate::{execute_simulate, validate_args, OutputFormat, SimulateArgs};
