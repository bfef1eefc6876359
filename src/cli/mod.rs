//! Command line surface: commands, the phases they enable and the workflow
//! that runs them.

pub mod commands;
pub mod orchestration;

pub use commands::{Command, Plan};
pub use orchestration::{Orchestrator, RunReport, Services, WorkflowArgs};
