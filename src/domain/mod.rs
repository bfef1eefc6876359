//! Domain logic - pure naming and matching rules independent of external systems

pub mod branch;
pub mod task;

pub use branch::{remote_ref, BranchTemplate};
pub use task::{pull_request_reference, TaskKey, TaskPattern};
