pub mod analyzer;
pub mod branching;
pub mod cli;
pub mod codehost;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod git;
pub mod hooks;
pub mod tracker;
pub mod ui;
pub mod version;

pub use error::{ReleaseError, Result};
