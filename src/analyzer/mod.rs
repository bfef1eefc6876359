//! Discovery of the tasks and pull requests a release contains

pub mod relations;

pub use relations::{RelationDiscovery, RelationResult};
