// Application Layer - Synchronizer use cases

pub mod constants;
pub mod controller;
pub mod hub;
pub mod loader;
pub mod reducer;
pub mod stagger;

// Re-exports
pub use controller::{validate_config, QueueController};
pub use hub::QueueHub;
pub use loader::SnapshotLoader;
pub use reducer::{dedup, reduce, reduce_all};
pub use stagger::{Activate, ActivationScheduler, StaggerLadder};
