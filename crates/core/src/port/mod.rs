// Port Layer - Interfaces for external collaborators

pub mod data_source;
pub mod observer;
pub mod time_provider;

// Re-exports
pub use data_source::{AuthContext, DataSource, EventHandler, MutationRequest, Subscription};
pub use observer::StateObserver;
pub use time_provider::{SystemTimeProvider, TimeProvider};
