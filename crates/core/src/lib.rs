// Livequeue Core - Live admin queue synchronization
// NO infrastructure dependencies (ADR-001: Hexagonal Architecture)

pub mod application;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
