// Livequeue Infrastructure - JSON-RPC Adapter
// Implements: DataSource (ADR-002)

pub mod config;
pub mod dispatch;
pub mod error;
pub mod rpc_source;
pub mod wire;

pub use config::RpcConfig;
pub use dispatch::EventDispatcher;
pub use error::{RpcSourceError, Result};
pub use rpc_source::RpcDataSource;
