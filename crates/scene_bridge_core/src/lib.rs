//! Scene Bridge Core
//!
//! Async client for driving a live simulation host remotely. Commands go out
//! over HTTP/JSON or ZeroMQ/protobuf, with bounded retries, an optional
//! window-focus side channel, batching and a liveness check.

pub mod config;
pub mod error;
pub mod focus;
pub mod ops;
pub mod retry;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::BridgeConfig;
pub use error::TransportError;
pub use focus::{FocusError, FocusHook, NoFocus, ScriptFocus};
pub use ops::{dispatch_batch, Batch, HealthMonitor};
pub use retry::RetryPolicy;
pub use transport::{
    dispatch_with_deadline, AnyTransport, HttpTransport, Transport, ZmqTransport,
};
pub use types::{ActionKind, Command, Entity, Hierarchy, HierarchyNode, Reply, ReplyStatus, Vector3};

/// Result type alias using TransportError
pub type Result<T> = std::result::Result<T, TransportError>;
