//! Domain layer for docview-bridge.
//!
//! The domain layer contains pure types with no dependencies on I/O,
//! networking, or the async runtime.
//!
//! # What belongs in the domain layer?
//!
//! - Configuration structures
//! - Session identity, lifecycle state, and session errors
//! - Boundary messages and their trust/shape validation
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, channel, or `WebSocket` types
//! - File I/O or environment variable reading

pub mod boundary;
pub mod config;
pub mod session;

pub use boundary::{BoundaryMessage, UntrustedMessage};
pub use config::{BridgeConfig, PendingPolicy};
pub use session::{
    ContextHandle, LifecycleState, SessionError, SessionId, SessionSnapshot, SubscriptionId,
};
