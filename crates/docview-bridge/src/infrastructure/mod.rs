//! Infrastructure layer for docview-bridge.
//!
//! The infrastructure layer handles all I/O and provides the concrete
//! implementations of the application layer's traits.
//!
//! # Responsibilities
//!
//! - The in-process bus (`EventBus` + `BusPublisher`)
//! - The boundary listener registry (`ListenerRegistry`)
//! - The file-system document backend (`DocumentBackend`)
//! - Loading the optional TOML configuration file
//! - Accepting host and viewer WebSocket connections
//!
//! # What does NOT belong here?
//!
//! - Session behaviour or envelope translation (that is the application layer)
//! - Configuration and session types (that is the domain layer)

pub mod bus;
pub mod config_file;
pub mod listeners;
pub mod storage;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use bus::InProcessBus;
pub use config_file::{load_config, ConfigError, FileConfig};
pub use listeners::BoundaryListenerRegistry;
pub use storage::FsDocumentStore;
pub use ws_server::{build_host, run_server, serve};
