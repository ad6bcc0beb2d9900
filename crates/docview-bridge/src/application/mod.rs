//! Application layer for docview-bridge.
//!
//! The application layer orchestrates sessions: it knows *what* a session
//! does with each event, but delegates *how* events arrive and where
//! documents live to the infrastructure layer through traits.
//!
//! # Responsibilities
//!
//! - Session lifecycle: bus subscriptions and boundary listeners
//! - The per-session actor that reacts to bus, viewer, and backend events
//! - Translating between bus events, viewer envelopes, and backend results
//! - Backend calls (`fetch_initial_document`, `save_document`)
//! - The host-facing session directory
//!
//! # What does NOT belong here?
//!
//! - Sockets, WebSocket framing, or file I/O (that is infrastructure)
//! - Concrete bus or listener registry implementations (also infrastructure)

pub mod host;
pub mod invoker;
pub mod lifecycle;
pub mod session;
pub mod surface;
pub mod translator;

pub use host::{BridgeHost, BusPublisher};
pub use invoker::{BackendError, DocumentBackend, FetchError, RemoteOperationInvoker, SaveError};
pub use lifecycle::{EventBus, EventSink, ListenerRegistry, SessionLifecycle};
pub use session::{BridgeSession, SessionDeps, SessionEvent, SessionHandle};
pub use surface::{surface_channel, SurfaceClosed, SurfaceHandle, SurfaceReceiver};
