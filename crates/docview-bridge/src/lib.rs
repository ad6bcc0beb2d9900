//! docview-bridge library crate.
//!
//! This crate bridges a hosting application, an embedded document viewer,
//! and a document backend.  Each mounted viewing session listens on the
//! internal bus and on the viewer boundary, loads its owner's document when
//! the viewer is ready, and persists what the viewer saves.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Host application (JSON over WebSocket, /host)
//!         ↕
//! [docview-bridge]
//!   ├── domain/           Pure types: BridgeConfig, session ids, boundary messages
//!   ├── application/      Session actor, lifecycle, translation, backend invoker
//!   └── infrastructure/
//!         ├── bus/        In-process publish/subscribe bus
//!         ├── listeners/  Boundary listener registry
//!         ├── storage/    File-system document backend
//!         └── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         ↕
//! Embedded viewer (envelopes over WebSocket, /viewer/<sessionId>)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async runtime.
//! - `application` depends on `domain` and `docview-core`, and reaches
//!   collaborators only through traits (`EventBus`, `ListenerRegistry`,
//!   `DocumentBackend`, `BusPublisher`).
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: sessions and their behaviour.
pub mod application;

/// Infrastructure layer: bus, storage, and WebSocket server.
pub mod infrastructure;
