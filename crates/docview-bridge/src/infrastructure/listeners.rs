//! Process-wide boundary listener registry.
//!
//! Each mounted session installs exactly one listener, keyed by its session
//! id.  The viewer transport dispatches every inbound frame through here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::application::lifecycle::{EventSink, ListenerRegistry};
use crate::application::session::SessionEvent;
use crate::domain::boundary::BoundaryMessage;
use crate::domain::session::SessionId;

#[derive(Default)]
pub struct BoundaryListenerRegistry {
    listeners: Mutex<HashMap<SessionId, EventSink>>,
}

impl BoundaryListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, EventSink>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ListenerRegistry for BoundaryListenerRegistry {
    fn register(&self, session: SessionId, sink: EventSink) {
        if self.lock().insert(session, sink).is_some() {
            warn!("session {session}: boundary listener replaced");
        }
    }

    fn unregister_all(&self, session: SessionId) {
        if self.lock().remove(&session).is_some() {
            debug!("session {session}: boundary listener removed");
        }
    }

    fn dispatch(&self, target: SessionId, message: BoundaryMessage) -> bool {
        let Some(sink) = self.lock().get(&target).cloned() else {
            debug!("session {target}: no boundary listener; message dropped");
            return false;
        };
        sink.send(SessionEvent::Boundary(message)).is_ok()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
