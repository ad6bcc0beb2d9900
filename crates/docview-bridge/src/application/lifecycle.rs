//! Session lifecycle: installing and tearing down a session's listeners.
//!
//! A session listens on two sources.  Both registrations happen in
//! [`SessionLifecycle::open`], in this order:
//!
//! 1. a bus subscription per [`BusChannel`], scoped to a fresh context handle;
//! 2. a boundary listener in the process-wide [`ListenerRegistry`], keyed by
//!    the session id.
//!
//! [`SessionLifecycle::close`] undoes both and releases the context handle.
//! It is idempotent because the host and the session can tear down in either
//! order.  Dropping a `SessionLifecycle` closes it.
//!
//! ```text
//! Unopened ──open──▶ Open ──close──▶ Closed
//!     └──────────────close──────────────┘
//! ```

use std::sync::Arc;

use docview_core::BusChannel;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::session::SessionEvent;
use crate::domain::boundary::BoundaryMessage;
use crate::domain::session::{
    ContextHandle, LifecycleState, SessionError, SessionId, SubscriptionId,
};

/// Where collaborators deliver events for one session.
pub type EventSink = mpsc::UnboundedSender<SessionEvent>;

/// The internal publish/subscribe bus, as a session consumes it.
pub trait EventBus: Send + Sync {
    /// Allocates a context handle that scopes subsequent subscriptions.
    fn create_context(&self) -> ContextHandle;

    /// Subscribes `sink` to `channel` within `context`.
    fn subscribe(
        &self,
        context: ContextHandle,
        channel: BusChannel,
        sink: EventSink,
    ) -> SubscriptionId;

    /// Removes one subscription.  Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);

    /// Releases a context handle and anything still subscribed under it.
    fn release_context(&self, context: ContextHandle);
}

/// The process-wide boundary listener registry, keyed by session.
pub trait ListenerRegistry: Send + Sync {
    /// Installs the boundary listener for `session`.
    fn register(&self, session: SessionId, sink: EventSink);

    /// Removes every listener installed for `session`.
    fn unregister_all(&self, session: SessionId);

    /// Routes a boundary message to `target`'s listener.
    ///
    /// Returns `false` when no listener is registered for `target`.
    fn dispatch(&self, target: SessionId, message: BoundaryMessage) -> bool;
}

/// Owns a session's registrations.
pub struct SessionLifecycle {
    session_id: SessionId,
    state: LifecycleState,
    context: Option<ContextHandle>,
    subscriptions: Vec<SubscriptionId>,
    bus: Arc<dyn EventBus>,
    listeners: Arc<dyn ListenerRegistry>,
}

impl SessionLifecycle {
    pub fn new(
        session_id: SessionId,
        bus: Arc<dyn EventBus>,
        listeners: Arc<dyn ListenerRegistry>,
    ) -> Self {
        Self {
            session_id,
            state: LifecycleState::Unopened,
            context: None,
            subscriptions: Vec::new(),
            bus,
            listeners,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Registers the bus subscriptions and the boundary listener.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvariantViolation`] if the session is already open
    /// (a second open would leak duplicate subscriptions) or already closed.
    pub fn open(&mut self, sink: EventSink) -> Result<(), SessionError> {
        match self.state {
            LifecycleState::Unopened => {}
            LifecycleState::Open => {
                return Err(SessionError::InvariantViolation(format!(
                    "session {} opened twice",
                    self.session_id
                )))
            }
            LifecycleState::Closed => {
                return Err(SessionError::InvariantViolation(format!(
                    "session {} is closed and cannot be reopened",
                    self.session_id
                )))
            }
        }

        let context = self.bus.create_context();
        for channel in BusChannel::ALL {
            let id = self.bus.subscribe(context, channel, sink.clone());
            self.subscriptions.push(id);
        }
        self.listeners.register(self.session_id, sink);

        self.context = Some(context);
        self.state = LifecycleState::Open;
        debug!(
            "session {}: opened with {} bus subscriptions",
            self.session_id,
            self.subscriptions.len()
        );
        Ok(())
    }

    /// Reverses [`open`](Self::open).  No-op unless the session is open.
    ///
    /// Returns `true` if this call tore anything down.
    pub fn close(&mut self) -> bool {
        match self.state {
            LifecycleState::Open => {}
            LifecycleState::Unopened => {
                // Never opened: nothing to release, but the session can no
                // longer be opened either.
                self.state = LifecycleState::Closed;
                return false;
            }
            LifecycleState::Closed => return false,
        }

        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        self.listeners.unregister_all(self.session_id);
        if let Some(context) = self.context.take() {
            self.bus.release_context(context);
        }

        self.state = LifecycleState::Closed;
        debug!("session {}: closed", self.session_id);
        true
    }
}

impl Drop for SessionLifecycle {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        CreateContext(u64),
        Subscribe(u64, BusChannel),
        Unsubscribe(u64),
        Release(u64),
        Register,
        UnregisterAll,
    }

    #[derive(Default)]
    struct RecordingCollaborators {
        calls: Mutex<Vec<Call>>,
        next: Mutex<u64>,
    }

    impl RecordingCollaborators {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn next_id(&self) -> u64 {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            *next
        }
    }

    impl EventBus for RecordingCollaborators {
        fn create_context(&self) -> ContextHandle {
            let id = self.next_id();
            self.calls.lock().unwrap().push(Call::CreateContext(id));
            ContextHandle(id)
        }

        fn subscribe(
            &self,
            context: ContextHandle,
            channel: BusChannel,
            _sink: EventSink,
        ) -> SubscriptionId {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Subscribe(context.0, channel));
            SubscriptionId(self.next_id())
        }

        fn unsubscribe(&self, subscription: SubscriptionId) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Unsubscribe(subscription.0));
        }

        fn release_context(&self, context: ContextHandle) {
            self.calls.lock().unwrap().push(Call::Release(context.0));
        }
    }

    impl ListenerRegistry for RecordingCollaborators {
        fn register(&self, _session: SessionId, _sink: EventSink) {
            self.calls.lock().unwrap().push(Call::Register);
        }

        fn unregister_all(&self, _session: SessionId) {
            self.calls.lock().unwrap().push(Call::UnregisterAll);
        }

        fn dispatch(&self, _target: SessionId, _message: BoundaryMessage) -> bool {
            false
        }
    }

    fn lifecycle() -> (SessionLifecycle, Arc<RecordingCollaborators>, EventSink) {
        let collab = Arc::new(RecordingCollaborators::default());
        let lc = SessionLifecycle::new(SessionId::new(), collab.clone(), collab.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        (lc, collab, tx)
    }

    #[test]
    fn test_open_registers_bus_then_listener() {
        // Arrange
        let (mut lc, collab, sink) = lifecycle();

        // Act
        lc.open(sink).unwrap();

        // Assert: context, one subscription per channel, then the listener
        assert_eq!(
            collab.calls(),
            vec![
                Call::CreateContext(1),
                Call::Subscribe(1, BusChannel::ViewerNotifications),
                Call::Subscribe(1, BusChannel::BlobSelected),
                Call::Register,
            ]
        );
        assert_eq!(lc.state(), LifecycleState::Open);
    }

    #[test]
    fn test_close_reverses_registrations_and_releases_context() {
        let (mut lc, collab, sink) = lifecycle();
        lc.open(sink).unwrap();

        assert!(lc.close());

        let calls = collab.calls();
        assert_eq!(
            &calls[4..],
            &[
                Call::Unsubscribe(2),
                Call::Unsubscribe(3),
                Call::UnregisterAll,
                Call::Release(1),
            ]
        );
        assert_eq!(lc.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_second_close_is_a_no_op() {
        // Arrange: open, close once, remember the collaborator calls
        let (mut lc, collab, sink) = lifecycle();
        lc.open(sink).unwrap();
        lc.close();
        let after_first_close = collab.calls();

        // Act
        let tore_down = lc.close();

        // Assert: identical to having closed once
        assert!(!tore_down);
        assert_eq!(collab.calls(), after_first_close);
    }

    #[test]
    fn test_close_without_open_is_a_no_op() {
        let (mut lc, collab, _sink) = lifecycle();

        assert!(!lc.close());
        assert!(collab.calls().is_empty());
        assert_eq!(lc.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_double_open_fails_fast_without_new_subscriptions() {
        let (mut lc, collab, sink) = lifecycle();
        lc.open(sink.clone()).unwrap();
        let after_open = collab.calls().len();

        let result = lc.open(sink);

        assert!(matches!(result, Err(SessionError::InvariantViolation(_))));
        assert_eq!(collab.calls().len(), after_open);
    }

    #[test]
    fn test_closed_session_cannot_be_reopened() {
        let (mut lc, _collab, sink) = lifecycle();
        lc.open(sink.clone()).unwrap();
        lc.close();

        assert!(matches!(
            lc.open(sink),
            Err(SessionError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_drop_closes_an_open_session() {
        let (mut lc, collab, sink) = lifecycle();
        lc.open(sink).unwrap();

        drop(lc);

        assert_eq!(collab.calls().last(), Some(&Call::Release(1)));
    }
}
