//! The bridge session: one actor per mounted viewing surface.
//!
//! A [`BridgeSession`] owns all per-session state and runs as a single Tokio
//! task.  Every input (bus events, boundary messages, surface readiness,
//! backend results, host calls) arrives as a [`SessionEvent`] on one queue
//! and is handled to completion before the next, so session state never
//! needs a lock.
//!
//! Backend calls run in their own tasks.  Their results come back as events
//! through the session's queue; if the session has been unmounted by then,
//! the queue is gone and the result is discarded.
//!
//! ```text
//!   bus ─────────────┐
//!   boundary ────────┤                         ┌──▶ backend task ──┐
//!   host ────────────┼──▶ [event queue] ──▶ BridgeSession          │
//!   backend results ─┘          ▲              └──▶ surface queue ──┼──▶ viewer
//!                               └──────────────────────────────────┘
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;

use docview_core::{BusChannel, InboundBusEvent, InitialDocument, OutboundEnvelope, SaveAck};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::application::invoker::{FetchError, RemoteOperationInvoker, SaveError};
use crate::application::lifecycle::{EventBus, EventSink, ListenerRegistry, SessionLifecycle};
use crate::application::surface::SurfaceHandle;
use crate::application::translator::{
    fetch_failure_envelope, initial_document_envelope, received_message_summary,
    save_outcome_envelope, translate_bus_event, translate_viewer_envelope, ViewerAction,
};
use crate::domain::boundary::BoundaryMessage;
use crate::domain::config::PendingPolicy;
use crate::domain::session::{SessionError, SessionId, SessionSnapshot};

/// Everything that can happen to a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// An event published on a subscribed bus channel.
    Bus {
        channel: BusChannel,
        event: InboundBusEvent,
    },

    /// A message from the viewer side of the boundary, not yet validated.
    Boundary(BoundaryMessage),

    /// The viewer surface is ready to receive envelopes.
    SurfaceReady {
        surface: SurfaceHandle,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Continuation of an initial-document fetch.
    InitialDocumentLoaded(Result<InitialDocument, FetchError>),

    /// Continuation of a save request.
    SaveCompleted(Result<SaveAck, SaveError>),

    /// Host entry point: (re)load the owner's document.
    OpenDocument,

    /// Host entry point: close the viewer's document.
    CloseDocument,

    /// Report the session's state.
    Snapshot(oneshot::Sender<SessionSnapshot>),

    /// Tear the session down.
    Unmount,
}

/// Shared collaborators every session is built from.
#[derive(Clone)]
pub struct SessionDeps {
    pub bus: Arc<dyn EventBus>,
    pub listeners: Arc<dyn ListenerRegistry>,
    pub invoker: RemoteOperationInvoker,
    pub pending_policy: PendingPolicy,
}

/// Per-session state, owned by the session task.
pub struct BridgeSession {
    id: SessionId,
    owner_id: String,
    lifecycle: SessionLifecycle,
    surface: Option<SurfaceHandle>,
    /// Latest undelivered envelope per bus channel, oldest first.
    pending: Vec<(BusChannel, OutboundEnvelope)>,
    last_ack: Option<SaveAck>,
    received_message: Option<String>,
    invoker: RemoteOperationInvoker,
    pending_policy: PendingPolicy,
    /// Handed to backend tasks so their results re-enter this session's queue.
    events: EventSink,
}

impl BridgeSession {
    /// Creates a session and opens its lifecycle, without starting its task.
    ///
    /// Returns the session and the receiving end of its event queue; pass
    /// both to [`BridgeSession::run`], or drive [`BridgeSession::handle`]
    /// directly.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError::InvariantViolation`] from the lifecycle.
    pub fn open(
        owner_id: impl Into<String>,
        deps: &SessionDeps,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        let id = SessionId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut lifecycle = SessionLifecycle::new(id, deps.bus.clone(), deps.listeners.clone());
        lifecycle.open(tx.clone())?;

        let session = Self {
            id,
            owner_id: owner_id.into(),
            lifecycle,
            surface: None,
            pending: Vec::new(),
            last_ack: None,
            received_message: None,
            invoker: deps.invoker.clone(),
            pending_policy: deps.pending_policy,
            events: tx,
        };
        Ok((session, rx))
    }

    /// Opens a session and spawns its task on the current runtime.
    ///
    /// # Errors
    ///
    /// See [`BridgeSession::open`].
    pub fn mount(
        owner_id: impl Into<String>,
        deps: &SessionDeps,
    ) -> Result<SessionHandle, SessionError> {
        let (session, rx) = Self::open(owner_id, deps)?;
        let handle = session.handle_ref();
        tokio::spawn(session.run(rx));
        Ok(handle)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// A host-facing handle to this session.
    pub fn handle_ref(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            owner_id: self.owner_id.clone(),
            tx: self.events.clone(),
        }
    }

    /// Processes events until the session is unmounted, then closes the
    /// lifecycle.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        info!("session {}: mounted for record {}", self.id, self.owner_id);
        while let Some(event) = rx.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.lifecycle.close();
        info!("session {}: unmounted", self.id);
    }

    /// Handles one event.  Returns `Break` when the session should stop.
    pub fn handle(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Bus { channel, event } => self.on_bus_event(channel, event),
            SessionEvent::Boundary(message) => self.on_boundary_message(message),
            SessionEvent::SurfaceReady { surface, reply } => {
                let result = self.on_surface_ready(surface);
                // The caller may have stopped waiting; the result is logged either way.
                let _ = reply.send(result);
            }
            SessionEvent::InitialDocumentLoaded(result) => self.on_initial_document(result),
            SessionEvent::SaveCompleted(result) => self.on_save_completed(result),
            SessionEvent::OpenDocument => self.on_open_document(),
            SessionEvent::CloseDocument => self.on_close_document(),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionEvent::Unmount => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            owner_id: self.owner_id.clone(),
            state: self.lifecycle.state(),
            surface_ready: self.surface.is_some(),
            has_pending_envelope: !self.pending.is_empty(),
            has_saved: self.last_ack.is_some(),
            received_message: self.received_message.clone(),
        }
    }

    // ── Event handlers ────────────────────────────────────────────────────────

    fn on_bus_event(&mut self, channel: BusChannel, event: InboundBusEvent) {
        debug!("session {}: bus event on {channel} for {}", self.id, event.record_id);

        if channel == BusChannel::ViewerNotifications {
            let summary = received_message_summary(&event);
            info!("session {}: {summary}", self.id);
            self.received_message = Some(summary);
        }

        match translate_bus_event(channel, &event) {
            Ok(envelope) => self.deliver_or_defer(channel, envelope),
            Err(e) => warn!(
                "session {}: dropping {channel} event for {}: {e}",
                self.id,
                event.filename()
            ),
        }
    }

    fn on_boundary_message(&mut self, message: BoundaryMessage) {
        let envelope = match message.validate() {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("session {}: discarding boundary message: {e}", self.id);
                return;
            }
        };

        if self.surface.is_none() {
            error!(
                "session {}: invariant violation: {} received before the surface was ready",
                self.id,
                envelope.kind()
            );
            return;
        }

        debug!("session {}: viewer → bridge: {}", self.id, envelope.kind());
        match translate_viewer_envelope(envelope, self.last_ack.as_ref()) {
            ViewerAction::Save(document) => self.spawn_save(document),
            ViewerAction::Reply(envelope) => self.post(envelope),
            ViewerAction::Ignore => {
                debug!("session {}: TAB_ACTIVE with nothing saved yet", self.id)
            }
        }
    }

    fn on_surface_ready(&mut self, surface: SurfaceHandle) -> Result<(), SessionError> {
        if self.surface.is_some() {
            let err = SessionError::InvariantViolation(format!(
                "session {} already has a surface",
                self.id
            ));
            error!("{err}");
            return Err(err);
        }

        info!("session {}: viewer surface ready", self.id);
        self.surface = Some(surface);
        for (_, envelope) in std::mem::take(&mut self.pending) {
            debug!("session {}: flushing pending {}", self.id, envelope.kind());
            self.post(envelope);
        }
        self.spawn_fetch();
        Ok(())
    }

    fn on_initial_document(&mut self, result: Result<InitialDocument, FetchError>) {
        let envelope = match result {
            Ok(doc) => {
                info!(
                    "session {}: opening {} ({})",
                    self.id, doc.filename, doc.document_id
                );
                initial_document_envelope(doc)
            }
            Err(e) => {
                warn!("session {}: {e}", self.id);
                fetch_failure_envelope(&e)
            }
        };
        self.post(envelope);
    }

    fn on_save_completed(&mut self, result: Result<SaveAck, SaveError>) {
        match &result {
            Ok(ack) => {
                info!("session {}: document saved", self.id);
                self.last_ack = Some(ack.clone());
            }
            Err(e) => warn!("session {}: {e}", self.id),
        }
        self.post(save_outcome_envelope(&result));
    }

    fn on_open_document(&mut self) {
        if self.surface.is_none() {
            debug!("session {}: open_document before the surface is ready", self.id);
            return;
        }
        self.spawn_fetch();
    }

    fn on_close_document(&mut self) {
        if self.surface.is_none() {
            debug!("session {}: close_document without a surface is a no-op", self.id);
            return;
        }
        self.post(OutboundEnvelope::CloseDocument);
    }

    // ── Delivery ──────────────────────────────────────────────────────────────

    /// Posts to the surface, or applies the pending policy if there is none.
    fn deliver_or_defer(&mut self, channel: BusChannel, envelope: OutboundEnvelope) {
        if self.surface.is_some() {
            self.post(envelope);
            return;
        }
        match self.pending_policy {
            PendingPolicy::KeepLatest => {
                if let Some(pos) = self.pending.iter().position(|(c, _)| *c == channel) {
                    let (_, old) = self.pending.remove(pos);
                    debug!(
                        "session {}: surface not ready; replacing pending {}",
                        self.id,
                        old.kind()
                    );
                }
                self.pending.push((channel, envelope));
            }
            PendingPolicy::Drop => warn!(
                "session {}: surface not ready; dropping {}",
                self.id,
                envelope.kind()
            ),
        }
    }

    fn post(&self, envelope: OutboundEnvelope) {
        let Some(surface) = &self.surface else {
            warn!(
                "session {}: no surface; dropping {}",
                self.id,
                envelope.kind()
            );
            return;
        };
        let kind = envelope.kind();
        match surface.post(envelope) {
            Ok(()) => debug!("session {}: bridge → viewer: {kind}", self.id),
            Err(e) => warn!("session {}: {e}; dropping {kind}", self.id),
        }
    }

    // ── Backend continuations ─────────────────────────────────────────────────

    fn spawn_fetch(&self) {
        let invoker = self.invoker.clone();
        let owner_id = self.owner_id.clone();
        let events = self.events.clone();
        let id = self.id;
        tokio::spawn(async move {
            let result = invoker.fetch_initial_document(&owner_id).await;
            if events.send(SessionEvent::InitialDocumentLoaded(result)).is_err() {
                debug!("session {id}: unmounted before the initial document arrived");
            }
        });
    }

    fn spawn_save(&self, document: Value) {
        let invoker = self.invoker.clone();
        let owner_id = self.owner_id.clone();
        let events = self.events.clone();
        let id = self.id;
        tokio::spawn(async move {
            let result = invoker.save_document(&owner_id, &document).await;
            if events.send(SessionEvent::SaveCompleted(result)).is_err() {
                debug!("session {id}: unmounted before the save completed");
            }
        });
    }
}

/// Host-facing handle to a running session.
///
/// Cheap to clone.  All methods only enqueue events; the session task does
/// the work.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    owner_id: String,
    tx: EventSink,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns `true` once the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Signals that the viewer surface is ready.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvariantViolation`] if the session already has a
    /// surface, [`SessionError::Closed`] if it has been unmounted.
    pub async fn attach_surface(&self, surface: SurfaceHandle) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::SurfaceReady { surface, reply })?;
        rx.await.map_err(|_| SessionError::Closed(self.id))?
    }

    /// Host entry point: (re)load the owner's document.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] if the session has been unmounted.
    pub fn open_document(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::OpenDocument)
    }

    /// Host entry point: post `CLOSE_DOCUMENT` if the viewer is attached.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] if the session has been unmounted.
    pub fn close_document(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::CloseDocument)
    }

    /// # Errors
    ///
    /// [`SessionError::Closed`] if the session has been unmounted.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Snapshot(reply))?;
        rx.await.map_err(|_| SessionError::Closed(self.id))
    }

    /// Asks the session to tear down.  Safe to call any number of times.
    pub fn unmount(&self) {
        if self.send(SessionEvent::Unmount).is_err() {
            debug!("session {}: already unmounted", self.id);
        }
    }

    fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.tx.send(event).map_err(|_| SessionError::Closed(self.id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
