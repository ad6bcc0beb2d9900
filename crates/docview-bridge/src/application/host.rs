//! The host-facing side of the bridge: a directory of mounted sessions.
//!
//! [`BridgeHost`] is what the hosting application talks to.  It mounts and
//! unmounts sessions, publishes bus events, routes viewer messages to the
//! right session, and executes [`HostCommand`]s received over the wire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use docview_core::{BusChannel, HostCommand, HostReply, InboundBusEvent};
use tracing::{debug, info, warn};

use crate::application::session::{BridgeSession, SessionDeps, SessionHandle};
use crate::application::surface::SurfaceHandle;
use crate::domain::boundary::BoundaryMessage;
use crate::domain::session::{SessionError, SessionId};

/// Publishing side of the internal bus.
pub trait BusPublisher: Send + Sync {
    /// Delivers `event` to every live subscriber of `channel`.
    ///
    /// Returns the number of subscribers it reached.
    fn publish(&self, channel: BusChannel, event: &InboundBusEvent) -> usize;
}

/// Directory of mounted sessions plus the shared collaborators they use.
pub struct BridgeHost {
    deps: SessionDeps,
    publisher: Arc<dyn BusPublisher>,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl BridgeHost {
    pub fn new(deps: SessionDeps, publisher: Arc<dyn BusPublisher>) -> Self {
        Self {
            deps,
            publisher,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Mounts a new session owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Propagates lifecycle errors from [`BridgeSession::mount`].
    pub fn mount(&self, owner_id: &str) -> Result<SessionHandle, SessionError> {
        let handle = BridgeSession::mount(owner_id, &self.deps)?;
        self.lock_sessions().insert(handle.id(), handle.clone());
        info!("mounted session {} for record {owner_id}", handle.id());
        Ok(handle)
    }

    /// Unmounts a session and forgets it.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not mounted.
    pub fn unmount(&self, id: SessionId) -> Result<(), SessionError> {
        let handle = self
            .lock_sessions()
            .remove(&id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        handle.unmount();
        Ok(())
    }

    /// Unmounts every session.  Used on shutdown.
    pub fn unmount_all(&self) {
        let handles: Vec<SessionHandle> = self.lock_sessions().drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.unmount();
        }
    }

    /// Looks up a mounted session.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not mounted.
    pub fn get(&self, id: SessionId) -> Result<SessionHandle, SessionError> {
        self.lock_sessions()
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Publishes a bus event.  Returns the number of subscriptions reached.
    pub fn publish(&self, channel: BusChannel, event: &InboundBusEvent) -> usize {
        let deliveries = self.publisher.publish(channel, event);
        debug!("published {channel} event for {}: {deliveries} deliveries", event.record_id);
        deliveries
    }

    /// Attaches a viewer surface to session `id`.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not mounted, otherwise
    /// whatever [`SessionHandle::attach_surface`] reports.
    pub async fn attach_viewer(
        &self,
        id: SessionId,
        surface: SurfaceHandle,
    ) -> Result<(), SessionError> {
        let handle = self.get(id)?;
        handle.attach_surface(surface).await
    }

    /// Routes a viewer message to session `id`'s boundary listener.
    ///
    /// Returns `false` when no listener is installed for `id`.
    pub fn deliver_boundary(&self, id: SessionId, message: BoundaryMessage) -> bool {
        self.deps.listeners.dispatch(id, message)
    }

    /// Executes one wire command and produces its reply.
    pub fn execute(&self, command: HostCommand) -> HostReply {
        let kind = command.kind();
        let result = match command {
            HostCommand::Mount { record_id } => self.mount(&record_id).map(|handle| {
                HostReply::Mounted {
                    session_id: handle.id().to_string(),
                }
            }),
            HostCommand::Publish { channel, event } => Ok(HostReply::Published {
                deliveries: self.publish(channel, &event),
            }),
            HostCommand::OpenDocument { session_id } => self
                .lookup(&session_id)
                .and_then(|handle| handle.open_document())
                .map(|()| HostReply::Accepted),
            HostCommand::CloseDocument { session_id } => self
                .lookup(&session_id)
                .and_then(|handle| handle.close_document())
                .map(|()| HostReply::Accepted),
            HostCommand::Unmount { session_id } => session_id
                .parse::<SessionId>()
                .and_then(|id| self.unmount(id))
                .map(|()| HostReply::Unmounted),
        };

        result.unwrap_or_else(|e| {
            warn!("host command {kind} failed: {e}");
            HostReply::Error {
                message: e.to_string(),
            }
        })
    }

    fn lookup(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.get(session_id.parse()?)
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BridgeHost {
    fn drop(&mut self) {
        self.unmount_all();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
