//! The viewer surface: a single ordered outbound queue per session.
//!
//! Every envelope a session posts goes through one [`SurfaceHandle`], so the
//! viewer sees envelopes in exactly the order the session produced them,
//! whichever event source triggered them.  The transport drains the paired
//! [`SurfaceReceiver`].

use docview_core::OutboundEnvelope;
use thiserror::Error;
use tokio::sync::mpsc;

/// The viewer side of the queue has gone away.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("viewer surface is closed")]
pub struct SurfaceClosed;

/// Sending half of a session's outbound queue.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
}

/// Receiving half of a session's outbound queue.
pub type SurfaceReceiver = mpsc::UnboundedReceiver<OutboundEnvelope>;

/// Creates a connected surface handle and receiver.
pub fn surface_channel() -> (SurfaceHandle, SurfaceReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SurfaceHandle { tx }, rx)
}

impl SurfaceHandle {
    /// Queues `envelope` for the viewer.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceClosed`] if the receiver was dropped (viewer gone).
    pub fn post(&self, envelope: OutboundEnvelope) -> Result<(), SurfaceClosed> {
        self.tx.send(envelope).map_err(|_| SurfaceClosed)
    }

    /// Returns `true` once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
