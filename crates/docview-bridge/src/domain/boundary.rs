//! Messages arriving over the viewer boundary, before validation.
//!
//! Anything can reach the boundary listener, so every message is wrapped as a
//! [`BoundaryMessage`] carrying where it came from and whether the transport
//! vouched for it.  [`BoundaryMessage::validate`] is the only way to turn one
//! into an [`InboundEnvelope`].

use docview_core::protocol::envelope::EnvelopeError;
use docview_core::InboundEnvelope;
use serde_json::Value;
use thiserror::Error;

/// A raw message from the viewer side of the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMessage {
    /// Origin the message was sent from, when the transport knows it.
    pub origin: Option<String>,
    /// `true` when the transport authenticated the sender.
    pub trusted: bool,
    /// The message body, parsed as JSON but otherwise unchecked.
    pub data: Value,
}

/// Why a boundary message was discarded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UntrustedMessage {
    #[error("message from untrusted origin {origin:?}")]
    NotTrusted { origin: Option<String> },

    #[error("malformed envelope: {0}")]
    Malformed(#[from] EnvelopeError),
}

impl BoundaryMessage {
    /// A message the transport vouched for.
    pub fn trusted(origin: Option<String>, data: Value) -> Self {
        Self {
            origin,
            trusted: true,
            data,
        }
    }

    /// A message of unknown provenance.
    pub fn untrusted(origin: Option<String>, data: Value) -> Self {
        Self {
            origin,
            trusted: false,
            data,
        }
    }

    /// Checks trust first, then shape.
    ///
    /// # Errors
    ///
    /// [`UntrustedMessage::NotTrusted`] when the transport did not vouch for
    /// the sender, [`UntrustedMessage::Malformed`] when the body is not a
    /// well-formed inbound envelope.
    pub fn validate(self) -> Result<InboundEnvelope, UntrustedMessage> {
        if !self.trusted {
            return Err(UntrustedMessage::NotTrusted {
                origin: self.origin,
            });
        }
        Ok(InboundEnvelope::try_from(self.data)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
