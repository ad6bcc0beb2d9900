//! Envelope types for the viewer-facing boundary protocol.
//!
//! Every message crossing the boundary between the bridge and the embedded
//! viewer is a JSON object with a `"type"` discriminant and an optional
//! `"payload"`:
//!
//! ```json
//! {"type":"LMS_RECEIVED","payload":{"message":"...","filename":"a.pdf","source":"R1"}}
//! {"type":"CLOSE_DOCUMENT"}
//! ```
//!
//! # Why separate outbound and inbound envelope types?
//!
//! The two directions carry different information:
//!
//! - The bridge *sends* documents, notifications and acknowledgments.
//! - The viewer *sends* save requests and tab activation notices.
//!
//! Using two distinct enums makes it a compile-time error to send a
//! viewer-only message to the viewer, and vice versa.  The payload shape is
//! fixed per variant, so a `DOCUMENT_SAVED` can never carry a blob.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::document::SaveAck;
use crate::protocol::codec::Blob;

// ── Bridge → Viewer ───────────────────────────────────────────────────────────

/// All envelopes the bridge posts to the viewer.
///
/// # Serde representation
///
/// ```json
/// {"type":"OPEN_DOCUMENT_BLOB","payload":{"blob":{"data":"UERG","type":"application/pdf"},
///   "extension":"pdf","filename":"doc.pdf","documentId":"R1"}}
/// {"type":"DOCUMENT_SAVED","payload":{"id":"S1"}}
/// {"type":"CLOSE_DOCUMENT"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundEnvelope {
    /// A document selected on the bus, decoded into a blob.
    OpenDocumentBlob(OpenDocumentBlobPayload),

    /// The owner's initial document: either an external link or a blob.
    OpenBlobOrLink(OpenBlobOrLinkPayload),

    /// A bus notification forwarded verbatim.
    LmsReceived(LmsReceivedPayload),

    /// The backend acknowledged a save.  The ack is opaque to the bridge.
    DocumentSaved(SaveAck),

    /// The backend rejected a save request.
    DocumentSaveFailed(FailurePayload),

    /// The initial document could not be fetched.
    DocumentLoadFailed(FailurePayload),

    /// The host asked the viewer to close its document.
    CloseDocument,
}

impl OutboundEnvelope {
    /// Returns the wire discriminant, for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEnvelope::OpenDocumentBlob(_) => "OPEN_DOCUMENT_BLOB",
            OutboundEnvelope::OpenBlobOrLink(_) => "OPEN_BLOB_OR_LINK",
            OutboundEnvelope::LmsReceived(_) => "LMS_RECEIVED",
            OutboundEnvelope::DocumentSaved(_) => "DOCUMENT_SAVED",
            OutboundEnvelope::DocumentSaveFailed(_) => "DOCUMENT_SAVE_FAILED",
            OutboundEnvelope::DocumentLoadFailed(_) => "DOCUMENT_LOAD_FAILED",
            OutboundEnvelope::CloseDocument => "CLOSE_DOCUMENT",
        }
    }
}

/// Payload of `OPEN_DOCUMENT_BLOB`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDocumentBlobPayload {
    pub blob: Blob,
    /// Extension without a leading separator.
    pub extension: String,
    pub filename: String,
    pub document_id: String,
}

/// Payload of `OPEN_BLOB_OR_LINK`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBlobOrLinkPayload {
    #[serde(rename = "linkblob")]
    pub link_or_blob: LinkOrBlob,
    /// Extension without a leading separator.
    pub extension: String,
    pub filename: String,
    pub document_id: String,
}

/// Either an external link to a stored document or the document itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkOrBlob {
    Link(String),
    Blob(Blob),
}

/// Payload of `LMS_RECEIVED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmsReceivedPayload {
    pub message: String,
    pub filename: String,
    pub source: String,
}

/// Payload of the failure envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePayload {
    /// Human-readable description of what went wrong.
    pub message: String,
}

// ── Viewer → Bridge ───────────────────────────────────────────────────────────

/// Reasons an inbound value is not a well-formed envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("envelope has no string \"type\" field")]
    MissingType,

    #[error("unknown envelope type: {0}")]
    UnknownType(String),

    #[error("{0} envelope requires a non-null payload")]
    MissingPayload(&'static str),
}

/// All envelopes the viewer can post to the bridge.
///
/// Deserialization goes through [`InboundEnvelope::try_from`] so that
/// structural problems are reported as an [`EnvelopeError`] instead of a
/// generic serde message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundEnvelope {
    /// The viewer wants its current document state persisted.  The payload
    /// is opaque to the bridge.
    SaveDocument(Value),

    /// The viewer's tab became active again.
    TabActive,
}

impl InboundEnvelope {
    /// Returns the wire discriminant, for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEnvelope::SaveDocument(_) => "SAVE_DOCUMENT",
            InboundEnvelope::TabActive => "TAB_ACTIVE",
        }
    }
}

impl TryFrom<Value> for InboundEnvelope {
    type Error = EnvelopeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let kind = match fields.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(EnvelopeError::MissingType),
        };

        match kind.as_str() {
            "SAVE_DOCUMENT" => match fields.remove("payload") {
                Some(Value::Null) | None => Err(EnvelopeError::MissingPayload("SAVE_DOCUMENT")),
                Some(payload) => Ok(InboundEnvelope::SaveDocument(payload)),
            },
            // Any payload sent alongside TAB_ACTIVE is ignored.
            "TAB_ACTIVE" => Ok(InboundEnvelope::TabActive),
            _ => Err(EnvelopeError::UnknownType(kind)),
        }
    }
}

impl<'de> Deserialize<'de> for InboundEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        InboundEnvelope::try_from(value).map_err(serde::de::Error::custom)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
