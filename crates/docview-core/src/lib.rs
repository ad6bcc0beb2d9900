//! # docview-core
//!
//! Shared library for the DocView bridge containing the envelope protocol
//! spoken with the embedded viewer, the host command protocol, the base64
//! document codec, and the file-extension → MIME lookup.
//!
//! This crate has no dependencies on sockets, async runtimes, or the file
//! system.  Everything here is a pure data type or a pure function.
//!
//! # Architecture overview (for beginners)
//!
//! The bridge sits between a host application and an embedded document
//! viewer.  Three things flow through it:
//!
//! - **Bus events** – the host announces that a file was selected.  These
//!   carry the document body as base64 text.
//! - **Envelopes** – tagged JSON messages exchanged with the viewer
//!   (`{"type": "OPEN_DOCUMENT_BLOB", "payload": {...}}`).
//! - **Backend results** – fetched attachments and save acknowledgments.
//!
//! This crate (`docview-core`) defines:
//!
//! - **`protocol`** – the envelope enums for both directions, the host
//!   command protocol, the base64 codec and the MIME table.
//!
//! - **`domain`** – bus events, decoded documents, fetched attachments and
//!   save acknowledgments.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `docview_core::OutboundEnvelope` instead of the full module path.
pub use domain::document::{
    compose_filename, AttachmentError, BusChannel, DecodedDocument, FetchedAttachment, InboundBusEvent,
    InitialDocument, SaveAck,
};
pub use protocol::codec::{decode_base64, decode_document, encode_base64, Blob, CodecError};
pub use protocol::envelope::{EnvelopeError, InboundEnvelope, LinkOrBlob, OutboundEnvelope};
pub use protocol::host::{HostCommand, HostReply};
pub use protocol::mime::{mime_type_for, normalize_extension};
