//! Domain types shared by the bridge and its collaborators.
//!
//! These types describe documents as they move through the bridge: the raw
//! bus event, the decoded document, the backend's attachment record and the
//! save acknowledgment.  None of them perform I/O.

pub mod document;

pub use document::{
    compose_filename, AttachmentError, BusChannel, DecodedDocument, FetchedAttachment, InboundBusEvent,
    InitialDocument, SaveAck,
};
