//! Protocol module containing envelope types, the host command protocol,
//! the base64 codec, and the MIME table.

pub mod codec;
pub mod envelope;
pub mod host;
pub mod mime;

pub use codec::{decode_base64, decode_document, encode_base64, Blob, CodecError};
pub use envelope::*;
pub use host::{HostCommand, HostReply};
pub use mime::{mime_type_for, normalize_extension};
