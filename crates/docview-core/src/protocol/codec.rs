//! Base64 document codec.
//!
//! Document bodies reach the bridge as standard base64 text (RFC 4648 §4,
//! padded).  The codec turns that text into a [`Blob`]: the raw bytes plus the
//! content type resolved from the file extension.
//!
//! Going the other way, a [`Blob`] is written onto the JSON boundary as
//!
//! ```json
//! {"data":"JVBERi0=","type":"application/pdf"}
//! ```
//!
//! because JSON strings cannot carry arbitrary bytes.  The `type` key is
//! omitted when the content type is unknown.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::mime::mime_type_for;

/// Errors produced while decoding a document body.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The body contained a character outside the base64 alphabet, bad
    /// padding, or a truncated final quantum.
    #[error("invalid base64 body: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// A binary object tagged with a content type.
///
/// This is the bridge's equivalent of a browser `Blob`: opaque bytes the
/// viewer renders according to `mime_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// Raw document bytes, base64-encoded on the wire.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,

    /// Resolved content type; `None` when the extension is not registered.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Blob {
    /// Number of bytes in the blob.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the blob carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decodes standard, padded base64 into bytes.
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase64`] on characters outside the alphabet,
/// wrong padding, or a truncated input.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(encoded)?)
}

/// Encodes bytes as standard, padded base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes a base64 document body and tags it with the content type for
/// `extension`.
///
/// An unknown extension is not an error: the blob simply carries no type.
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase64`] when `body` is not valid base64.
///
/// # Example
///
/// ```rust
/// use docview_core::decode_document;
///
/// let blob = decode_document("UERG", ".pdf").unwrap();
/// assert_eq!(blob.data, b"PDF");
/// assert_eq!(blob.mime_type.as_deref(), Some("application/pdf"));
/// ```
pub fn decode_document(body: &str, extension: &str) -> Result<Blob, CodecError> {
    let data = decode_base64(body)?;
    let mime_type = mime_type_for(extension).map(str::to_string);
    if mime_type.is_none() {
        tracing::debug!("no content type registered for extension {extension:?}");
    }
    Ok(Blob { data, mime_type })
}

/// Serde adapter that stores a byte vector as a base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
