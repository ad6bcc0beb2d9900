//! Document entities.
//!
//! ```text
//! InboundBusEvent ──decode──▶ DecodedDocument ──▶ OPEN_DOCUMENT_BLOB
//! FetchedAttachment ──resolve──▶ InitialDocument ──▶ OPEN_BLOB_OR_LINK
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::codec::{decode_document, Blob, CodecError};
use crate::protocol::envelope::LinkOrBlob;
use crate::protocol::mime::normalize_extension;

/// Channels on the internal bus the bridge subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusChannel {
    /// Notifications meant for the viewer, forwarded as `LMS_RECEIVED`.
    ViewerNotifications,
    /// A file was picked in the host; decoded and opened as a blob.
    BlobSelected,
}

impl BusChannel {
    /// Every channel a session subscribes to.
    pub const ALL: [BusChannel; 2] = [BusChannel::ViewerNotifications, BusChannel::BlobSelected];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusChannel::ViewerNotifications => "viewer-notifications",
            BusChannel::BlobSelected => "blob-selected",
        }
    }
}

impl fmt::Display for BusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "A file was selected", as published on the internal bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundBusEvent {
    /// Document body as standard base64.
    pub body: String,
    /// Extension as the host knows it; may carry a leading `.`.
    pub file_extension: String,
    /// Record the file belongs to.
    pub record_id: String,
    /// File title without extension.
    pub title: String,
}

impl InboundBusEvent {
    /// `title.extension`, with the extension normalized.
    pub fn filename(&self) -> String {
        compose_filename(&self.title, &self.file_extension)
    }
}

/// Joins a title and an extension into a filename.
///
/// The extension's leading separator is stripped first; an empty extension
/// yields the bare title.
///
/// ```rust
/// use docview_core::compose_filename;
///
/// assert_eq!(compose_filename("doc", ".pdf"), "doc.pdf");
/// assert_eq!(compose_filename("doc", "pdf"), "doc.pdf");
/// assert_eq!(compose_filename("README", ""), "README");
/// ```
pub fn compose_filename(title: &str, extension: &str) -> String {
    match normalize_extension(extension) {
        "" => title.to_string(),
        ext => format!("{title}.{ext}"),
    }
}

/// A bus event after its body has been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    pub binary_data: Vec<u8>,
    pub mime_type: Option<String>,
    pub filename: String,
    pub document_id: String,
    /// Normalized extension (no leading separator).
    pub extension: String,
}

impl DecodedDocument {
    /// Decodes a bus event's body.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidBase64`] when the body is not valid base64.
    pub fn from_bus_event(event: &InboundBusEvent) -> Result<Self, CodecError> {
        let Blob { data, mime_type } = decode_document(&event.body, &event.file_extension)?;
        Ok(Self {
            binary_data: data,
            mime_type,
            filename: event.filename(),
            document_id: event.record_id.clone(),
            extension: normalize_extension(&event.file_extension).to_string(),
        })
    }

    /// Splits the document into the blob that crosses the boundary.
    pub fn to_blob(&self) -> Blob {
        Blob {
            data: self.binary_data.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// The backend's record of an owner's first attachment.
///
/// Exactly one of `s3link` and `body` is expected to be populated; when both
/// are, the link wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchedAttachment {
    /// External location of the document, if stored outside the backend.
    #[serde(default)]
    pub s3link: Option<String>,
    /// Embedded document body as base64.
    #[serde(default)]
    pub body: Option<String>,
    /// Extension, commonly with a leading `.`.
    pub extension: String,
    /// Display filename.
    pub name: String,
    /// Backend identifier of the document.
    #[serde(rename = "Id")]
    pub id: String,
}

/// Why an attachment could not be turned into an [`InitialDocument`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AttachmentError {
    #[error("attachment {0} carries neither a link nor a body")]
    Empty(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// The document a session opens once its viewer is ready.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialDocument {
    pub link_or_blob: LinkOrBlob,
    /// Normalized extension (no leading separator).
    pub extension: String,
    pub filename: String,
    pub document_id: String,
}

impl TryFrom<FetchedAttachment> for InitialDocument {
    type Error = AttachmentError;

    fn try_from(attachment: FetchedAttachment) -> Result<Self, Self::Error> {
        let link = attachment.s3link.filter(|link| !link.is_empty());
        let link_or_blob = match (link, attachment.body.as_deref()) {
            (Some(link), _) => LinkOrBlob::Link(link),
            (None, Some(body)) => {
                LinkOrBlob::Blob(decode_document(body, &attachment.extension)?)
            }
            (None, None) => return Err(AttachmentError::Empty(attachment.id)),
        };

        Ok(Self {
            link_or_blob,
            extension: normalize_extension(&attachment.extension).to_string(),
            filename: attachment.name,
            document_id: attachment.id,
        })
    }
}

/// Backend acknowledgment of a save.  Opaque to the bridge and forwarded to
/// the viewer verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveAck(pub Value);

// ── Tests ─────────────────────────────────────────────────────────────────────
