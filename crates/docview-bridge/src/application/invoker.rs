//! Remote operation invoker: the two backend calls a session makes.
//!
//! - [`RemoteOperationInvoker::fetch_initial_document`] runs once when the
//!   viewer becomes ready (and again on an explicit `open_document`).
//! - [`RemoteOperationInvoker::save_document`] runs for every
//!   `SAVE_DOCUMENT` envelope.
//!
//! Neither call is retried.  Timeouts are the backend's responsibility.

use std::sync::Arc;

use async_trait::async_trait;
use docview_core::domain::document::AttachmentError;
use docview_core::{FetchedAttachment, InitialDocument, SaveAck};
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a backend implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The owner has no document to open.
    #[error("no document found for record {0}")]
    NotFound(String),

    /// The backend refused the request.
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The backend collaborator that stores and retrieves documents.
///
/// Infrastructure implementations talk to real storage; tests use recording
/// doubles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Returns the first attachment stored for `owner_id`.
    async fn get_first_attachment(&self, owner_id: &str)
        -> Result<FetchedAttachment, BackendError>;

    /// Persists `json` (an opaque serialized document) for `owner_id`.
    async fn save_document(&self, json: String, owner_id: &str) -> Result<SaveAck, BackendError>;
}

/// The initial document could not be produced.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching the document for record {owner_id} failed: {source}")]
    Backend {
        owner_id: String,
        #[source]
        source: BackendError,
    },

    #[error("the document for record {owner_id} is unusable: {source}")]
    Attachment {
        owner_id: String,
        #[source]
        source: AttachmentError,
    },
}

/// A save request was not persisted.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("document state could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("saving the document for record {owner_id} failed: {source}")]
    Backend {
        owner_id: String,
        #[source]
        source: BackendError,
    },
}

/// Issues backend calls on behalf of a session.
#[derive(Clone)]
pub struct RemoteOperationInvoker {
    backend: Arc<dyn DocumentBackend>,
}

impl RemoteOperationInvoker {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Fetches the owner's first attachment and resolves it to either a link
    /// or a decoded blob.
    ///
    /// # Errors
    ///
    /// [`FetchError::Backend`] when the backend call fails,
    /// [`FetchError::Attachment`] when the attachment has neither a link nor
    /// a decodable body.
    pub async fn fetch_initial_document(
        &self,
        owner_id: &str,
    ) -> Result<InitialDocument, FetchError> {
        let attachment = self
            .backend
            .get_first_attachment(owner_id)
            .await
            .map_err(|source| FetchError::Backend {
                owner_id: owner_id.to_string(),
                source,
            })?;

        InitialDocument::try_from(attachment).map_err(|source| FetchError::Attachment {
            owner_id: owner_id.to_string(),
            source,
        })
    }

    /// Serializes `document` and asks the backend to persist it.
    ///
    /// # Errors
    ///
    /// [`SaveError::Serialize`] if the document cannot be turned into a JSON
    /// string, [`SaveError::Backend`] if the backend rejects it.
    pub async fn save_document(&self, owner_id: &str, document: &Value) -> Result<SaveAck, SaveError> {
        let json = serde_json::to_string(document)?;
        self.backend
            .save_document(json, owner_id)
            .await
            .map_err(|source| SaveError::Backend {
                owner_id: owner_id.to_string(),
                source,
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
