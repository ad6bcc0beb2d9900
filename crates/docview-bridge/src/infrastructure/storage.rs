//! File-system document backend.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/
//!   <recordId>/
//!     link.txt            external link; takes precedence when present
//!     contract.pdf        otherwise the first regular file (by name) is served
//!     saved/
//!       <uuid>.json       one file per save request
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docview_core::{encode_base64, FetchedAttachment, SaveAck};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::invoker::{BackendError, DocumentBackend};

const LINK_FILE: &str = "link.txt";
const SAVED_DIR: &str = "saved";

/// Serves and stores documents under a root directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the directory of `owner_id`, refusing ids that would escape
    /// the storage root.
    fn record_dir(&self, owner_id: &str) -> Result<PathBuf, BackendError> {
        let valid = !owner_id.is_empty()
            && owner_id != "."
            && owner_id != ".."
            && !owner_id.contains(['/', '\\']);
        if !valid {
            return Err(BackendError::Rejected(format!(
                "invalid record id '{owner_id}'"
            )));
        }
        Ok(self.root.join(owner_id))
    }
}

#[async_trait]
impl DocumentBackend for FsDocumentStore {
    async fn get_first_attachment(
        &self,
        owner_id: &str,
    ) -> Result<FetchedAttachment, BackendError> {
        let dir = self.record_dir(owner_id)?;

        match tokio::fs::read_to_string(dir.join(LINK_FILE)).await {
            Ok(link) if !link.trim().is_empty() => {
                let link = link.trim().to_string();
                debug!("record {owner_id}: serving external link");
                return Ok(attachment_for_link(link));
            }
            Ok(_) => debug!("record {owner_id}: empty {LINK_FILE} ignored"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackendError::NotFound(owner_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != LINK_FILE {
                files.push((name, entry.path()));
            }
        }
        files.sort();

        let (name, path) = files
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(owner_id.to_string()))?;
        let bytes = tokio::fs::read(&path).await?;
        debug!("record {owner_id}: serving {name} ({} bytes)", bytes.len());

        Ok(FetchedAttachment {
            s3link: None,
            body: Some(encode_base64(&bytes)),
            extension: dotted_extension(&name),
            id: name.clone(),
            name,
        })
    }

    async fn save_document(&self, json: String, owner_id: &str) -> Result<SaveAck, BackendError> {
        let dir = self.record_dir(owner_id)?.join(SAVED_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let id = Uuid::new_v4();
        let path = dir.join(format!("{id}.json"));
        tokio::fs::write(&path, json).await?;
        info!("record {owner_id}: saved document {id}");

        Ok(SaveAck(json!({ "id": id.to_string(), "recordId": owner_id })))
    }
}

fn attachment_for_link(link: String) -> FetchedAttachment {
    let path = link.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default().to_string();
    FetchedAttachment {
        extension: dotted_extension(&name),
        id: name.clone(),
        name,
        s3link: Some(link),
        body: None,
    }
}

/// `"report.pdf"` → `".pdf"`; no extension → `""`.
fn dotted_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
