//! Message translation between bus events, viewer envelopes, and backend
//! results.
//!
//! The functions in this module have no I/O side effects and do not touch
//! session state.  The session actor decides *when* to call them and what
//! to do with the result.
//!
//! # Translation directions
//!
//! ```text
//! Bus → Viewer:      InboundBusEvent   → OutboundEnvelope   translate_bus_event()
//! Viewer → Backend:  InboundEnvelope   → ViewerAction       translate_viewer_envelope()
//! Backend → Viewer:  fetch/save result → OutboundEnvelope   initial_document_envelope(), ...
//! ```

use docview_core::protocol::envelope::{
    FailurePayload, LmsReceivedPayload, OpenBlobOrLinkPayload, OpenDocumentBlobPayload,
};
use docview_core::{
    BusChannel, CodecError, DecodedDocument, InboundBusEvent, InboundEnvelope, InitialDocument,
    OutboundEnvelope, SaveAck,
};
use serde_json::Value;

use crate::application::invoker::{FetchError, SaveError};

/// What a session should do in response to a validated viewer envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerAction {
    /// Persist this opaque document through the invoker.
    Save(Value),
    /// Post this envelope straight back to the viewer.
    Reply(OutboundEnvelope),
    /// Nothing to do.
    Ignore,
}

/// Translates a bus event into the envelope the viewer should receive.
///
/// - `viewer-notifications` → `LMS_RECEIVED` carrying the event verbatim.
/// - `blob-selected` → `OPEN_DOCUMENT_BLOB` with the body decoded.
///
/// # Errors
///
/// Returns [`CodecError`] when a `blob-selected` body is not valid base64.
pub fn translate_bus_event(
    channel: BusChannel,
    event: &InboundBusEvent,
) -> Result<OutboundEnvelope, CodecError> {
    match channel {
        BusChannel::ViewerNotifications => {
            Ok(OutboundEnvelope::LmsReceived(LmsReceivedPayload {
                message: event.body.clone(),
                filename: event.filename(),
                source: event.record_id.clone(),
            }))
        }
        BusChannel::BlobSelected => {
            let doc = DecodedDocument::from_bus_event(event)?;
            Ok(OutboundEnvelope::OpenDocumentBlob(OpenDocumentBlobPayload {
                blob: doc.to_blob(),
                extension: doc.extension,
                filename: doc.filename,
                document_id: doc.document_id,
            }))
        }
    }
}

/// Human-readable summary of a notification, kept for diagnostics.
pub fn received_message_summary(event: &InboundBusEvent) -> String {
    format!(
        "Links to be loaded: {}\nSent From: {}",
        event.body, event.record_id
    )
}

/// Translates a validated viewer envelope.
///
/// `last_ack` is the most recent successful save acknowledgment of the
/// session.  `TAB_ACTIVE` re-sends it; with no prior save there is nothing to
/// acknowledge and the envelope is ignored.
pub fn translate_viewer_envelope(
    envelope: InboundEnvelope,
    last_ack: Option<&SaveAck>,
) -> ViewerAction {
    match envelope {
        InboundEnvelope::SaveDocument(document) => ViewerAction::Save(document),
        InboundEnvelope::TabActive => match last_ack {
            Some(ack) => ViewerAction::Reply(OutboundEnvelope::DocumentSaved(ack.clone())),
            None => ViewerAction::Ignore,
        },
    }
}

/// Builds `OPEN_BLOB_OR_LINK` for the owner's initial document.
pub fn initial_document_envelope(doc: InitialDocument) -> OutboundEnvelope {
    OutboundEnvelope::OpenBlobOrLink(OpenBlobOrLinkPayload {
        link_or_blob: doc.link_or_blob,
        extension: doc.extension,
        filename: doc.filename,
        document_id: doc.document_id,
    })
}

/// Builds `DOCUMENT_LOAD_FAILED` so the viewer is not left waiting.
pub fn fetch_failure_envelope(err: &FetchError) -> OutboundEnvelope {
    OutboundEnvelope::DocumentLoadFailed(FailurePayload {
        message: err.to_string(),
    })
}

/// Builds the envelope answering a save request.
pub fn save_outcome_envelope(result: &Result<SaveAck, SaveError>) -> OutboundEnvelope {
    match result {
        Ok(ack) => OutboundEnvelope::DocumentSaved(ack.clone()),
        Err(err) => OutboundEnvelope::DocumentSaveFailed(FailurePayload {
            message: err.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::invoker::BackendError;
    use docview_core::LinkOrBlob;
    use serde_json::json;

    fn event(ext: &str) -> InboundBusEvent {
        InboundBusEvent {
            body: "UERG".to_string(),
            file_extension: ext.to_string(),
            record_id: "R1".to_string(),
            title: "doc".to_string(),
        }
    }

    #[test]
    fn test_notification_becomes_lms_received_verbatim() {
        // Act
        let env = translate_bus_event(BusChannel::ViewerNotifications, &event(".pdf")).unwrap();

        // Assert: the body is not decoded on this path
        assert_eq!(
            env,
            OutboundEnvelope::LmsReceived(LmsReceivedPayload {
                message: "UERG".to_string(),
                filename: "doc.pdf".to_string(),
                source: "R1".to_string(),
            })
        );
    }

    #[test]
    fn test_notification_with_invalid_body_is_still_forwarded() {
        let mut ev = event("pdf");
        ev.body = "not base64 at all".to_string();

        let env = translate_bus_event(BusChannel::ViewerNotifications, &ev).unwrap();

        assert_eq!(env.kind(), "LMS_RECEIVED");
    }

    #[test]
    fn test_blob_selected_becomes_open_document_blob() {
        let env = translate_bus_event(BusChannel::BlobSelected, &event("pdf")).unwrap();

        match env {
            OutboundEnvelope::OpenDocumentBlob(p) => {
                assert_eq!(p.blob.data, b"PDF".to_vec());
                assert_eq!(p.blob.mime_type.as_deref(), Some("application/pdf"));
                assert_eq!(p.extension, "pdf");
                assert_eq!(p.filename, "doc.pdf");
                assert_eq!(p.document_id, "R1");
            }
            other => panic!("expected OPEN_DOCUMENT_BLOB, got {other:?}"),
        }
    }

    #[test]
    fn test_blob_selected_with_invalid_body_is_a_codec_error() {
        let mut ev = event("pdf");
        ev.body = "%%%%".to_string();

        assert!(translate_bus_event(BusChannel::BlobSelected, &ev).is_err());
    }

    #[test]
    fn test_save_document_requests_a_save() {
        let action =
            translate_viewer_envelope(InboundEnvelope::SaveDocument(json!({"a": 1})), None);
        assert_eq!(action, ViewerAction::Save(json!({"a": 1})));
    }

    #[test]
    fn test_tab_active_without_prior_save_is_ignored() {
        let action = translate_viewer_envelope(InboundEnvelope::TabActive, None);
        assert_eq!(action, ViewerAction::Ignore);
    }

    #[test]
    fn test_tab_active_re_sends_last_ack() {
        let ack = SaveAck(json!({"id": "S1"}));

        let action = translate_viewer_envelope(InboundEnvelope::TabActive, Some(&ack));

        assert_eq!(
            action,
            ViewerAction::Reply(OutboundEnvelope::DocumentSaved(ack))
        );
    }

    #[test]
    fn test_initial_document_envelope_keeps_link() {
        let doc = InitialDocument {
            link_or_blob: LinkOrBlob::Link("https://x/y.pdf".to_string()),
            extension: "pdf".to_string(),
            filename: "y.pdf".to_string(),
            document_id: "A2".to_string(),
        };

        let env = initial_document_envelope(doc);

        let json = serde_json::to_value(env).unwrap();
        assert_eq!(json["payload"]["linkblob"], "https://x/y.pdf");
    }

    #[test]
    fn test_save_outcome_envelopes() {
        let ok: Result<SaveAck, SaveError> = Ok(SaveAck(json!({"id": "S1"})));
        assert_eq!(save_outcome_envelope(&ok).kind(), "DOCUMENT_SAVED");

        let err: Result<SaveAck, SaveError> = Err(SaveError::Backend {
            owner_id: "R1".to_string(),
            source: BackendError::Rejected("locked".to_string()),
        });
        match save_outcome_envelope(&err) {
            OutboundEnvelope::DocumentSaveFailed(p) => assert!(p.message.contains("locked")),
            other => panic!("expected DOCUMENT_SAVE_FAILED, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_failure_envelope_carries_reason() {
        let err = FetchError::Backend {
            owner_id: "R1".to_string(),
            source: BackendError::NotFound("R1".to_string()),
        };

        match fetch_failure_envelope(&err) {
            OutboundEnvelope::DocumentLoadFailed(p) => {
                assert!(p.message.contains("no document found for record R1"))
            }
            other => panic!("expected DOCUMENT_LOAD_FAILED, got {other:?}"),
        }
    }

    #[test]
    fn test_received_message_summary_format() {
        assert_eq!(
            received_message_summary(&event("pdf")),
            "Links to be loaded: UERG\nSent From: R1"
        );
    }
}
