//! Session scenarios against the real in-process bus and listener registry,
//! with a recording backend double.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;
use tokio::time::timeout;

use docview_bridge::application::{
    surface_channel, BackendError, BridgeHost, BusPublisher, DocumentBackend,
    RemoteOperationInvoker, SessionDeps, SurfaceReceiver,
};
use docview_bridge::domain::{BoundaryMessage, PendingPolicy, SessionError, SessionId};
use docview_bridge::infrastructure::{BoundaryListenerRegistry, InProcessBus};
use docview_core::{BusChannel, FetchedAttachment, InboundBusEvent, OutboundEnvelope, SaveAck};

// ── Test doubles ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingBackend {
    fetches: Mutex<Vec<String>>,
    saves: Mutex<Vec<(String, String)>>,
    /// When set, saves block until notified.
    save_gate: Option<Arc<Notify>>,
}

impl RecordingBackend {
    fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentBackend for RecordingBackend {
    async fn get_first_attachment(&self, owner_id: &str) -> Result<FetchedAttachment, BackendError> {
        self.fetches.lock().unwrap().push(owner_id.to_string());
        Ok(FetchedAttachment {
            s3link: None,
            body: Some("UERG".to_string()),
            extension: ".pdf".to_string(),
            name: "x.pdf".to_string(),
            id: "A1".to_string(),
        })
    }

    async fn save_document(&self, json: String, owner_id: &str) -> Result<SaveAck, BackendError> {
        self.saves
            .lock()
            .unwrap()
            .push((json, owner_id.to_string()));
        if let Some(gate) = &self.save_gate {
            gate.notified().await;
        }
        Ok(SaveAck(json!({"id": "S1"})))
    }
}

struct Fixture {
    host: BridgeHost,
    bus: Arc<InProcessBus>,
    listeners: Arc<BoundaryListenerRegistry>,
    backend: Arc<RecordingBackend>,
}

impl Fixture {
    fn new(backend: RecordingBackend) -> Self {
        let bus = Arc::new(InProcessBus::new());
        let listeners = Arc::new(BoundaryListenerRegistry::new());
        let backend = Arc::new(backend);
        let deps = SessionDeps {
            bus: bus.clone(),
            listeners: listeners.clone(),
            invoker: RemoteOperationInvoker::new(backend.clone()),
            pending_policy: PendingPolicy::KeepLatest,
        };
        Self {
            host: BridgeHost::new(deps, bus.clone()),
            bus,
            listeners,
            backend,
        }
    }

    /// Mounts a session for R1, attaches a viewer, and drains the initial
    /// `OPEN_BLOB_OR_LINK`.
    async fn ready_session(&self) -> (SessionId, SurfaceReceiver) {
        let id = self.host.mount("R1").unwrap().id();
        let (surface, mut rx) = surface_channel();
        self.host.attach_viewer(id, surface).await.unwrap();
        assert_eq!(next(&mut rx).await.kind(), "OPEN_BLOB_OR_LINK");
        (id, rx)
    }
}

fn notification() -> InboundBusEvent {
    InboundBusEvent {
        body: "UERG".to_string(),
        file_extension: ".pdf".to_string(),
        record_id: "R1".to_string(),
        title: "doc".to_string(),
    }
}

async fn next(rx: &mut SurfaceReceiver) -> OutboundEnvelope {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for an envelope")
        .expect("surface closed")
}

async fn assert_quiet(rx: &mut SurfaceReceiver) {
    if let Ok(Some(envelope)) = timeout(Duration::from_millis(150), rx.recv()).await {
        panic!("unexpected envelope {envelope:?}");
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_notification_before_ready_is_delivered_exactly_once() {
    // Arrange
    let fx = Fixture::new(RecordingBackend::default());
    let id = fx.host.mount("R1").unwrap().id();

    // Act: publish before any viewer exists, then attach one
    assert_eq!(fx.host.publish(BusChannel::ViewerNotifications, &notification()), 1);
    let snapshot = fx.host.get(id).unwrap().snapshot().await.unwrap();
    assert!(snapshot.has_pending_envelope);

    let (surface, mut rx) = surface_channel();
    fx.host.attach_viewer(id, surface).await.unwrap();

    // Assert: the notification comes first, then the initial document
    match next(&mut rx).await {
        OutboundEnvelope::LmsReceived(p) => {
            assert_eq!(p.message, "UERG");
            assert_eq!(p.filename, "doc.pdf");
            assert_eq!(p.source, "R1");
        }
        other => panic!("expected LMS_RECEIVED, got {other:?}"),
    }
    assert_eq!(next(&mut rx).await.kind(), "OPEN_BLOB_OR_LINK");
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn test_pre_ready_events_on_both_channels_are_all_delivered() {
    // Arrange
    let fx = Fixture::new(RecordingBackend::default());
    let id = fx.host.mount("R1").unwrap().id();

    // Act: a notification, then a blob selection, both before the viewer exists
    fx.host.publish(BusChannel::ViewerNotifications, &notification());
    fx.host.publish(BusChannel::BlobSelected, &notification());
    let (surface, mut rx) = surface_channel();
    fx.host.attach_viewer(id, surface).await.unwrap();

    // Assert: the blob selection does not displace the notification
    assert_eq!(next(&mut rx).await.kind(), "LMS_RECEIVED");
    assert_eq!(next(&mut rx).await.kind(), "OPEN_DOCUMENT_BLOB");
    assert_eq!(next(&mut rx).await.kind(), "OPEN_BLOB_OR_LINK");
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn test_blob_selected_after_ready_opens_decoded_blob() {
    let fx = Fixture::new(RecordingBackend::default());
    let (_id, mut rx) = fx.ready_session().await;

    fx.host.publish(BusChannel::BlobSelected, &notification());

    match next(&mut rx).await {
        OutboundEnvelope::OpenDocumentBlob(p) => {
            assert_eq!(p.blob.data, b"PDF".to_vec());
            assert_eq!(p.blob.mime_type.as_deref(), Some("application/pdf"));
            assert_eq!(p.filename, "doc.pdf");
        }
        other => panic!("expected OPEN_DOCUMENT_BLOB, got {other:?}"),
    }
}

#[tokio::test]
async fn test_save_document_is_acknowledged_exactly_once() {
    // Arrange
    let fx = Fixture::new(RecordingBackend::default());
    let (id, mut rx) = fx.ready_session().await;

    // Act
    let delivered = fx.host.deliver_boundary(
        id,
        BoundaryMessage::trusted(None, json!({"type": "SAVE_DOCUMENT", "payload": {"a": 1}})),
    );

    // Assert
    assert!(delivered);
    assert_eq!(
        next(&mut rx).await,
        OutboundEnvelope::DocumentSaved(SaveAck(json!({"id": "S1"})))
    );
    assert_quiet(&mut rx).await;
    assert_eq!(
        *fx.backend.saves.lock().unwrap(),
        vec![(r#"{"a":1}"#.to_string(), "R1".to_string())]
    );
}

#[tokio::test]
async fn test_tab_active_without_prior_save_posts_nothing() {
    let fx = Fixture::new(RecordingBackend::default());
    let (id, mut rx) = fx.ready_session().await;

    fx.host
        .deliver_boundary(id, BoundaryMessage::trusted(None, json!({"type": "TAB_ACTIVE"})));

    assert_quiet(&mut rx).await;
    assert_eq!(fx.backend.save_count(), 0);
}

#[tokio::test]
async fn test_untrusted_save_never_reaches_backend() {
    let fx = Fixture::new(RecordingBackend::default());
    let (id, mut rx) = fx.ready_session().await;

    fx.host.deliver_boundary(
        id,
        BoundaryMessage::untrusted(
            Some("https://evil.example".to_string()),
            json!({"type": "SAVE_DOCUMENT", "payload": {"a": 1}}),
        ),
    );

    assert_quiet(&mut rx).await;
    assert_eq!(fx.backend.save_count(), 0);
}

#[tokio::test]
async fn test_malformed_viewer_message_is_ignored() {
    let fx = Fixture::new(RecordingBackend::default());
    let (id, mut rx) = fx.ready_session().await;

    fx.host
        .deliver_boundary(id, BoundaryMessage::trusted(None, json!({"type": "SAVE_DOCUMENT"})));
    fx.host
        .deliver_boundary(id, BoundaryMessage::trusted(None, json!({"type": "REFORMAT_DISK"})));

    assert_quiet(&mut rx).await;
    assert_eq!(fx.backend.save_count(), 0);
}

#[tokio::test]
async fn test_unmount_releases_every_registration() {
    // Arrange
    let fx = Fixture::new(RecordingBackend::default());
    let handle = fx.host.mount("R1").unwrap();
    assert_eq!(fx.bus.subscription_count(), 2);
    assert_eq!(fx.listeners.listener_count(), 1);

    // Act: unmount, then unmount again
    fx.host.unmount(handle.id()).unwrap();
    handle.unmount();
    wait_until(|| handle.is_closed()).await;

    // Assert
    assert_eq!(fx.bus.subscription_count(), 0);
    assert_eq!(fx.bus.live_contexts(), 0);
    assert_eq!(fx.listeners.listener_count(), 0);
    assert_eq!(fx.bus.publish(BusChannel::ViewerNotifications, &notification()), 0);
    assert!(matches!(
        fx.host.unmount(handle.id()),
        Err(SessionError::UnknownSession(_))
    ));
}

#[tokio::test]
async fn test_save_completing_after_unmount_is_discarded() {
    // Arrange: a backend whose save blocks until released
    let gate = Arc::new(Notify::new());
    let fx = Fixture::new(RecordingBackend {
        save_gate: Some(gate.clone()),
        ..RecordingBackend::default()
    });
    let (id, mut rx) = fx.ready_session().await;
    let handle = fx.host.get(id).unwrap();

    fx.host.deliver_boundary(
        id,
        BoundaryMessage::trusted(None, json!({"type": "SAVE_DOCUMENT", "payload": {"a": 1}})),
    );
    let backend = fx.backend.clone();
    wait_until(|| backend.save_count() == 1).await;

    // Act: unmount while the save is in flight, then let it finish
    fx.host.unmount(id).unwrap();
    wait_until(|| handle.is_closed()).await;
    gate.notify_one();

    // Assert: the surface closes without ever seeing DOCUMENT_SAVED
    let rest = timeout(Duration::from_secs(2), async {
        let mut rest = Vec::new();
        while let Some(envelope) = rx.recv().await {
            rest.push(envelope);
        }
        rest
    })
    .await
    .expect("surface should close after unmount");
    assert!(rest.is_empty(), "late envelopes: {rest:?}");
}

#[tokio::test]
async fn test_second_viewer_is_refused() {
    let fx = Fixture::new(RecordingBackend::default());
    let (id, _rx) = fx.ready_session().await;

    let (surface, _rx2) = surface_channel();
    let result = fx.host.attach_viewer(id, surface).await;

    assert!(matches!(result, Err(SessionError::InvariantViolation(_))));
}

#[tokio::test]
async fn test_close_document_reaches_ready_viewer() {
    let fx = Fixture::new(RecordingBackend::default());
    let (id, mut rx) = fx.ready_session().await;

    fx.host.get(id).unwrap().close_document().unwrap();

    assert_eq!(next(&mut rx).await, OutboundEnvelope::CloseDocument);
}

#[tokio::test]
async fn test_sessions_only_see_their_own_viewer_messages() {
    let fx = Fixture::new(RecordingBackend::default());
    let (a, mut rx_a) = fx.ready_session().await;
    let (_b, mut rx_b) = fx.ready_session().await;

    fx.host.deliver_boundary(
        a,
        BoundaryMessage::trusted(None, json!({"type": "SAVE_DOCUMENT", "payload": {}})),
    );

    assert_eq!(next(&mut rx_a).await.kind(), "DOCUMENT_SAVED");
    assert_quiet(&mut rx_b).await;
}
