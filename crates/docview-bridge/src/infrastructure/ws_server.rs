//! WebSocket server: accept loop, request routing, and per-connection tasks.
//!
//! One listener serves two kinds of connections, told apart by the request
//! path of the WebSocket handshake:
//!
//! | Path                  | Peer             | Frames                          |
//! |-----------------------|------------------|---------------------------------|
//! | `/host`               | host application | `HostCommand` in, `HostReply` out |
//! | `/viewer/<sessionId>` | embedded viewer  | envelopes both ways             |
//!
//! A viewer connection *is* the session's surface: connecting signals
//! readiness, the session's outbound queue is drained onto the socket, and
//! inbound frames are dispatched through the boundary listener registry.
//! Frames are trusted only when the handshake `Origin` is configured as
//! trusted.
//!
//! Shutdown is triggered by a shared `AtomicBool` that is cleared by the
//! Ctrl+C handler in `main.rs`.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        protocol::{frame::coding::CloseCode, CloseFrame},
        Error as WsError, Message as WsMessage,
    },
    WebSocketStream,
};
use tracing::{debug, error, info, warn};

use docview_core::{HostCommand, HostReply};

use crate::application::host::BridgeHost;
use crate::application::invoker::RemoteOperationInvoker;
use crate::application::session::SessionDeps;
use crate::application::surface::surface_channel;
use crate::domain::boundary::BoundaryMessage;
use crate::domain::config::BridgeConfig;
use crate::domain::session::SessionId;
use crate::infrastructure::bus::InProcessBus;
use crate::infrastructure::listeners::BoundaryListenerRegistry;
use crate::infrastructure::storage::FsDocumentStore;

/// Where a WebSocket connection is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Host,
    Viewer(SessionId),
}

/// Resolves a handshake request path.  Returns `None` for unknown paths.
pub fn parse_route(path: &str) -> Option<Route> {
    let path = path.split('?').next().unwrap_or_default().trim_end_matches('/');
    if path == "/host" {
        return Some(Route::Host);
    }
    path.strip_prefix("/viewer/")
        .and_then(|id| id.parse().ok())
        .map(Route::Viewer)
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Wires the in-process bus, listener registry, and file-system backend into
/// a [`BridgeHost`].
pub fn build_host(config: &BridgeConfig) -> Arc<BridgeHost> {
    let bus = Arc::new(InProcessBus::new());
    let deps = SessionDeps {
        bus: bus.clone(),
        listeners: Arc::new(BoundaryListenerRegistry::new()),
        invoker: RemoteOperationInvoker::new(Arc::new(FsDocumentStore::new(
            config.storage_root.clone(),
        ))),
        pending_policy: config.pending_policy,
    };
    Arc::new(BridgeHost::new(deps, bus))
}

/// Binds `config.ws_bind_addr` and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(config: BridgeConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("document bridge listening on {}", config.ws_bind_addr);

    let host = build_host(&config);
    serve(listener, host, Arc::new(config), running).await;
    Ok(())
}

/// Accept loop over an already bound listener.
///
/// Every session still mounted when the loop exits is unmounted.
pub async fn serve(
    listener: TcpListener,
    host: Arc<BridgeHost>,
    config: Arc<BridgeConfig>,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the shutdown flag is polled even when idle.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let host = Arc::clone(&host);
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, host, config).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    host.unmount_all();
}

// ── Per-connection handlers ───────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    host: Arc<BridgeHost>,
    config: Arc<BridgeConfig>,
) {
    match run_connection(stream, peer_addr, host, config).await {
        Ok(()) => info!("connection {peer_addr} closed normally"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    host: Arc<BridgeHost>,
    config: Arc<BridgeConfig>,
) -> anyhow::Result<()> {
    let mut path = String::new();
    let mut origin = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        path = req.uri().path().to_string();
        origin = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(resp)
    };

    let mut ws = accept_hdr_async(stream, callback)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    match parse_route(&path) {
        Some(Route::Host) => {
            info!("host channel established: {peer_addr}");
            run_host_channel(ws, peer_addr, host).await
        }
        Some(Route::Viewer(id)) => {
            info!("viewer channel for session {id} established: {peer_addr} (origin {origin:?})");
            let trusted = config.is_trusted_origin(origin.as_deref());
            run_viewer_channel(ws, id, origin, trusted, host).await
        }
        None => {
            reject(&mut ws, format!("unknown path '{path}'")).await;
            anyhow::bail!("unknown path '{path}'")
        }
    }
}

/// Executes host commands until the host disconnects, then unmounts every
/// session this connection mounted.
async fn run_host_channel(
    ws: WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    host: Arc<BridgeHost>,
) -> anyhow::Result<()> {
    let mut mounted = Vec::new();
    let result = host_command_loop(ws, peer_addr, &host, &mut mounted).await;

    for id in mounted {
        if host.unmount(id).is_ok() {
            info!("session {id}: unmounted because host {peer_addr} disconnected");
        }
    }
    result
}

async fn host_command_loop(
    ws: WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    host: &BridgeHost,
    mounted: &mut Vec<SessionId>,
) -> anyhow::Result<()> {
    let (mut ws_tx, mut ws_rx) = ws.split();

    while let Some(frame) = ws_rx.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(WsMessage::Binary(_)) => {
                warn!("host {peer_addr}: unexpected binary frame (ignored)");
                continue;
            }
            Ok(_) => continue,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => break,
            Err(e) => return Err(e).context("host channel read failed"),
        };

        let reply = match serde_json::from_str::<HostCommand>(&text) {
            Ok(command) => {
                debug!("host {peer_addr} → bridge: {}", command.kind());
                let reply = host.execute(command);
                if let HostReply::Mounted { session_id } = &reply {
                    if let Ok(id) = session_id.parse() {
                        mounted.push(id);
                    }
                }
                reply
            }
            Err(e) => {
                warn!("host {peer_addr}: invalid command: {e}");
                HostReply::Error {
                    message: format!("invalid command: {e}"),
                }
            }
        };

        let json = serde_json::to_string(&reply).context("serializing host reply")?;
        ws_tx
            .send(WsMessage::Text(json))
            .await
            .context("host channel write failed")?;
    }

    Ok(())
}

/// Runs a viewer connection as the session's surface.
async fn run_viewer_channel(
    mut ws: WebSocketStream<TcpStream>,
    id: SessionId,
    origin: Option<String>,
    trusted: bool,
    host: Arc<BridgeHost>,
) -> anyhow::Result<()> {
    let (surface, mut surface_rx) = surface_channel();
    if let Err(e) = host.attach_viewer(id, surface).await {
        reject(&mut ws, e.to_string()).await;
        return Err(e).with_context(|| format!("viewer for session {id} refused"));
    }

    let (mut ws_tx, mut ws_rx) = ws.split();

    // Session → viewer, in queue order.  Ends when the session is unmounted.
    let mut writer = tokio::spawn(async move {
        while let Some(envelope) = surface_rx.recv().await {
            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    error!("session {id}: failed to serialize {}: {e}", envelope.kind());
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                debug!("session {id}: viewer send failed (viewer disconnected)");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Viewer → session, through the boundary listener.
    let reader = async move {
        while let Some(frame) = ws_rx.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("session {id}: viewer read ended: {e}");
                    break;
                }
            };
            let data: Value = match serde_json::from_str(&text) {
                Ok(data) => data,
                Err(e) => {
                    warn!("session {id}: viewer sent invalid JSON: {e}");
                    continue;
                }
            };
            let message = if trusted {
                BoundaryMessage::trusted(origin.clone(), data)
            } else {
                BoundaryMessage::untrusted(origin.clone(), data)
            };
            if !host.deliver_boundary(id, message) {
                debug!("session {id}: no longer mounted; closing viewer");
                break;
            }
        }
    };

    tokio::select! {
        _ = &mut writer => debug!("session {id}: viewer writer ended"),
        _ = reader => debug!("session {id}: viewer reader ended"),
    }
    writer.abort();
    Ok(())
}

async fn reject(ws: &mut WebSocketStream<TcpStream>, reason: String) {
    let frame = CloseFrame {
        code: CloseCode::Policy,
        reason: reason.into(),
    };
    if let Err(e) = ws.close(Some(frame)).await {
        debug!("close after rejection failed: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_host() {
        assert_eq!(parse_route("/host"), Some(Route::Host));
        assert_eq!(parse_route("/host/"), Some(Route::Host));
    }

    #[test]
    fn test_parse_route_viewer_with_session_id() {
        let id = SessionId::new();
        assert_eq!(parse_route(&format!("/viewer/{id}")), Some(Route::Viewer(id)));
    }

    #[test]
    fn test_parse_route_ignores_query() {
        let id = SessionId::new();
        assert_eq!(
            parse_route(&format!("/viewer/{id}?t=1")),
            Some(Route::Viewer(id))
        );
    }

    #[test]
    fn test_parse_route_rejects_bad_session_id() {
        assert_eq!(parse_route("/viewer/not-a-uuid"), None);
    }

    #[test]
    fn test_parse_route_rejects_unknown_path() {
        assert_eq!(parse_route("/"), None);
        assert_eq!(parse_route("/admin"), None);
    }

    #[tokio::test]
    async fn test_build_host_starts_empty() {
        let host = build_host(&BridgeConfig::default());
        assert_eq!(host.session_count(), 0);
    }
}
