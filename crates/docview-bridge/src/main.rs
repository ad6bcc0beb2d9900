//! Document viewer bridge: entry point.
//!
//! This binary accepts WebSocket connections from a hosting application
//! (`/host`) and from embedded document viewers (`/viewer/<sessionId>`), and
//! runs one bridge session per mounted viewer.
//!
//! # Usage
//!
//! ```text
//! docview-bridge [OPTIONS]
//!
//! Options:
//!   --config          <PATH>     Optional TOML configuration file
//!   --ws-bind         <ADDR>     IP address to bind [default: 127.0.0.1]
//!   --ws-port         <PORT>     WebSocket listener port [default: 24810]
//!   --trusted-origin  <ORIGIN>   Trusted viewer origin (repeatable)
//!   --pending-policy  <POLICY>   keep-latest | drop [default: keep-latest]
//!   --storage-root    <PATH>     Document store root [default: documents]
//! ```
//!
//! # Configuration precedence
//!
//! Built-in defaults, then the `--config` file, then CLI flags and
//! environment variables.  CLI args take precedence over the environment.
//!
//! | Variable                   | Description                      |
//! |----------------------------|----------------------------------|
//! | `DOCVIEW_CONFIG`           | Configuration file path          |
//! | `DOCVIEW_WS_BIND`          | WebSocket bind IP                |
//! | `DOCVIEW_WS_PORT`          | WebSocket listener port          |
//! | `DOCVIEW_TRUSTED_ORIGINS`  | Comma-separated trusted origins  |
//! | `DOCVIEW_PENDING_POLICY`   | `keep-latest` or `drop`          |
//! | `DOCVIEW_STORAGE_ROOT`     | Document store root              |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docview_bridge::domain::{BridgeConfig, PendingPolicy};
use docview_bridge::infrastructure::{load_config, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Document viewer bridge.
///
/// Every option is optional; an option left unset keeps the value from the
/// configuration file, or the built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "docview-bridge",
    about = "Session bridge between a host application and embedded document viewers",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "DOCVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket server to.
    #[arg(long, env = "DOCVIEW_WS_BIND")]
    ws_bind: Option<IpAddr>,

    /// TCP port for the WebSocket server to listen on.
    #[arg(long, env = "DOCVIEW_WS_PORT")]
    ws_port: Option<u16>,

    /// Viewer origin whose messages are trusted.  May be repeated.
    ///
    /// With no trusted origins configured anywhere, every origin is trusted.
    #[arg(long = "trusted-origin", env = "DOCVIEW_TRUSTED_ORIGINS", value_delimiter = ',')]
    trusted_origins: Vec<String>,

    /// What to do with bus notifications that arrive before the viewer is
    /// ready: `keep-latest` or `drop`.
    #[arg(long, env = "DOCVIEW_PENDING_POLICY")]
    pending_policy: Option<PendingPolicy>,

    /// Root directory of the file-system document store.
    #[arg(long, env = "DOCVIEW_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,
}

impl Cli {
    /// Resolves the final [`BridgeConfig`]: defaults, then the config file,
    /// then these arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?
                .into(),
            None => BridgeConfig::default(),
        };
        Ok(self.apply(base))
    }

    fn apply(self, mut config: BridgeConfig) -> BridgeConfig {
        let ip = self.ws_bind.unwrap_or(config.ws_bind_addr.ip());
        let port = self.ws_port.unwrap_or(config.ws_bind_addr.port());
        config.ws_bind_addr = SocketAddr::new(ip, port);

        if !self.trusted_origins.is_empty() {
            config.trusted_origins = self.trusted_origins;
        }
        if let Some(policy) = self.pending_policy {
            config.pending_policy = policy;
        }
        if let Some(root) = self.storage_root {
            config.storage_root = root;
        }
        config
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_bridge_config()?;

    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "document bridge starting: ws={}, storage={}, pending={}, trusted origins={}",
        config.ws_bind_addr,
        config.storage_root.display(),
        config.pending_policy,
        if config.trusted_origins.is_empty() {
            "any".to_string()
        } else {
            config.trusted_origins.join(",")
        }
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("document bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
