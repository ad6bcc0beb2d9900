//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built from defaults, then an optional TOML file, then CLI arguments
//! (see `main.rs`).  Keeping it a plain struct means tests can construct one
//! directly without touching the environment.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a session does with bus-originated envelopes that arrive before its
/// viewer surface is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingPolicy {
    /// Hold the most recent envelope and deliver it once the surface is
    /// ready.  Older pending envelopes are replaced.
    #[default]
    KeepLatest,
    /// Discard the envelope with a logged diagnostic.
    Drop,
}

impl fmt::Display for PendingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PendingPolicy::KeepLatest => "keep-latest",
            PendingPolicy::Drop => "drop",
        })
    }
}

impl FromStr for PendingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep-latest" => Ok(PendingPolicy::KeepLatest),
            "drop" => Ok(PendingPolicy::Drop),
            other => Err(format!(
                "unknown pending policy '{other}' (expected 'keep-latest' or 'drop')"
            )),
        }
    }
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use docview_bridge::domain::{BridgeConfig, PendingPolicy};
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 24810);
/// assert_eq!(cfg.pending_policy, PendingPolicy::KeepLatest);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Address the WebSocket server (host and viewer channels) binds to.
    pub ws_bind_addr: SocketAddr,

    /// `Origin` header values whose viewer frames are trusted.
    ///
    /// An empty list trusts every origin, which is only sensible for local
    /// development.
    pub trusted_origins: Vec<String>,

    /// Handling of bus envelopes raised before the viewer is ready.
    pub pending_policy: PendingPolicy,

    /// Root directory of the file-system document store.
    pub storage_root: PathBuf,

    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl BridgeConfig {
    /// Returns `true` if a viewer connecting from `origin` may be trusted.
    pub fn is_trusted_origin(&self, origin: Option<&str>) -> bool {
        if self.trusted_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.trusted_origins.iter().any(|t| t == o))
    }
}

impl Default for BridgeConfig {
    /// | Field           | Default             |
    /// |-----------------|---------------------|
    /// | ws_bind_addr    | `127.0.0.1:24810`   |
    /// | trusted_origins | empty (trust all)   |
    /// | pending_policy  | `keep-latest`       |
    /// | storage_root    | `./documents`       |
    /// | log_level       | `info`              |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([127, 0, 0, 1], 24810)),
            trusted_origins: Vec::new(),
            pending_policy: PendingPolicy::KeepLatest,
            storage_root: PathBuf::from("documents"),
            log_level: "info".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
