//! Optional TOML configuration file.
//!
//! Any field may be omitted; omitted fields take the same defaults as
//! [`BridgeConfig::default`].  Example:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:24810"
//! log_level = "debug"
//!
//! [viewer]
//! trusted_origins = ["https://viewer.example"]
//! pending_policy = "keep-latest"
//!
//! [storage]
//! root = "/var/lib/docview"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{BridgeConfig, PendingPolicy};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub viewer: ViewerSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Address the WebSocket server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewerSection {
    /// Viewer origins whose messages are trusted.  Empty trusts all.
    #[serde(default)]
    pub trusted_origins: Vec<String>,
    #[serde(default)]
    pub pending_policy: PendingPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSection {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> SocketAddr {
    BridgeConfig::default().ws_bind_addr
}
fn default_log_level() -> String {
    BridgeConfig::default().log_level
}
fn default_storage_root() -> PathBuf {
    BridgeConfig::default().storage_root
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl From<FileConfig> for BridgeConfig {
    fn from(file: FileConfig) -> Self {
        BridgeConfig {
            ws_bind_addr: file.server.bind_address,
            trusted_origins: file.viewer.trusted_origins,
            pending_policy: file.viewer.pending_policy,
            storage_root: file.storage.root,
            log_level: file.server.log_level,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has the
/// wrong type.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Reads and parses the configuration file at `path`.
///
/// Unlike a platform default location, an explicitly named file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
