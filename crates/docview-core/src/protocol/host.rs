//! Host command protocol.
//!
//! The hosting application drives the bridge over its own channel: it mounts
//! and unmounts viewing sessions, publishes bus events, and calls the two
//! public entry points `OPEN_DOCUMENT` / `CLOSE_DOCUMENT`.
//!
//! ```json
//! {"type":"MOUNT","payload":{"recordId":"R1"}}
//! {"type":"PUBLISH","payload":{"channel":"blob-selected","event":{...}}}
//! {"type":"CLOSE_DOCUMENT","payload":{"sessionId":"..."}}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::document::{BusChannel, InboundBusEvent};

/// Commands the host sends to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostCommand {
    /// Create a viewing session owned by `record_id`.
    #[serde(rename_all = "camelCase")]
    Mount { record_id: String },

    /// Publish an event on the internal bus.
    Publish {
        channel: BusChannel,
        event: InboundBusEvent,
    },

    /// Ask a session to (re)load its owner's document.
    #[serde(rename_all = "camelCase")]
    OpenDocument { session_id: String },

    /// Ask a session's viewer to close its document.
    #[serde(rename_all = "camelCase")]
    CloseDocument { session_id: String },

    /// Tear a session down.
    #[serde(rename_all = "camelCase")]
    Unmount { session_id: String },
}

impl HostCommand {
    /// Returns the wire discriminant, for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            HostCommand::Mount { .. } => "MOUNT",
            HostCommand::Publish { .. } => "PUBLISH",
            HostCommand::OpenDocument { .. } => "OPEN_DOCUMENT",
            HostCommand::CloseDocument { .. } => "CLOSE_DOCUMENT",
            HostCommand::Unmount { .. } => "UNMOUNT",
        }
    }
}

/// Replies the bridge sends back to the host, one per command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostReply {
    #[serde(rename_all = "camelCase")]
    Mounted { session_id: String },

    /// Number of live subscriptions the event was delivered to.
    Published { deliveries: usize },

    /// The command was accepted by the session.
    Accepted,

    Unmounted,

    Error { message: String },
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mount_uses_camel_case_record_id() {
        let cmd: HostCommand =
            serde_json::from_value(json!({"type": "MOUNT", "payload": {"recordId": "R1"}}))
                .unwrap();
        assert_eq!(
            cmd,
            HostCommand::Mount {
                record_id: "R1".to_string()
            }
        );
    }

    #[test]
    fn test_publish_parses_channel_and_event() {
        let cmd: HostCommand = serde_json::from_value(json!({
            "type": "PUBLISH",
            "payload": {
                "channel": "blob-selected",
                "event": {"body": "UERG", "fileExtension": "pdf", "recordId": "R1", "title": "doc"}
            }
        }))
        .unwrap();

        match cmd {
            HostCommand::Publish { channel, event } => {
                assert_eq!(channel, BusChannel::BlobSelected);
                assert_eq!(event.title, "doc");
            }
            other => panic!("expected Publish, got {other:?}"),
        }
    }

    #[test]
    fn test_mounted_reply_wire_shape() {
        let json = serde_json::to_value(HostReply::Mounted {
            session_id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"type": "MOUNTED", "payload": {"sessionId": "abc"}}));
    }

    #[test]
    fn test_unknown_command_fails_to_parse() {
        let result = serde_json::from_value::<HostCommand>(json!({"type": "REBOOT"}));
        assert!(result.is_err());
    }
}
