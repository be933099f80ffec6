// ── Push-event topics and typed parsing ──
//
// The backend pushes notifications on a fixed set of named topics.
// Payload shapes vary per topic; `PanelEvent::parse` turns a raw
// `(topic, payload)` pair into a typed event, dropping anything
// malformed rather than crashing the bridge that consumes it.

use serde_json::Value;

use crate::wire::ServerPorts;

/// Topic names the backend publishes on.
pub mod topic {
    /// Backend finished initializing; payload carries the allocated ports.
    pub const SERVERS_READY: &str = "servers-ready";
    /// An upstream producer started pushing into the ingest endpoint.
    pub const STREAM_PREVIEW_ACTIVE: &str = "stream-preview-active";
    /// The upstream producer stopped.
    pub const STREAM_PREVIEW_ENDED: &str = "stream-preview-ended";
    /// A relay session started for a target; payload is the target id.
    pub const RELAY_ACTIVE: &str = "relay-active";
    /// A relay session ended for a target; payload is the target id.
    pub const RELAY_ENDED: &str = "relay-ended";
    /// A relay attempt failed; payload is `[id, message]`.
    pub const RELAY_FAILED: &str = "relay-failed";

    /// Every topic the panel subscribes to.
    pub const ALL: [&str; 6] = [
        SERVERS_READY,
        STREAM_PREVIEW_ACTIVE,
        STREAM_PREVIEW_ENDED,
        RELAY_ACTIVE,
        RELAY_ENDED,
        RELAY_FAILED,
    ];
}

/// A typed push notification from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// Backend is ready; carries the allocated ports directly, so no
    /// follow-up ports fetch is needed on this path.
    ServersReady(ServerPorts),
    StreamPreviewActive,
    StreamPreviewEnded,
    RelayActive { id: String },
    RelayEnded { id: String },
    RelayFailed { id: String, message: String },
}

impl PanelEvent {
    /// Parse a raw `(topic, payload)` pair into a typed event.
    ///
    /// Returns `None` for unknown topics and for malformed payloads —
    /// a bad push must never take down the consumer loop.
    pub fn parse(topic_name: &str, payload: &Value) -> Option<Self> {
        match topic_name {
            topic::SERVERS_READY => {
                let ports: ServerPorts = serde_json::from_value(payload.clone())
                    .map_err(|e| {
                        tracing::debug!(error = %e, "malformed servers-ready payload");
                    })
                    .ok()?;
                Some(Self::ServersReady(ports))
            }
            topic::STREAM_PREVIEW_ACTIVE => Some(Self::StreamPreviewActive),
            topic::STREAM_PREVIEW_ENDED => Some(Self::StreamPreviewEnded),
            topic::RELAY_ACTIVE => payload_id(payload).map(|id| Self::RelayActive { id }),
            topic::RELAY_ENDED => payload_id(payload).map(|id| Self::RelayEnded { id }),
            topic::RELAY_FAILED => {
                // Tuple payload: [id, errorMessage]
                let pair = payload.as_array()?;
                let id = value_id(pair.first()?)?;
                let message = pair.get(1)?.as_str()?.to_owned();
                Some(Self::RelayFailed { id, message })
            }
            _ => {
                tracing::debug!(topic = topic_name, "ignoring unknown event topic");
                None
            }
        }
    }
}

/// Extract a bare target id from a payload that is just the id value.
fn payload_id(payload: &Value) -> Option<String> {
    let id = value_id(payload);
    if id.is_none() {
        tracing::debug!("event payload is not a target id");
    }
    id
}

/// Ids are opaque strings to the panel; the backend's integer row id
/// form is accepted too.
fn value_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_servers_ready() {
        let payload = json!({ "rtmp_port": 1935, "file_port": 8080 });
        let event = PanelEvent::parse(topic::SERVERS_READY, &payload).unwrap();
        assert_eq!(
            event,
            PanelEvent::ServersReady(ServerPorts {
                rtmp_port: 1935,
                file_port: 8080,
            })
        );
    }

    #[test]
    fn parse_preview_events_ignore_payload() {
        let event = PanelEvent::parse(topic::STREAM_PREVIEW_ACTIVE, &Value::Null).unwrap();
        assert_eq!(event, PanelEvent::StreamPreviewActive);

        let event = PanelEvent::parse(topic::STREAM_PREVIEW_ENDED, &json!(42)).unwrap();
        assert_eq!(event, PanelEvent::StreamPreviewEnded);
    }

    #[test]
    fn parse_relay_active_id() {
        let event = PanelEvent::parse(topic::RELAY_ACTIVE, &json!("target-3")).unwrap();
        assert_eq!(
            event,
            PanelEvent::RelayActive {
                id: "target-3".into()
            }
        );
    }

    #[test]
    fn parse_relay_failed_tuple() {
        let payload = json!(["target-3", "connection refused"]);
        let event = PanelEvent::parse(topic::RELAY_FAILED, &payload).unwrap();
        assert_eq!(
            event,
            PanelEvent::RelayFailed {
                id: "target-3".into(),
                message: "connection refused".into(),
            }
        );
    }

    #[test]
    fn parse_numeric_relay_ids() {
        let event = PanelEvent::parse(topic::RELAY_ENDED, &json!(7)).unwrap();
        assert_eq!(event, PanelEvent::RelayEnded { id: "7".into() });

        let event = PanelEvent::parse(topic::RELAY_FAILED, &json!([7, "boom"])).unwrap();
        assert_eq!(
            event,
            PanelEvent::RelayFailed {
                id: "7".into(),
                message: "boom".into(),
            }
        );
    }

    #[test]
    fn malformed_payloads_yield_none() {
        assert!(PanelEvent::parse(topic::SERVERS_READY, &json!("nope")).is_none());
        assert!(PanelEvent::parse(topic::RELAY_ACTIVE, &json!({ "id": "x" })).is_none());
        assert!(PanelEvent::parse(topic::RELAY_FAILED, &json!(["only-id"])).is_none());
        assert!(PanelEvent::parse("no-such-topic", &Value::Null).is_none());
    }
}
