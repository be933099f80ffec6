// ── Domain model ──
//
// The client-side view of a relay target is the backend record plus
// live streaming sub-state the backend never includes in a fetch:
// `active`/`failed`/`error_message` exist only in this projection and
// are driven exclusively by push events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relaydeck_ipc::{RelayTargetRecord, ServerPorts};

// ── TargetId ────────────────────────────────────────────────────────

/// Backend-assigned identifier for a relay target.
///
/// Opaque and stable for the lifetime of the target; the client never
/// inspects or fabricates one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TargetId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── RelayTarget ─────────────────────────────────────────────────────

/// One configured outbound destination, as the panel sees it.
///
/// Identity and configuration fields mirror the backend record. The
/// three live fields are client-owned:
///
/// - `enabled` — user intent, mutated only via an explicit command.
/// - `active` — a relay session is running right now; set and cleared
///   only by `relay-active`/`relay-ended` events.
/// - `failed`/`error_message` — the last attempt errored; set by
///   `relay-failed`, cleared by `relay-active` or an explicit local
///   reset.
///
/// `active` and `failed` are never both true once a store handler has
/// run: starting a relay clears the failure, a failure clears `active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    pub id: TargetId,
    pub tag: String,
    pub url: String,
    pub stream_key: String,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub failed: bool,
    pub error_message: Option<String>,
}

impl From<RelayTargetRecord> for RelayTarget {
    fn from(record: RelayTargetRecord) -> Self {
        Self {
            id: TargetId(record.id),
            tag: record.tag,
            url: record.url,
            stream_key: record.stream_key,
            enabled: record.enabled,
            created_at: record.created_at,
            active: false,
            failed: false,
            error_message: None,
        }
    }
}

// ── Readiness ───────────────────────────────────────────────────────

/// Backend readiness as observed by the panel.
///
/// `Ready` is terminal — a backend restart/reconnect is out of scope,
/// so there is no transition back and no failed state: while `Unready`
/// the poller simply keeps trying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Readiness {
    #[default]
    Unready,
    Ready(ServerPorts),
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Allocated ports, or the zeroed "not yet known" value while unready.
    pub fn ports(self) -> ServerPorts {
        match self {
            Self::Ready(ports) => ports,
            Self::Unready => ServerPorts::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_conversion_defaults_live_fields() {
        let record = RelayTargetRecord {
            id: "3".into(),
            tag: "youtube".into(),
            url: "rtmp://a.example/live".into(),
            stream_key: "k1".into(),
            enabled: true,
            created_at: None,
        };

        let target = RelayTarget::from(record);
        assert_eq!(target.id, TargetId::from("3"));
        assert!(target.enabled);
        assert!(!target.active);
        assert!(!target.failed);
        assert!(target.error_message.is_none());
    }

    #[test]
    fn target_id_round_trips_as_plain_string() {
        let id: TargetId = "abc-123".parse().unwrap();
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("abc-123"));
    }

    #[test]
    fn unready_reports_unknown_ports() {
        let readiness = Readiness::default();
        assert!(!readiness.is_ready());
        assert!(!readiness.ports().is_known());
    }
}
