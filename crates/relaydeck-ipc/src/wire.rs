// ── Wire types ──
//
// Payload shapes as the backend sends them. The core crate converts
// these into domain types; nothing else should deserialize backend JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Listening ports allocated by the backend at startup.
///
/// `0` means "not yet known" — the backend reports real ports only once
/// its servers are up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPorts {
    /// RTMP ingest port.
    pub rtmp_port: u16,
    /// HTTP port serving the HLS preview.
    pub file_port: u16,
}

impl ServerPorts {
    /// Whether the backend has reported real ports yet.
    pub fn is_known(&self) -> bool {
        self.rtmp_port != 0 || self.file_port != 0
    }
}

/// A relay target as the backend stores it.
///
/// This is the bulk-fetch record shape: identity and configuration only.
/// Live streaming sub-state (`active`/`failed`) is never part of a fetch —
/// it is delivered exclusively through push events and owned by the client
/// projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayTargetRecord {
    /// Backend-assigned stable identifier, opaque to the client.
    /// Arrives as either a string or an integer row id on the wire.
    #[serde(deserialize_with = "id_from_wire")]
    pub id: String,
    /// Short classification label, e.g. a platform name.
    pub tag: String,
    /// Destination endpoint URL.
    pub url: String,
    /// Destination stream key. Opaque; never validated client-side.
    pub stream_key: String,
    /// Whether the user wants this target eligible to relay.
    pub enabled: bool,
    /// Creation timestamp, informational only.
    #[serde(default, deserialize_with = "timestamp_from_wire")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Ids are opaque strings to the panel, but the backend database stores
/// integer row ids and may emit either form.
fn id_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Timestamps arrive as RFC 3339 or as the backend database's
/// `YYYY-MM-DD HH:MM:SS` text form. The field is informational, so an
/// unparseable value degrades to `None` instead of failing the whole
/// bulk fetch.
fn timestamp_from_wire<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
