// ── Typed command gateway ──
//
// One method per backend operation. Wire command names and argument keys
// are fixed by the backend's handler table — argument objects use the
// camelCase keys it expects.
//
// The gateway performs no retries and keeps no state; every failure is
// surfaced to the caller as-is.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::IpcError;
use crate::transport::CommandTransport;
use crate::wire::{RelayTargetRecord, ServerPorts};

/// Typed wrapper over the request/response channel.
///
/// Cheaply cloneable; all clones share the same transport.
#[derive(Clone)]
pub struct CommandGateway {
    transport: Arc<dyn CommandTransport>,
}

impl CommandGateway {
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self { transport }
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
    ) -> Result<T, IpcError> {
        tracing::debug!(command, "invoking backend command");
        let result = self.transport.invoke(command, args).await?;
        serde_json::from_value(result).map_err(|e| IpcError::Codec {
            command: command.to_owned(),
            message: e.to_string(),
        })
    }

    /// Fire a command whose result payload carries no information.
    async fn invoke_ack(&self, command: &str, args: Value) -> Result<(), IpcError> {
        tracing::debug!(command, "invoking backend command");
        self.transport.invoke(command, args).await?;
        Ok(())
    }

    // ── Readiness ────────────────────────────────────────────────

    /// Has the backend finished initializing its servers?
    pub async fn check_ready(&self) -> Result<bool, IpcError> {
        self.invoke("check_if_ready", Value::Null).await
    }

    /// Ports the backend allocated at startup.
    pub async fn ports(&self) -> Result<ServerPorts, IpcError> {
        self.invoke("get_ports", Value::Null).await
    }

    /// Is an upstream producer currently pushing into the ingest endpoint?
    pub async fn stream_active(&self) -> Result<bool, IpcError> {
        self.invoke("check_if_stream_active", Value::Null).await
    }

    // ── Relay targets ────────────────────────────────────────────

    /// Bulk-fetch every configured relay target.
    pub async fn list_targets(&self) -> Result<Vec<RelayTargetRecord>, IpcError> {
        self.invoke("get_relay_targets", Value::Null).await
    }

    /// Create a relay target. The backend assigns the id; observe it via
    /// a subsequent [`list_targets`](Self::list_targets).
    pub async fn add_target(
        &self,
        tag: &str,
        url: &str,
        stream_key: &str,
    ) -> Result<(), IpcError> {
        self.invoke_ack(
            "add_relay_target",
            json!({ "streamKey": stream_key, "url": url, "tag": tag }),
        )
        .await
    }

    /// Delete a relay target.
    pub async fn remove_target(&self, id: &str) -> Result<(), IpcError> {
        self.invoke_ack("remove_relay_target", json!({ "id": id }))
            .await
    }

    /// Set a target's `enabled` flag.
    pub async fn toggle_target(&self, id: &str, active: bool) -> Result<(), IpcError> {
        self.invoke_ack("toggle_relay_target", json!({ "id": id, "active": active }))
            .await
    }

    // ── Relay control ────────────────────────────────────────────
    //
    // Success means only "the backend accepted the request". Whether a
    // relay actually becomes active arrives later as a push event.

    pub async fn start_relay(&self, id: &str) -> Result<(), IpcError> {
        self.invoke_ack("start_relay", json!({ "id": id })).await
    }

    pub async fn stop_relay(&self, id: &str) -> Result<(), IpcError> {
        self.invoke_ack("stop_relay", json!({ "id": id })).await
    }

    pub async fn start_all_relays(&self) -> Result<(), IpcError> {
        self.invoke_ack("start_all_relays", Value::Null).await
    }

    pub async fn stop_all_relays(&self) -> Result<(), IpcError> {
        self.invoke_ack("stop_all_relays", Value::Null).await
    }
}
