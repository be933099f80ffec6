// ── Command transport seam ──
//
// The request/response channel to the backend process, kept behind a
// trait so the production bridge (desktop-shell IPC) and the test fakes
// plug in interchangeably.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::IpcError;

/// The raw request/response channel to the backend process.
///
/// `invoke` sends one named command with structured arguments and resolves
/// with the backend's result payload, or rejects with the backend's error
/// message. Implementations must not retry — retry policy belongs to the
/// caller.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, IpcError>;
}
