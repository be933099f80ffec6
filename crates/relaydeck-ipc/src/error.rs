// ── Channel-layer error types ──
//
// Consumers see the backend's human-readable rejection message and
// nothing transport-specific. The core crate translates these into its
// own domain variants via `From`.

use thiserror::Error;

/// Errors surfaced by the command and event channels.
#[derive(Debug, Error)]
pub enum IpcError {
    /// The backend rejected or could not execute a command.
    ///
    /// Carries the backend's own message — this is what gets shown to the
    /// user when a mutation fails.
    #[error("backend rejected `{command}`: {message}")]
    Command { command: String, message: String },

    /// A payload could not be encoded or decoded.
    #[error("malformed payload for `{command}`: {message}")]
    Codec { command: String, message: String },

    /// The underlying channel to the backend process is gone.
    #[error("backend channel closed")]
    ChannelClosed,
}

impl IpcError {
    /// Construct a [`IpcError::Command`] rejection.
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }
}
