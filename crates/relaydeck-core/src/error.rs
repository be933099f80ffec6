// ── Core error types ──
//
// User-facing errors from the state layer. Channel-level details never
// leak raw; the `From<IpcError>` impl translates them into the variants
// the UI surfaces as notifications.

use thiserror::Error;

use relaydeck_ipc::IpcError;

use crate::model::TargetId;

/// Unified error type for the state layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The backend rejected or could not execute a command.
    ///
    /// The message is the backend's own and is meant to be shown to the
    /// user verbatim. The operation was aborted; local state is unchanged.
    #[error("command failed: {message}")]
    CommandFailed { message: String },

    /// A mutation referenced a target the store has never seen.
    #[error("relay target not found: {id}")]
    TargetNotFound { id: TargetId },

    /// The backend process is gone.
    #[error("backend channel closed")]
    ChannelClosed,
}

impl From<IpcError> for CoreError {
    fn from(err: IpcError) -> Self {
        match err {
            IpcError::Command { message, .. } => Self::CommandFailed { message },
            IpcError::Codec { .. } => Self::CommandFailed {
                message: err.to_string(),
            },
            IpcError::ChannelClosed => Self::ChannelClosed,
        }
    }
}
