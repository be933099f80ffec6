// ── Panel configuration ──
//
// Runtime tuning for the state layer. Built by the embedding shell and
// handed to `Controller::new` — this crate never reads config files
// (the backend is the source of truth; nothing persists client-side).

use std::time::Duration;

/// Configuration for the panel state layer.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// How often to poll the backend for readiness while unready.
    ///
    /// Polling stops permanently once readiness is reached, whether via
    /// poll or push. There is no backoff and no retry limit.
    pub readiness_poll_interval: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            readiness_poll_interval: Duration::from_secs(2),
        }
    }
}
