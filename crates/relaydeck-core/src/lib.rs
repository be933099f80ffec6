//! Client-side state layer for the relaydeck stream-relay control panel.
//!
//! The panel UI depends on a separate, privileged backend process for all
//! real work (RTMP ingest, transcoding, HLS preview, relay fan-out). This
//! crate owns the client's projection of that backend's state:
//!
//! - **[`Controller`]** — the single facade UI collaborators talk to.
//!   [`start()`](Controller::start) spawns the readiness poller and one
//!   bridge task per push topic; reads and mutations all go through it.
//!   No collaborator touches the command gateway or event bus directly.
//!
//! - **[`TargetStore`]** — race-safe projection of the relay-target
//!   collection (`DashMap` + `tokio::sync::watch` snapshots). Reconciles
//!   bulk fetches with event-driven live sub-state: a structural refresh
//!   merges, preserving `active`/`failed` for surviving targets.
//!
//! - **Readiness** — fixed-interval polling until the backend reports
//!   ready, raced against the `servers-ready` push. First writer wins,
//!   both writers are idempotent, and the winner cancels the poll timer.
//!
//! - **[`TargetStream`]** — subscription handle over the store snapshot
//!   for reactive rendering (`current()` / `latest()` / `changed()`).

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod readiness;
pub mod store;

pub use config::PanelConfig;
pub use controller::Controller;
pub use error::CoreError;
pub use model::{Readiness, RelayTarget, TargetId};
pub use store::{TargetSnapshot, TargetStore, TargetStream};

// Channel-layer types consumers need when wiring up a transport.
pub use relaydeck_ipc::{CommandTransport, EventBus, ServerPorts};
