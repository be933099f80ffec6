//! Channel layer between the relaydeck panel and its backend process.
//!
//! The backend (RTMP ingest, transcoding, HLS preview, relay fan-out) runs
//! in a separate privileged process and is reached through exactly two
//! channels, both wrapped here:
//!
//! - **[`CommandGateway`]** — request/response: issue a named command with
//!   structured arguments, await a typed result. A pure pass-through over a
//!   pluggable [`CommandTransport`]; no retries, no local side effects.
//!
//! - **[`EventBus`]** — push notifications: subscribe to a named topic,
//!   receive payloads in backend emission order until unsubscribed.
//!   Subscriptions are independent and teardown is idempotent.
//!
//! Wire types ([`ServerPorts`], [`RelayTargetRecord`]) and typed event
//! parsing ([`PanelEvent`]) live here too, so the core crate never touches
//! raw JSON.

pub mod bus;
pub mod error;
pub mod events;
pub mod gateway;
pub mod transport;
pub mod wire;

pub use bus::{EventBus, Subscription};
pub use error::IpcError;
pub use events::{PanelEvent, topic};
pub use gateway::CommandGateway;
pub use transport::CommandTransport;
pub use wire::{RelayTargetRecord, ServerPorts};
