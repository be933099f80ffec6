// ── Controller abstraction ──
//
// Full lifecycle management for the panel's backend connection.
// Handles readiness tracking, push-event routing, command execution,
// and reactive state streaming through the TargetStore.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relaydeck_ipc::{
    CommandGateway, CommandTransport, EventBus, PanelEvent, ServerPorts, topic,
};

use crate::config::PanelConfig;
use crate::error::CoreError;
use crate::model::{Readiness, TargetId};
use crate::readiness::poll_until_ready;
use crate::store::{TargetSnapshot, TargetStore, TargetStream};

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. UI collaborators go
/// through this facade for every read and mutation; none of them hold
/// the gateway or bus directly.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: PanelConfig,
    gateway: CommandGateway,
    bus: EventBus,
    store: TargetStore,
    readiness: watch::Sender<Readiness>,
    /// Is an upstream producer currently feeding the ingest endpoint?
    /// Seeded once after readiness, then event-driven.
    source_active: watch::Sender<bool>,
    cancel: CancellationToken,
    /// Child token for the readiness poll only — cancelled the moment
    /// readiness is reached, while the event bridges keep running.
    poll_cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller. Does NOT spawn anything — call
    /// [`start()`](Self::start) to launch the readiness poll and the
    /// event bridges.
    pub fn new(
        config: PanelConfig,
        transport: Arc<dyn CommandTransport>,
        bus: EventBus,
    ) -> Self {
        let (readiness, _) = watch::channel(Readiness::Unready);
        let (source_active, _) = watch::channel(false);
        let cancel = CancellationToken::new();
        let poll_cancel = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                gateway: CommandGateway::new(transport),
                bus,
                store: TargetStore::new(),
                readiness,
                source_active,
                cancel,
                poll_cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the panel configuration.
    pub fn config(&self) -> &PanelConfig {
        &self.inner.config
    }

    /// Access the underlying target store.
    pub fn store(&self) -> &TargetStore {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the readiness poll and one bridge task per push topic.
    ///
    /// Safe to call once; a second call is a no-op.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("controller already started");
            return;
        }

        {
            let ctrl = self.clone();
            let gateway = self.inner.gateway.clone();
            let period = self.inner.config.readiness_poll_interval;
            let cancel = self.inner.poll_cancel.clone();
            handles.push(tokio::spawn(async move {
                if let Some(ports) = poll_until_ready(gateway, period, cancel).await {
                    ctrl.set_ready(ports).await;
                }
            }));
        }

        for topic_name in topic::ALL {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(event_bridge_task(ctrl, topic_name, cancel)));
        }

        info!("controller started");
    }

    /// Tear down every background task and subscription.
    ///
    /// Idempotent; a second call finds nothing left to join.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller shut down");
    }

    /// Record that the backend is ready. First writer wins: the poll
    /// path and the `servers-ready` push race here, and whichever lands
    /// second observes the terminal state and does nothing.
    async fn set_ready(&self, ports: ServerPorts) {
        let first = self.inner.readiness.send_if_modified(|state| {
            if state.is_ready() {
                false
            } else {
                *state = Readiness::Ready(ports);
                true
            }
        });
        if !first {
            debug!("readiness already recorded, ignoring duplicate");
            return;
        }

        // The push may have won while the poll was mid-probe.
        self.inner.poll_cancel.cancel();
        self.post_ready().await;
    }

    /// One-shot work once the backend is usable: seed the source-active
    /// flag and load the target collection. Failures here leave the
    /// defaults in place; readiness itself is not undone.
    async fn post_ready(&self) {
        match self.inner.gateway.stream_active().await {
            Ok(active) => {
                self.inner.source_active.send_replace(active);
            }
            Err(err) => debug!(error = %err, "source-active seed failed"),
        }

        if let Err(err) = self.refresh().await {
            warn!(error = %err, "initial target fetch failed");
        }
    }

    // ── Relay target mutations ───────────────────────────────────
    //
    // Backend first, then a full refresh — the backend assigns ids and
    // is the source of truth for the collection's structure. On command
    // failure the error propagates and local state is left untouched.

    /// Re-fetch the target collection and reconcile it into the store.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let records = self.inner.gateway.list_targets().await?;
        self.inner.store.apply_fetch(records);
        Ok(())
    }

    /// Create a relay target. The backend assigns the id; the refresh
    /// brings the new record in.
    pub async fn create_target(
        &self,
        tag: &str,
        url: &str,
        stream_key: &str,
    ) -> Result<(), CoreError> {
        self.inner.gateway.add_target(tag, url, stream_key).await?;
        self.refresh().await
    }

    /// Delete a relay target.
    pub async fn remove_target(&self, id: &TargetId) -> Result<(), CoreError> {
        self.inner.gateway.remove_target(id.as_str()).await?;
        self.refresh().await
    }

    /// Flip a target's `enabled` flag, sending the backend the inverse
    /// of the locally known value.
    pub async fn toggle_target(&self, id: &TargetId) -> Result<(), CoreError> {
        let Some(target) = self.inner.store.get(id) else {
            return Err(CoreError::TargetNotFound { id: id.clone() });
        };
        self.inner
            .gateway
            .toggle_target(id.as_str(), !target.enabled)
            .await?;
        self.refresh().await
    }

    // ── Relay control ────────────────────────────────────────────
    //
    // Fire-and-forget toward the backend; the resulting `active` state
    // arrives as push events, so no refresh here.

    pub async fn start_relay(&self, id: &TargetId) -> Result<(), CoreError> {
        Ok(self.inner.gateway.start_relay(id.as_str()).await?)
    }

    pub async fn stop_relay(&self, id: &TargetId) -> Result<(), CoreError> {
        Ok(self.inner.gateway.stop_relay(id.as_str()).await?)
    }

    pub async fn start_all_relays(&self) -> Result<(), CoreError> {
        Ok(self.inner.gateway.start_all_relays().await?)
    }

    pub async fn stop_all_relays(&self) -> Result<(), CoreError> {
        Ok(self.inner.gateway.stop_all_relays().await?)
    }

    /// Dismiss a target's failure badge. Purely local — the backend is
    /// not involved. Returns whether the id was known.
    pub fn reset_failed(&self, id: &TargetId) -> bool {
        self.inner.store.clear_failure(id)
    }

    // ── State observation ────────────────────────────────────────

    /// Current readiness state.
    pub fn readiness(&self) -> Readiness {
        *self.inner.readiness.borrow()
    }

    /// Subscribe to readiness transitions.
    pub fn readiness_changes(&self) -> watch::Receiver<Readiness> {
        self.inner.readiness.subscribe()
    }

    /// Is an upstream producer currently live on the ingest endpoint?
    pub fn source_active(&self) -> bool {
        *self.inner.source_active.borrow()
    }

    /// Subscribe to source-active transitions.
    pub fn source_active_changes(&self) -> watch::Receiver<bool> {
        self.inner.source_active.subscribe()
    }

    /// Current target collection snapshot.
    pub fn targets(&self) -> TargetSnapshot {
        self.inner.store.snapshot()
    }

    /// Subscribe to target collection changes.
    pub fn target_stream(&self) -> TargetStream {
        self.inner.store.subscribe()
    }

    /// Route one typed push event into local state.
    async fn handle_event(&self, event: PanelEvent) {
        match event {
            PanelEvent::ServersReady(ports) => self.set_ready(ports).await,
            PanelEvent::StreamPreviewActive => {
                self.inner.source_active.send_replace(true);
            }
            PanelEvent::StreamPreviewEnded => {
                self.inner.source_active.send_replace(false);
            }
            PanelEvent::RelayActive { id } => {
                self.inner.store.mark_active(&TargetId::from(id));
            }
            PanelEvent::RelayEnded { id } => {
                self.inner.store.mark_ended(&TargetId::from(id));
            }
            PanelEvent::RelayFailed { id, message } => {
                self.inner.store.mark_failed(&TargetId::from(id), &message);
            }
        }
    }
}

/// Drain one topic's subscription until shutdown, routing each payload
/// through the controller. Malformed payloads parse to `None` and are
/// dropped here rather than crashing the bridge.
async fn event_bridge_task(ctrl: Controller, topic_name: &'static str, cancel: CancellationToken) {
    let mut sub = ctrl.inner.bus.subscribe(topic_name);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            payload = sub.recv() => {
                let Some(payload) = payload else { break };
                if let Some(event) = PanelEvent::parse(topic_name, &payload) {
                    ctrl.handle_event(event).await;
                }
            }
        }
    }
    sub.unsubscribe();
    debug!(topic = topic_name, "event bridge stopped");
}
