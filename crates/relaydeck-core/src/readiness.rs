// ── Readiness polling ──
//
// The backend spins up its media servers asynchronously after launch
// and cannot accept real commands until they are bound. This poller
// probes at a fixed interval until the backend reports ready, then
// resolves the allocated ports and stops. It races the `servers-ready`
// push notification, which cancels it through the token when the push
// lands first.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use relaydeck_ipc::{CommandGateway, ServerPorts};

/// Poll the backend until it reports ready, then resolve its ports.
///
/// Returns `None` when cancelled. Probe failures and `Ok(false)` are
/// both "not yet": there is no backoff, no retry limit, and no error
/// escape — the backend either comes up or the panel stays in its
/// waiting state until shutdown.
pub(crate) async fn poll_until_ready(
    gateway: CommandGateway,
    period: Duration,
    cancel: CancellationToken,
) -> Option<ServerPorts> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick resolves immediately; consume it so probes start
    // one full period after launch.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("readiness poll cancelled");
                return None;
            }
            _ = ticker.tick() => {}
        }

        match gateway.check_ready().await {
            Ok(true) => match gateway.ports().await {
                Ok(ports) => {
                    tracing::info!(
                        rtmp_port = ports.rtmp_port,
                        file_port = ports.file_port,
                        "backend ready via poll"
                    );
                    return Some(ports);
                }
                Err(err) => {
                    tracing::debug!(error = %err, "port query failed, retrying next tick");
                }
            },
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(error = %err, "readiness probe failed, retrying next tick");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::time::Instant;

    use relaydeck_ipc::{CommandTransport, IpcError};

    use super::*;

    /// Errors the first `failing_probes` checks, then reports unready
    /// for the next `unready_probes`, then ready.
    struct SlowBackend {
        failing_probes: usize,
        unready_probes: usize,
        probes: AtomicUsize,
        fail_first_port_query: bool,
        port_queries: AtomicUsize,
    }

    impl SlowBackend {
        fn new(unready_probes: usize) -> Self {
            Self {
                failing_probes: 0,
                unready_probes,
                probes: AtomicUsize::new(0),
                fail_first_port_query: false,
                port_queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommandTransport for SlowBackend {
        async fn invoke(&self, command: &str, _args: Value) -> Result<Value, IpcError> {
            match command {
                "check_if_ready" => {
                    let seen = self.probes.fetch_add(1, Ordering::SeqCst);
                    if seen < self.failing_probes {
                        return Err(IpcError::command(command, "backend not responding"));
                    }
                    Ok(json!(seen >= self.failing_probes + self.unready_probes))
                }
                "get_ports" => {
                    if self.fail_first_port_query
                        && self.port_queries.fetch_add(1, Ordering::SeqCst) == 0
                    {
                        return Err(IpcError::command(command, "ports not bound"));
                    }
                    Ok(json!({ "rtmp_port": 1935, "file_port": 8787 }))
                }
                other => Err(IpcError::command(other, "unexpected command")),
            }
        }
    }

    fn gateway(backend: SlowBackend) -> CommandGateway {
        CommandGateway::new(Arc::new(backend))
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_ports_once_backend_reports_ready() {
        let start = Instant::now();
        let ports = poll_until_ready(
            gateway(SlowBackend::new(2)),
            Duration::from_secs(2),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(ports.rtmp_port, 1935);
        assert_eq!(ports.file_port, 8787);
        // Probes at 2s and 4s report unready; the 6s probe succeeds.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_are_retried_next_tick() {
        let mut backend = SlowBackend::new(0);
        backend.failing_probes = 2;

        let start = Instant::now();
        let ports = poll_until_ready(
            gateway(backend),
            Duration::from_secs(2),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(ports.is_known());
        // Probes at 2s and 4s error out; the 6s probe reports ready.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn port_query_failure_retries_next_tick() {
        let mut backend = SlowBackend::new(0);
        backend.fail_first_port_query = true;

        let start = Instant::now();
        let ports = poll_until_ready(
            gateway(backend),
            Duration::from_secs(2),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(ports.is_known());
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_poll() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_until_ready(
            gateway(SlowBackend::new(usize::MAX)),
            Duration::from_secs(2),
            cancel.clone(),
        ));

        tokio::time::advance(Duration::from_secs(5)).await;
        cancel.cancel();

        assert!(handle.await.unwrap().is_none());
    }
}
