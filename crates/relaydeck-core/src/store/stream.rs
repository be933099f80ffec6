// ── Reactive target streams ──
//
// Subscription types for consuming snapshot changes from the TargetStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::CoreError;
use crate::model::RelayTarget;

/// One broadcast snapshot of the relay-target collection.
pub type TargetSnapshot = Arc<Vec<Arc<RelayTarget>>>;

/// Subscription handle over the store's snapshot channel.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via `changed()` or by converting to a `Stream`.
/// Snapshots are immutable and shared, so a slow consumer only delays
/// itself; one that cannot keep up skips straight to the latest state —
/// intermediate snapshots are not replayed.
#[derive(Debug)]
pub struct TargetStream {
    rx: watch::Receiver<TargetSnapshot>,
}

impl TargetStream {
    pub(crate) fn new(rx: watch::Receiver<TargetSnapshot>) -> Self {
        Self { rx }
    }

    /// The most recent snapshot, without marking it seen.
    pub fn current(&self) -> TargetSnapshot {
        self.rx.borrow().clone()
    }

    /// The most recent snapshot, marked seen so `changed` waits for the
    /// next mutation.
    pub fn latest(&mut self) -> TargetSnapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next unseen snapshot.
    ///
    /// Errors only when the store itself has been dropped.
    pub async fn changed(&mut self) -> Result<TargetSnapshot, CoreError> {
        self.rx
            .changed()
            .await
            .map_err(|_| CoreError::ChannelClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    /// Yields the current snapshot first.
    pub fn into_stream(self) -> TargetWatchStream {
        TargetWatchStream {
            inner: WatchStream::new(self.rx),
        }
    }
}

/// `Stream` adapter backed by the store's `watch` channel.
pub struct TargetWatchStream {
    inner: WatchStream<TargetSnapshot>,
}

impl Stream for TargetWatchStream {
    type Item = TargetSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream<TargetSnapshot> is Unpin, so projecting is safe.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
