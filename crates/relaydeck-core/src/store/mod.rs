// ── Relay target store ──
//
// The authoritative client-side projection of the relay-target
// collection. Keyed by backend id so event-driven partial updates apply
// without a scan. Every mutation rebuilds an immutable snapshot and
// broadcasts it over a `watch` channel — concurrent readers only ever
// hold complete snapshots, never a half-applied map.

mod stream;

pub use stream::{TargetSnapshot, TargetStream, TargetWatchStream};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tokio::sync::watch;

use relaydeck_ipc::RelayTargetRecord;

use crate::model::{RelayTarget, TargetId};

/// Reactive, race-safe store for the relay-target collection.
pub struct TargetStore {
    targets: DashMap<TargetId, Arc<RelayTarget>>,
    /// Serializes every mutation together with its snapshot publish.
    /// Refresh merges and event mutators are both read-modify-write
    /// over the same entries; holding this across the whole update
    /// keeps each one atomic and keeps the last published snapshot in
    /// step with the map.
    write: Mutex<()>,
    /// Full snapshot, sorted by `(created_at, id)`, rebuilt on mutation.
    snapshot: watch::Sender<TargetSnapshot>,
}

impl TargetStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            targets: DashMap::new(),
            write: Mutex::new(()),
            snapshot,
        }
    }

    // ── Structural refresh ───────────────────────────────────────

    /// Apply a bulk-fetch result.
    ///
    /// Upsert-then-prune: incoming records are upserted first, then ids
    /// absent from the incoming set are removed — subscribers never see
    /// a transient empty collection.
    ///
    /// For ids present on both sides, backend fields (`tag`, `url`,
    /// `stream_key`, `enabled`, `created_at`) come from the fetch while
    /// the live fields are preserved from the existing record: a bulk
    /// fetch does not report streaming sub-state, and replacing
    /// wholesale would revert badges set by events since the last fetch.
    pub fn apply_fetch(&self, records: Vec<RelayTargetRecord>) {
        let _guard = self.lock_writes();

        let incoming: HashSet<TargetId> = records
            .iter()
            .map(|r| TargetId::from(r.id.clone()))
            .collect();

        for record in records {
            let mut target = RelayTarget::from(record);
            let live = self
                .targets
                .get(&target.id)
                .map(|e| (e.active, e.failed, e.error_message.clone()));
            if let Some((active, failed, error_message)) = live {
                target.active = active;
                target.failed = failed;
                target.error_message = error_message;
            }
            self.targets.insert(target.id.clone(), Arc::new(target));
        }

        let stale: Vec<TargetId> = self
            .targets
            .iter()
            .map(|e| e.key().clone())
            .filter(|id| !incoming.contains(id))
            .collect();
        for id in stale {
            self.targets.remove(&id);
        }

        self.publish();
    }

    // ── Event-driven refinement ──────────────────────────────────
    //
    // Each mutator returns whether the id was known; events for ids the
    // store has never seen (deleted, or not yet fetched) are no-ops.

    /// A relay session started: `active` set, any previous failure is no
    /// longer current and is cleared.
    pub fn mark_active(&self, id: &TargetId) -> bool {
        self.mutate(id, |t| {
            t.active = true;
            t.failed = false;
            t.error_message = None;
        })
    }

    /// A relay session ended normally.
    pub fn mark_ended(&self, id: &TargetId) -> bool {
        self.mutate(id, |t| t.active = false)
    }

    /// A relay attempt terminated in error.
    pub fn mark_failed(&self, id: &TargetId, message: &str) -> bool {
        self.mutate(id, |t| {
            t.failed = true;
            t.active = false;
            t.error_message = Some(message.to_owned());
        })
    }

    /// Dismiss a recorded failure without contacting the backend.
    ///
    /// Clears `failed` and `error_message` only; `enabled` and `active`
    /// are untouched.
    pub fn clear_failure(&self, id: &TargetId) -> bool {
        self.mutate(id, |t| {
            t.failed = false;
            t.error_message = None;
        })
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn get(&self, id: &TargetId) -> Option<Arc<RelayTarget>> {
        self.targets.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Current snapshot (cheap `Arc` clone), sorted by `(created_at, id)`.
    pub fn snapshot(&self) -> TargetSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> TargetStream {
        TargetStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────

    /// Copy-on-write update of one record, then snapshot rebuild.
    /// Returns `false` without publishing if the id is unknown.
    fn mutate(&self, id: &TargetId, apply: impl FnOnce(&mut RelayTarget)) -> bool {
        let _guard = self.lock_writes();

        let Some(current) = self.get(id) else {
            tracing::debug!(%id, "event for unknown relay target ignored");
            return false;
        };
        let mut updated = (*current).clone();
        apply(&mut updated);
        self.targets.insert(id.clone(), Arc::new(updated));
        self.publish();
        true
    }

    /// Take the write lock. A poisoned lock is recovered: the snapshot
    /// is rebuilt from the map on the next publish regardless.
    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the sorted snapshot and broadcast it. Callers hold the
    /// write lock.
    fn publish(&self) {
        let mut values: Vec<Arc<RelayTarget>> =
            self.targets.iter().map(|e| Arc::clone(e.value())).collect();
        values.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

impl Default for TargetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str, tag: &str, enabled: bool) -> RelayTargetRecord {
        RelayTargetRecord {
            id: id.to_owned(),
            tag: tag.to_owned(),
            url: format!("rtmp://{tag}.example/live"),
            stream_key: format!("key-{id}"),
            enabled,
            created_at: None,
        }
    }

    #[test]
    fn fetch_replaces_collection_by_id() {
        let store = TargetStore::new();
        store.apply_fetch(vec![record("1", "youtube", true), record("2", "twitch", false)]);
        assert_eq!(store.len(), 2);

        store.apply_fetch(vec![record("2", "twitch", true)]);
        assert_eq!(store.len(), 1);
        assert!(store.get(&TargetId::from("1")).is_none());
        assert!(store.get(&TargetId::from("2")).unwrap().enabled);
    }

    #[test]
    fn active_then_failed_ends_failed() {
        let store = TargetStore::new();
        store.apply_fetch(vec![record("1", "youtube", true)]);
        let id = TargetId::from("1");

        assert!(store.mark_active(&id));
        assert!(store.mark_failed(&id, "connection reset"));

        let target = store.get(&id).unwrap();
        assert!(!target.active);
        assert!(target.failed);
        assert_eq!(target.error_message.as_deref(), Some("connection reset"));
    }

    #[test]
    fn active_clears_previous_failure() {
        let store = TargetStore::new();
        store.apply_fetch(vec![record("1", "youtube", true)]);
        let id = TargetId::from("1");

        store.mark_failed(&id, "boom");
        store.mark_active(&id);

        let target = store.get(&id).unwrap();
        assert!(target.active);
        assert!(!target.failed);
        assert!(target.error_message.is_none());
    }

    #[test]
    fn fetch_preserves_live_state_for_surviving_ids() {
        let store = TargetStore::new();
        store.apply_fetch(vec![record("1", "youtube", true), record("2", "twitch", true)]);
        store.mark_active(&TargetId::from("1"));
        store.mark_failed(&TargetId::from("2"), "key rejected");

        // Structural refresh flips `enabled` on target 1 but must not
        // touch the event-owned fields on either.
        store.apply_fetch(vec![record("1", "youtube", false), record("2", "twitch", true)]);

        let one = store.get(&TargetId::from("1")).unwrap();
        assert!(!one.enabled);
        assert!(one.active);

        let two = store.get(&TargetId::from("2")).unwrap();
        assert!(two.failed);
        assert_eq!(two.error_message.as_deref(), Some("key rejected"));
    }

    #[test]
    fn clear_failure_touches_only_failure_fields() {
        let store = TargetStore::new();
        store.apply_fetch(vec![record("1", "youtube", true)]);
        let id = TargetId::from("1");
        store.mark_failed(&id, "boom");

        assert!(store.clear_failure(&id));

        let target = store.get(&id).unwrap();
        assert!(!target.failed);
        assert!(target.error_message.is_none());
        assert!(target.enabled);
        assert_eq!(target.tag, "youtube");
        assert_eq!(target.url, "rtmp://youtube.example/live");
        assert!(!target.active);
    }

    #[test]
    fn concurrent_refresh_never_erases_an_event_badge() {
        // A refresh merge and an event mutator racing over the same
        // entry: whichever order they land in, the failure badge set by
        // the event must survive, and the final snapshot must agree
        // with the map.
        for _ in 0..500 {
            let store = TargetStore::new();
            store.apply_fetch(vec![record("1", "youtube", true)]);
            let id = TargetId::from("1");

            std::thread::scope(|s| {
                s.spawn(|| store.apply_fetch(vec![record("1", "youtube", false)]));
                s.spawn(|| store.mark_failed(&id, "connection reset"));
            });

            let target = store.get(&id).unwrap();
            assert!(target.failed);
            assert_eq!(target.error_message.as_deref(), Some("connection reset"));
            assert!(store.snapshot()[0].failed);
        }
    }

    #[test]
    fn events_for_unknown_ids_are_noops() {
        let store = TargetStore::new();
        let ghost = TargetId::from("ghost");

        assert!(!store.mark_active(&ghost));
        assert!(!store.mark_ended(&ghost));
        assert!(!store.mark_failed(&ghost, "x"));
        assert!(!store.clear_failure(&ghost));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_immutable() {
        let store = TargetStore::new();
        store.apply_fetch(vec![record("b", "twitch", true), record("a", "youtube", true)]);

        let before = store.snapshot();
        assert_eq!(before.len(), 2);
        assert_eq!(before[0].id, TargetId::from("a"));
        assert_eq!(before[1].id, TargetId::from("b"));

        // A reader holding the old snapshot is unaffected by mutation.
        store.mark_active(&TargetId::from("a"));
        assert!(!before[0].active);
        assert!(store.snapshot()[0].active);
    }

    #[tokio::test]
    async fn subscribers_observe_mutations() {
        let store = TargetStore::new();
        let mut sub = store.subscribe();
        assert!(sub.current().is_empty());

        store.apply_fetch(vec![record("1", "youtube", true)]);
        let snap = sub.changed().await.unwrap();
        assert_eq!(snap.len(), 1);

        store.mark_active(&TargetId::from("1"));
        let snap = sub.changed().await.unwrap();
        assert!(snap[0].active);
    }
}
