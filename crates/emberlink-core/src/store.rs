// ── Reactive grill store ──
//
// Thread-safe storage for every discovered grill's latest snapshot.
// Reads are cheap `Arc` clones; mutations broadcast through `watch`
// channels so embedders can observe changes without polling the store.
// Each grill also owns its execution slot here -- the mutex that keeps
// a command submission and a scheduled poll for the same grill from
// ever running concurrently.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, watch};

use emberlink_api::codec::GrillState;

use crate::model::{GrillDevice, GrillKey, GrillSnapshot, Reachability};

struct GrillHandle {
    snapshot: watch::Sender<Arc<GrillSnapshot>>,
    /// Per-grill execution slot: poll bodies and command submissions
    /// both hold it for the duration of their network exchange.
    slot: Arc<Mutex<()>>,
}

/// Reactive store of grill snapshots, keyed by composite grill key.
pub struct GrillStore {
    grills: DashMap<GrillKey, GrillHandle>,
    /// Discovery order, for stable listing.
    order: RwLock<Vec<GrillKey>>,
    last_discovery: watch::Sender<Option<DateTime<Utc>>>,
}

impl GrillStore {
    pub fn new() -> Self {
        let (last_discovery, _) = watch::channel(None);
        Self {
            grills: DashMap::new(),
            order: RwLock::new(Vec::new()),
            last_discovery,
        }
    }

    /// Register a discovered grill. Returns `true` if it was new.
    ///
    /// Re-registering an existing grill is a no-op: discovery refreshes
    /// must not reset polling state already accumulated for it.
    pub(crate) fn register(&self, device: GrillDevice) -> bool {
        let key = device.key();
        if self.grills.contains_key(&key) {
            return false;
        }
        let (snapshot, _) = watch::channel(Arc::new(GrillSnapshot::unpolled(device)));
        self.grills.insert(
            key.clone(),
            GrillHandle {
                snapshot,
                slot: Arc::new(Mutex::new(())),
            },
        );
        self.order.write().expect("order lock poisoned").push(key);
        true
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    /// Latest snapshot for one grill.
    pub fn snapshot(&self, key: &GrillKey) -> Option<Arc<GrillSnapshot>> {
        self.grills.get(key).map(|h| h.snapshot.borrow().clone())
    }

    /// Latest snapshots for all grills, in discovery order.
    pub fn snapshots(&self) -> Vec<Arc<GrillSnapshot>> {
        let order = self.order.read().expect("order lock poisoned");
        order.iter().filter_map(|k| self.snapshot(k)).collect()
    }

    /// All discovered devices, in discovery order.
    pub fn devices(&self) -> Vec<GrillDevice> {
        self.snapshots().iter().map(|s| s.device.clone()).collect()
    }

    /// Subscribe to snapshot changes for one grill.
    pub fn subscribe(&self, key: &GrillKey) -> Option<watch::Receiver<Arc<GrillSnapshot>>> {
        self.grills.get(key).map(|h| h.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.grills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grills.is_empty()
    }

    /// When the device list was last fetched.
    pub fn last_discovery(&self) -> Option<DateTime<Utc>> {
        *self.last_discovery.borrow()
    }

    // ── Mutation (poller-internal) ───────────────────────────────────

    pub(crate) fn slot(&self, key: &GrillKey) -> Option<Arc<Mutex<()>>> {
        self.grills.get(key).map(|h| Arc::clone(&h.slot))
    }

    /// A successful poll fully replaces the snapshot's state.
    pub(crate) fn apply_success(&self, key: &GrillKey, state: GrillState) {
        if let Some(handle) = self.grills.get(key) {
            handle.snapshot.send_modify(|snap| {
                let mut next = GrillSnapshot::clone(snap);
                next.reachability = Reachability::Online;
                next.consecutive_failures = 0;
                next.state = Some(state);
                next.stale = false;
                next.last_success = Some(Utc::now());
                *snap = Arc::new(next);
            });
        }
    }

    /// A failed poll leaves the retained state untouched and records the
    /// new reachability classification.
    pub(crate) fn apply_failure(&self, key: &GrillKey, reachability: Reachability, failures: u32) {
        if let Some(handle) = self.grills.get(key) {
            handle.snapshot.send_modify(|snap| {
                let mut next = GrillSnapshot::clone(snap);
                next.reachability = reachability;
                next.consecutive_failures = failures;
                next.stale = next.state.is_some();
                *snap = Arc::new(next);
            });
        }
    }

    pub(crate) fn mark_discovery(&self) {
        let _ = self.last_discovery.send(Some(Utc::now()));
    }
}

impl Default for GrillStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use emberlink_api::codec::GrillStatus;

    use super::*;

    fn device(id: &str) -> GrillDevice {
        GrillDevice {
            id: id.into(),
            connection_type: "remote".into(),
            name: None,
            model: None,
        }
    }

    fn state_at(temp: u16) -> GrillState {
        GrillState {
            grill_temp: Some(temp),
            status: GrillStatus::Grilling,
            ..GrillState::default()
        }
    }

    #[test]
    fn register_is_idempotent() {
        let store = GrillStore::new();
        assert!(store.register(device("1")));
        assert!(!store.register(device("1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reregistration_preserves_polling_state() {
        let store = GrillStore::new();
        let key = device("1").key();
        store.register(device("1"));
        store.apply_success(&key, state_at(225));

        store.register(device("1"));
        let snap = store.snapshot(&key).unwrap();
        assert_eq!(snap.reachability, Reachability::Online);
        assert_eq!(snap.state.as_ref().unwrap().grill_temp, Some(225));
    }

    #[test]
    fn snapshots_keep_discovery_order() {
        let store = GrillStore::new();
        store.register(device("b"));
        store.register(device("a"));
        let ids: Vec<String> = store.devices().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec!["b".to_owned(), "a".to_owned()]);
    }

    #[test]
    fn success_replaces_state_and_clears_staleness() {
        let store = GrillStore::new();
        let key = device("1").key();
        store.register(device("1"));

        store.apply_success(&key, state_at(225));
        store.apply_failure(&key, Reachability::Degraded, 1);
        let snap = store.snapshot(&key).unwrap();
        assert!(snap.stale);
        assert_eq!(snap.state.as_ref().unwrap().grill_temp, Some(225));

        store.apply_success(&key, state_at(230));
        let snap = store.snapshot(&key).unwrap();
        assert!(!snap.stale);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.state.as_ref().unwrap().grill_temp, Some(230));
        assert!(snap.last_success.is_some());
    }

    #[test]
    fn failure_without_prior_state_is_not_stale() {
        let store = GrillStore::new();
        let key = device("1").key();
        store.register(device("1"));
        store.apply_failure(&key, Reachability::Unpolled, 1);
        let snap = store.snapshot(&key).unwrap();
        assert!(!snap.stale);
        assert_eq!(snap.state, None);
    }

    #[tokio::test]
    async fn subscribers_observe_mutations() {
        let store = GrillStore::new();
        let key = device("1").key();
        store.register(device("1"));

        let mut rx = store.subscribe(&key).unwrap();
        store.apply_success(&key, state_at(225));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().reachability, Reachability::Online);
    }
}
