// ── Alert reconciler ──
//
// Owns the canonical collection and the selected-alert slot. REST
// snapshots, pushed deltas and acknowledge responses all funnel through
// here, so the "no duplicates, last applied wins" rules live in one place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use tokio::sync::{Mutex, watch};
use tracing::debug;

use super::collection::{AlertCollection, Snapshot};
use crate::backend::AlertBackend;
use crate::error::CoreError;
use crate::model::{Alert, AlertPatch, AlertStatus};
use crate::stream::AlertStream;

/// Canonical alert state shared by the session, the push bridge, and callers.
pub struct AlertStore {
    alerts: AlertCollection,
    selected: watch::Sender<Option<Arc<Alert>>>,
    /// Per-id guards so two writes for one alert never interleave.
    write_locks: WriteLocks,
}

impl AlertStore {
    pub fn new() -> Self {
        let (selected, _) = watch::channel(None);
        Self {
            alerts: AlertCollection::new(),
            selected,
            write_locks: Arc::default(),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace everything with a freshly fetched page, in server order.
    ///
    /// A selected alert that appears in the page is refreshed too.
    pub fn replace_all(&self, alerts: Vec<Alert>) {
        debug!(count = alerts.len(), "replacing alert collection");
        let selected_id = self.selected.borrow().as_ref().map(|a| a.id.clone());
        if let Some(id) = selected_id {
            if let Some(fresh) = alerts.iter().find(|a| a.id == id) {
                self.overwrite_selected(fresh);
            }
        }
        self.alerts.replace_all(alerts);
    }

    /// Add a pushed alert at the top unless its id is already known.
    pub fn insert_if_absent(&self, alert: Alert) -> bool {
        let id = alert.id.clone();
        let inserted = self.alerts.insert_if_absent(alert);
        if !inserted {
            debug!(alert_id = %id, "duplicate alert push ignored");
        }
        inserted
    }

    /// Merge a pushed delta onto the collection entry and the selected slot,
    /// each independently. Unknown ids are ignored.
    pub fn apply_partial_update(&self, id: &str, patch: &AlertPatch) -> bool {
        let in_collection = self.alerts.apply_patch(id, patch);
        let in_selected = self.selected.send_if_modified(|slot| {
            let Some(current) = slot.as_ref().filter(|a| a.id == id) else {
                return false;
            };
            let mut next = current.as_ref().clone();
            if !patch.apply(&mut next) {
                return false;
            }
            *slot = Some(Arc::new(next));
            true
        });
        in_collection || in_selected
    }

    /// Overwrite with a server-authoritative entity, wherever it is held.
    pub fn apply_authoritative(&self, alert: &Alert) -> bool {
        let in_collection = self.alerts.overwrite(alert);
        let in_selected = self.overwrite_selected(alert);
        in_collection || in_selected
    }

    /// Focus `alert` (freshly read from the server) as the detail view.
    pub fn select(&self, alert: Alert) {
        self.alerts.overwrite(&alert);
        let alert = Arc::new(alert);
        self.selected.send_if_modified(|slot| {
            if slot.as_deref() == Some(alert.as_ref()) {
                return false;
            }
            *slot = Some(alert);
            true
        });
    }

    pub fn clear_selection(&self) {
        self.selected.send_if_modified(|slot| slot.take().is_some());
    }

    /// Drop all state (logout).
    pub fn clear(&self) {
        self.alerts.clear();
        self.clear_selection();
    }

    // ── Server round-trips ───────────────────────────────────────────

    /// PATCH the alert to ACK and apply the server's answer.
    ///
    /// On rejection nothing changes locally. Repeating it is harmless.
    pub async fn acknowledge(
        &self,
        backend: &dyn AlertBackend,
        id: &str,
    ) -> Result<Arc<Alert>, CoreError> {
        self.update(backend, id, &AlertPatch::status(AlertStatus::Ack))
            .await
    }

    /// PATCH arbitrary fields and apply the server's answer.
    pub async fn update(
        &self,
        backend: &dyn AlertBackend,
        id: &str,
        patch: &AlertPatch,
    ) -> Result<Arc<Alert>, CoreError> {
        let lease = self.write_lease(id);
        let _guard = lease.lock.lock().await;
        let updated = backend.update_alert(id, patch).await?;
        self.apply_authoritative(&updated);
        Ok(Arc::new(updated))
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Arc<Alert>> {
        self.alerts.get(id)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.alerts.snapshot()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.len() == 0
    }

    pub fn selected(&self) -> Option<Arc<Alert>> {
        self.selected.borrow().clone()
    }

    pub fn subscribe(&self) -> AlertStream {
        AlertStream::new(self.alerts.subscribe())
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Arc<Alert>>> {
        self.selected.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn overwrite_selected(&self, alert: &Alert) -> bool {
        self.selected.send_if_modified(|slot| match slot {
            Some(current) if current.id == alert.id && current.as_ref() != alert => {
                *slot = Some(Arc::new(alert.clone()));
                true
            }
            _ => false,
        })
    }

    fn write_lease(&self, id: &str) -> WriteLease {
        let lock = {
            let mut locks = self.write_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id.to_owned()).or_default())
        };
        WriteLease {
            locks: Arc::clone(&self.write_locks),
            id: id.to_owned(),
            lock,
        }
    }
}

type WriteLocks = Arc<SyncMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// One writer's claim on an id's lock. Dropping it (including when the
/// owning future is cancelled) removes the map entry once unused.
struct WriteLease {
    locks: WriteLocks,
    id: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for WriteLease {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus this lease: nobody else is waiting on the id.
        let unused = locks
            .get(&self.id)
            .is_some_and(|l| Arc::ptr_eq(l, &self.lock) && Arc::strong_count(l) == 2);
        if unused {
            locks.remove(&self.id);
        }
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::fixtures::alert;
    use crate::testing::FakeBackend;

    #[test]
    fn replace_wins_over_pushed_state() {
        let store = AlertStore::new();
        store.insert_if_absent(alert("1", AlertStatus::New));
        store.replace_all(vec![alert("1", AlertStatus::Ack)]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, AlertStatus::Ack);
    }

    #[test]
    fn partial_update_reaches_collection_and_selection() {
        let store = AlertStore::new();
        store.insert_if_absent(alert("1", AlertStatus::New));
        store.select(alert("1", AlertStatus::New));

        assert!(store.apply_partial_update("1", &AlertPatch::status(AlertStatus::Resolved)));
        assert_eq!(store.get("1").unwrap().status, AlertStatus::Resolved);
        assert_eq!(store.selected().unwrap().status, AlertStatus::Resolved);
    }

    #[test]
    fn partial_update_applies_to_selection_outside_collection() {
        // The selected alert may be filtered out of the current list.
        let store = AlertStore::new();
        store.select(alert("9", AlertStatus::New));

        assert!(store.apply_partial_update("9", &AlertPatch::status(AlertStatus::Ack)));
        assert_eq!(store.selected().unwrap().status, AlertStatus::Ack);
        assert!(store.is_empty());
    }

    #[test]
    fn partial_update_for_unknown_id_changes_nothing() {
        let store = AlertStore::new();
        store.insert_if_absent(alert("1", AlertStatus::New));
        store.select(alert("1", AlertStatus::New));

        assert!(!store.apply_partial_update("nope", &AlertPatch::status(AlertStatus::Ack)));
        assert_eq!(store.get("1").unwrap().status, AlertStatus::New);
        assert_eq!(store.selected().unwrap().status, AlertStatus::New);
    }

    #[test]
    fn replace_all_refreshes_selected_alert() {
        let store = AlertStore::new();
        store.select(alert("1", AlertStatus::New));
        store.replace_all(vec![alert("1", AlertStatus::FalseAlarm)]);
        assert_eq!(store.selected().unwrap().status, AlertStatus::FalseAlarm);
    }

    #[tokio::test]
    async fn acknowledge_round_trip_is_idempotent() {
        let backend = FakeBackend::new(vec![alert("1", AlertStatus::New)]).logged_in();
        let store = AlertStore::new();
        store.replace_all(vec![alert("1", AlertStatus::New)]);
        store.select(alert("1", AlertStatus::New));

        let acked = store.acknowledge(&backend, "1").await.unwrap();
        assert_eq!(acked.status, AlertStatus::Ack);
        assert_eq!(store.get("1").unwrap().status, AlertStatus::Ack);
        assert_eq!(store.selected().unwrap().status, AlertStatus::Ack);

        let first = store.snapshot();
        let mut rx = store.subscribe_selected();
        rx.borrow_and_update();
        store.acknowledge(&backend, "1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &store.snapshot()));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(backend.update_calls(), 2);
    }

    #[tokio::test]
    async fn rejected_acknowledge_leaves_state_untouched() {
        let backend = FakeBackend::new(vec![alert("1", AlertStatus::New)]).logged_in();
        backend.reject_updates("Accès refusé");
        let store = AlertStore::new();
        store.replace_all(vec![alert("1", AlertStatus::New)]);
        let before = store.snapshot();

        let err = store.acknowledge(&backend, "1").await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[tokio::test]
    async fn concurrent_acknowledges_for_one_id_serialize() {
        let backend = Arc::new(FakeBackend::new(vec![alert("1", AlertStatus::New)]).logged_in());
        let store = Arc::new(AlertStore::new());
        store.replace_all(vec![alert("1", AlertStatus::New)]);

        let (a, b) = tokio::join!(
            store.acknowledge(backend.as_ref(), "1"),
            store.acknowledge(backend.as_ref(), "1"),
        );
        assert_eq!(a.unwrap().status, AlertStatus::Ack);
        assert_eq!(b.unwrap().status, AlertStatus::Ack);
        assert_eq!(backend.max_concurrent_updates(), 1);
        assert!(store.write_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_update_releases_its_lock_entry() {
        let backend = FakeBackend::new(vec![alert("1", AlertStatus::New)]).logged_in();
        let store = AlertStore::new();
        store.replace_all(vec![alert("1", AlertStatus::New)]);

        let held = store.write_lease("1");
        let guard = held.lock.lock().await;
        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            store.acknowledge(&backend, "1"),
        )
        .await;
        assert!(waiting.is_err());
        assert_eq!(backend.update_calls(), 0);

        drop(guard);
        drop(held);
        assert!(store.write_locks.lock().unwrap().is_empty());
        assert_eq!(store.get("1").unwrap().status, AlertStatus::New);
    }
}
