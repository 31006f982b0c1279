// ── Reactive alert collection ──
//
// Ordered storage with push-based change notification via a `watch`
// channel. Every read-modify-write runs inside one `send_if_modified`
// closure, so it holds the channel's write lock for its whole duration
// and subscribers only wake when something actually changed.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{Alert, AlertPatch};

pub(crate) type Snapshot = Arc<Vec<Arc<Alert>>>;

/// The canonical, ordered alert collection. `id` is unique within it.
pub(crate) struct AlertCollection {
    snapshot: watch::Sender<Snapshot>,
}

impl AlertCollection {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { snapshot }
    }

    /// Wholesale replace with the server's set and order.
    ///
    /// Duplicate ids in the batch keep their first occurrence.
    pub(crate) fn replace_all(&self, alerts: Vec<Alert>) {
        let mut seen = std::collections::HashSet::with_capacity(alerts.len());
        let values: Vec<Arc<Alert>> = alerts
            .into_iter()
            .filter(|a| seen.insert(a.id.clone()))
            .map(Arc::new)
            .collect();

        self.snapshot.send_if_modified(|snap| {
            if same_contents(snap, &values) {
                return false;
            }
            *snap = Arc::new(values);
            true
        });
    }

    /// Prepend `alert` unless its id is already present. Returns `true` if inserted.
    pub(crate) fn insert_if_absent(&self, alert: Alert) -> bool {
        self.snapshot.send_if_modified(|snap| {
            if snap.iter().any(|a| a.id == alert.id) {
                return false;
            }
            let mut values = Vec::with_capacity(snap.len() + 1);
            values.push(Arc::new(alert));
            values.extend(snap.iter().cloned());
            *snap = Arc::new(values);
            true
        })
    }

    /// Merge `patch` onto the entry with `id`. Returns `true` if it changed.
    pub(crate) fn apply_patch(&self, id: &str, patch: &AlertPatch) -> bool {
        self.replace_entry(id, |current| {
            let mut next = current.clone();
            patch.apply(&mut next).then_some(next)
        })
    }

    /// Overwrite the entry with `alert.id` wholesale. Absent ids are ignored.
    pub(crate) fn overwrite(&self, alert: &Alert) -> bool {
        self.replace_entry(&alert.id, |current| (current != alert).then(|| alert.clone()))
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<Alert>> {
        self.snapshot.borrow().iter().find(|a| a.id == id).cloned()
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    pub(crate) fn clear(&self) {
        self.snapshot.send_if_modified(|snap| {
            if snap.is_empty() {
                return false;
            }
            *snap = Arc::new(Vec::new());
            true
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Swap the entry with `id` for whatever `update` returns, in place.
    fn replace_entry(&self, id: &str, update: impl FnOnce(&Alert) -> Option<Alert>) -> bool {
        self.snapshot.send_if_modified(|snap| {
            let Some(index) = snap.iter().position(|a| a.id == id) else {
                return false;
            };
            let Some(next) = update(&snap[index]) else {
                return false;
            };
            let mut values = snap.as_ref().clone();
            values[index] = Arc::new(next);
            *snap = Arc::new(values);
            true
        })
    }
}

fn same_contents(current: &[Arc<Alert>], next: &[Arc<Alert>]) -> bool {
    current.len() == next.len() && current.iter().zip(next).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{AlertStatus, fixtures::alert};

    fn ids(collection: &AlertCollection) -> Vec<String> {
        collection.snapshot().iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn insert_prepends_and_never_duplicates() {
        let collection = AlertCollection::new();
        for id in ["a", "b", "a", "c", "b", "a"] {
            collection.insert_if_absent(alert(id, AlertStatus::New));
        }
        assert_eq!(ids(&collection), vec!["c", "b", "a"]);
    }

    #[test]
    fn replace_all_keeps_server_order_and_wins() {
        let collection = AlertCollection::new();
        collection.insert_if_absent(alert("1", AlertStatus::New));
        collection.replace_all(vec![alert("2", AlertStatus::New), alert("1", AlertStatus::Ack)]);

        assert_eq!(ids(&collection), vec!["2", "1"]);
        assert_eq!(collection.get("1").map(|a| a.status), Some(AlertStatus::Ack));
    }

    #[test]
    fn replace_all_collapses_duplicate_ids() {
        let collection = AlertCollection::new();
        collection.replace_all(vec![
            alert("1", AlertStatus::New),
            alert("1", AlertStatus::Ack),
        ]);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("1").map(|a| a.status), Some(AlertStatus::New));
    }

    #[test]
    fn patch_on_unknown_id_is_a_silent_no_op() {
        let collection = AlertCollection::new();
        collection.insert_if_absent(alert("1", AlertStatus::New));
        let before = collection.snapshot();

        assert!(!collection.apply_patch("missing", &AlertPatch::status(AlertStatus::Ack)));
        assert!(Arc::ptr_eq(&before, &collection.snapshot()));
    }

    #[test]
    fn overwrite_ignores_absent_ids() {
        let collection = AlertCollection::new();
        assert!(!collection.overwrite(&alert("ghost", AlertStatus::Ack)));
        assert_eq!(collection.len(), 0);
    }

    #[tokio::test]
    async fn no_op_mutations_do_not_notify() {
        let collection = AlertCollection::new();
        let mut rx = collection.subscribe();

        collection.insert_if_absent(alert("1", AlertStatus::New));
        assert!(rx.has_changed().unwrap_or(false));
        rx.borrow_and_update();

        collection.insert_if_absent(alert("1", AlertStatus::Ack));
        collection.apply_patch("1", &AlertPatch::status(AlertStatus::New));
        collection.replace_all(vec![alert("1", AlertStatus::New)]);
        assert!(!rx.has_changed().unwrap_or(true));

        collection.apply_patch("1", &AlertPatch::status(AlertStatus::Resolved));
        assert!(rx.has_changed().unwrap_or(false));
    }
}
