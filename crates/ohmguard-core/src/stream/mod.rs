// ── Reactive alert streams ──
//
// Subscription types for consuming alert changes from the AlertStore.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Alert;

pub use filter::{StatusFilter, filtered_alerts};

type Snapshot = Arc<Vec<Arc<Alert>>>;

/// A subscription to the canonical alert collection.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed`](Self::changed) or by converting to a `Stream`.
pub struct AlertStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl AlertStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed`).
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Narrow the stream to alerts passing a fixed `filter`.
    pub fn filtered(self, filter: StatusFilter) -> FilteredAlertStream {
        let (_, filter) = watch::channel(filter);
        self.filtered_by(filter)
    }

    /// Narrow the stream through a filter that may change later; a new
    /// filter value yields a fresh view like a collection change does.
    pub fn filtered_by(self, filter: watch::Receiver<StatusFilter>) -> FilteredAlertStream {
        let follow = filter.has_changed().is_ok();
        FilteredAlertStream {
            inner: self,
            filter,
            follow,
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> AlertWatchStream {
        AlertWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current snapshot first, then one per change.
pub struct AlertWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for AlertWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// An [`AlertStream`] that re-applies a status filter to every snapshot.
pub struct FilteredAlertStream {
    inner: AlertStream,
    filter: watch::Receiver<StatusFilter>,
    /// False once the filter's sender is gone; the last value stays.
    follow: bool,
}

enum Wake {
    Alerts(Option<Snapshot>),
    Filter(bool),
}

impl FilteredAlertStream {
    pub fn filter(&self) -> StatusFilter {
        *self.filter.borrow()
    }

    /// Filtered view of the latest snapshot.
    pub fn latest(&self) -> Vec<Arc<Alert>> {
        filtered_alerts(&self.inner.latest(), self.filter())
    }

    /// Wait for the next collection or filter change, returning the
    /// filtered view.
    pub async fn changed(&mut self) -> Option<Vec<Arc<Alert>>> {
        loop {
            let wake = tokio::select! {
                snap = self.inner.changed() => Wake::Alerts(snap),
                res = self.filter.changed(), if self.follow => Wake::Filter(res.is_ok()),
            };
            match wake {
                Wake::Alerts(snap) => return Some(filtered_alerts(&snap?, self.filter())),
                Wake::Filter(true) => {
                    let filter = *self.filter.borrow_and_update();
                    return Some(filtered_alerts(&self.inner.latest(), filter));
                }
                Wake::Filter(false) => self.follow = false,
            }
        }
    }
}
