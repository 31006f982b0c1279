// ── Canonical alert state ──

mod alert_store;
mod collection;

pub use alert_store::AlertStore;
