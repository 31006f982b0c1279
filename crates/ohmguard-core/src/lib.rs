// ohmguard-core: Real-time alert state between ohmguard-api and consumers (CLI).

pub mod backend;
pub mod config;
pub mod connection;
pub mod convert;
pub mod error;
pub mod model;
pub mod normalize;
pub mod session;
pub mod store;
pub mod stream;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::AlertBackend;
pub use config::{ReconnectPolicy, SessionConfig, TlsVerification};
pub use connection::{ConnectionManager, ConnectionState, PushTransport, SocketTransport};
pub use error::CoreError;
pub use normalize::{PushEvent, normalize};
pub use session::{Session, SessionState, build_api_client};
pub use store::AlertStore;
pub use stream::{AlertStream, FilteredAlertStream, StatusFilter, filtered_alerts};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Alert, AlertPatch, AlertQuery, AlertStatus, AlertTime, AlertType, Location, Role, Severity,
    User,
};
