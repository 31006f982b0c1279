// ohmguard-api: Async Rust client for the OhmGuard alerting backend (REST + live stream)

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod socket;
pub mod transport;

pub use auth::{MemoryTokenStore, TokenPair, TokenStore};
pub use client::ApiClient;
pub use error::Error;
pub use socket::{PushFrame, ReconnectConfig, SocketHandle, SocketState};
pub use transport::{TlsMode, TransportConfig};
