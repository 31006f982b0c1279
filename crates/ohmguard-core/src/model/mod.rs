// ── Domain model ──

mod alert;
mod user;

pub use alert::{Alert, AlertPatch, AlertStatus, AlertTime, AlertType, Location, Severity};
pub use user::{Role, User};

#[cfg(test)]
pub(crate) use alert::fixtures;

/// Server-side list query, expressed in domain types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub limit: u32,
    pub skip: u32,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            status: None,
            alert_type: None,
            limit: 100,
            skip: 0,
        }
    }
}
