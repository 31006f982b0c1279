// ── Status filter ──
//
// Derives the visible alert list without touching the source snapshot.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::model::{Alert, AlertStatus};

/// Which alerts a view shows. Held per session, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AlertStatus),
}

impl StatusFilter {
    pub fn matches(self, alert: &Alert) -> bool {
        match self {
            Self::All => true,
            Self::Only(status) => alert.status == status,
        }
    }

    /// The status to ask the server for, if any.
    pub fn status(self) -> Option<AlertStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status),
        }
    }
}

impl From<AlertStatus> for StatusFilter {
    fn from(status: AlertStatus) -> Self {
        Self::Only(status)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Only(status) => write!(f, "{status}"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = strum::ParseError;

    /// `ALL` or any status name, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace('-', "_");
        if upper == "ALL" {
            Ok(Self::All)
        } else {
            upper.parse().map(Self::Only)
        }
    }
}

/// The alerts of `alerts` that pass `filter`, in their existing order.
pub fn filtered_alerts(alerts: &[Arc<Alert>], filter: StatusFilter) -> Vec<Arc<Alert>> {
    alerts.iter().filter(|a| filter.matches(a)).cloned().collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::fixtures::alert;

    fn collection() -> Vec<Arc<Alert>> {
        vec![
            Arc::new(alert("1", AlertStatus::New)),
            Arc::new(alert("2", AlertStatus::Ack)),
            Arc::new(alert("3", AlertStatus::New)),
            Arc::new(alert("4", AlertStatus::FalseAlarm)),
        ]
    }

    fn ids(alerts: &[Arc<Alert>]) -> Vec<&str> {
        alerts.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn all_passes_everything_in_order() {
        let source = collection();
        assert_eq!(ids(&filtered_alerts(&source, StatusFilter::All)), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn status_filter_is_exact_and_pure() {
        let source = collection();
        let before: Vec<Alert> = source.iter().map(|a| a.as_ref().clone()).collect();

        let first = filtered_alerts(&source, AlertStatus::New.into());
        let second = filtered_alerts(&source, AlertStatus::New.into());
        assert_eq!(ids(&first), vec!["1", "3"]);
        assert_eq!(first, second);

        let after: Vec<Alert> = source.iter().map(|a| a.as_ref().clone()).collect();
        assert_eq!(before, after);
        assert!(filtered_alerts(&source, AlertStatus::Resolved.into()).is_empty());
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "false-alarm".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(AlertStatus::FalseAlarm)
        );
        assert!("pending".parse::<StatusFilter>().is_err());
        assert_eq!(StatusFilter::Only(AlertStatus::Ack).to_string(), "ACK");
    }
}
