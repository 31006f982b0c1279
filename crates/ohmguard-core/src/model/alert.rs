// ── Alert domain types ──

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

/// What the sensor detected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Fall,
    PreFall,
    Presence,
    Inactivity,
    Unknown,
}

impl AlertType {
    /// Parse a wire value; unrecognised strings become [`Unknown`](Self::Unknown).
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unknown)
    }

    /// FALL and PRE_FALL are the only types raised as live alerts.
    pub fn is_fall_class(self) -> bool {
        matches!(self, Self::Fall | Self::PreFall)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Med,
    High,
}

impl Severity {
    /// Parse a wire value; the backend's default is LOW.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Low)
    }
}

/// Lifecycle state. Only the server moves an alert between states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    New,
    Ack,
    Resolved,
    FalseAlarm,
}

/// A wire timestamp that keeps its raw form when it does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTime {
    raw: String,
    parsed: Option<DateTime<FixedOffset>>,
}

impl AlertTime {
    /// Accepts RFC 3339 and offset-less ISO-8601 (read as UTC).
    pub fn parse(raw: &str) -> Self {
        let parsed = DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        });
        Self {
            raw: raw.to_owned(),
            parsed,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.parsed
    }

    /// Parsed value in UTC, for ordering and "time ago" displays.
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        self.parsed.map(|dt| dt.with_timezone(&Utc))
    }
}

impl fmt::Display for AlertTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parsed {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => f.write_str(&self.raw),
        }
    }
}

impl Serialize for AlertTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Where the sensor is installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub client_name: Option<String>,
    pub building_name: Option<String>,
    pub floor_name: Option<String>,
    pub room_number: Option<String>,
    pub zone_name: Option<String>,
}

impl Location {
    /// `Client > Building > Floor > Ch. 12`, skipping empty parts.
    pub fn label(&self) -> Option<String> {
        let room = self
            .room_number
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| format!("Ch. {r}"));
        let parts: Vec<String> = [
            self.client_name.clone(),
            self.building_name.clone(),
            self.floor_name.clone(),
            room,
            self.zone_name.clone(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" > "))
        }
    }
}

/// A safety alert raised by a radar sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub confidence: f64,
    pub timestamp: Option<AlertTime>,
    pub occurred_at: Option<AlertTime>,

    pub sensor_id: Option<String>,
    pub device_id: Option<String>,
    pub tenant_id: Option<String>,
    pub site_id: Option<String>,
    pub zone_id: Option<String>,

    pub location_path: Option<String>,
    pub location: Option<Location>,
    pub radar_name: Option<String>,
    pub serial_product: Option<String>,

    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

impl Alert {
    /// `occurred_at` when known, otherwise the server `timestamp`.
    pub fn display_time(&self) -> Option<&AlertTime> {
        self.occurred_at.as_ref().or(self.timestamp.as_ref())
    }

    /// Human-readable location, preferring the server-built path.
    pub fn location_label(&self) -> Option<String> {
        self.location_path
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| self.location.as_ref().and_then(Location::label))
    }
}

/// Field-level change to an alert: the body of a PATCH and the `update`
/// of an `event_updated` push. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertPatch {
    pub status: Option<AlertStatus>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

impl AlertPatch {
    pub fn status(status: AlertStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none() && self.notes.is_none()
    }

    /// Merge onto `alert`. Returns `false` when nothing changed.
    pub fn apply(&self, alert: &mut Alert) -> bool {
        let mut changed = false;
        if let Some(status) = self.status {
            changed |= alert.status != status;
            alert.status = status;
        }
        if let Some(ref assigned_to) = self.assigned_to {
            changed |= alert.assigned_to.as_ref() != Some(assigned_to);
            alert.assigned_to = Some(assigned_to.clone());
        }
        if let Some(ref notes) = self.notes {
            changed |= alert.notes.as_ref() != Some(notes);
            alert.notes = Some(notes.clone());
        }
        changed
    }
}
