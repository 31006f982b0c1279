// REST and push payload types
//
// Wire shapes for the OhmGuard backend. Enumerated values (status, type,
// severity, role) stay as strings here; `ohmguard-core` owns the domain
// enums and the conversion. Fields use `#[serde(default)]` liberally because
// push payloads carry raw database documents without the REST enrichment.

use serde::{Deserialize, Deserializer, Serialize};

// ── Auth ─────────────────────────────────────────────────────────────

/// Body for `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Token pair returned by `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

/// Authenticated user from `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_language() -> String {
    "fr".into()
}

fn default_true() -> bool {
    true
}

// ── Events ───────────────────────────────────────────────────────────

/// Event document from `GET /events`, `GET /events/{id}`, `PATCH /events/{id}`,
/// and the `event` field of `new_event` / `new_radar_event` pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: String,
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location_path: Option<String>,
    #[serde(default)]
    pub location: Option<LocationResponse>,
    #[serde(default)]
    pub radar_name: Option<String>,
    #[serde(default)]
    pub serial_product: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_severity() -> String {
    "LOW".into()
}

fn default_status() -> String {
    "NEW".into()
}

/// Structured location attached to enriched events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationResponse {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub floor_name: Option<String>,
    /// Rooms store their number as either a string or an integer.
    #[serde(default, deserialize_with = "string_or_number")]
    pub room_number: Option<String>,
    #[serde(default)]
    pub zone_name: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Query parameters for `GET /events`.
///
/// The server caps `limit` at 500 and defaults it to 100.
#[derive(Debug, Clone, Serialize)]
pub struct EventQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    pub limit: u32,
    pub skip: u32,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            status: None,
            event_type: None,
            limit: 100,
            skip: 0,
        }
    }
}

/// Body for `PATCH /events/{id}`. Absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Response of `POST /create-fall-event`.
#[derive(Debug, Clone, Deserialize)]
pub struct FallEventCreated {
    pub message: String,
    pub event_id: String,
}

// ── Push tokens ──────────────────────────────────────────────────────

/// Body for `POST /push-tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct PushTokenRequest {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

/// Response of `POST /push-tokens` and `DELETE /push-tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct PushTokenResponse {
    pub message: String,
    #[serde(default)]
    pub token_id: Option<String>,
}

// ── System ───────────────────────────────────────────────────────────

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// ── Errors ───────────────────────────────────────────────────────────

/// FastAPI error body: `{"detail": "..."}` or `{"detail": [{"msg": ...}, ...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Flatten `detail` into one human-readable line.
    pub(crate) fn message(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn push_payload_without_enrichment_decodes_with_defaults() {
        let json = serde_json::json!({
            "id": "evt-1",
            "sensor_id": "sensor-1",
            "type": "FALL",
            "tenant_id": "tenant-1",
            "timestamp": "2026-03-01T10:00:00+00:00"
        });

        let event: EventResponse = serde_json::from_value(json).unwrap();
        assert_eq!(event.event_type, "FALL");
        assert_eq!(event.status, "NEW");
        assert_eq!(event.severity, "LOW");
        assert!((event.confidence - 1.0).abs() < f64::EPSILON);
        assert!(event.location.is_none());
        assert!(event.occurred_at.is_none());
    }

    #[test]
    fn room_number_accepts_integers() {
        let json = serde_json::json!({ "client_name": "Résidence Les Tilleuls", "room_number": 101 });
        let location: LocationResponse = serde_json::from_value(json).unwrap();
        assert_eq!(location.room_number.as_deref(), Some("101"));
    }

    #[test]
    fn event_query_omits_empty_filters() {
        let query = EventQuery {
            status: Some("NEW".into()),
            ..EventQuery::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["status"], "NEW");
        assert!(value.get("event_type").is_none());
        assert_eq!(value["limit"], 100);
    }

    #[test]
    fn error_detail_string_and_validation_list() {
        let simple: ErrorBody =
            serde_json::from_str(r#"{"detail": "Événement non trouvé"}"#).unwrap();
        assert_eq!(simple.message().as_deref(), Some("Événement non trouvé"));

        let validation: ErrorBody = serde_json::from_str(
            r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"},
                           {"loc": ["body", "password"], "msg": "field required"}]}"#,
        )
        .unwrap();
        assert_eq!(
            validation.message().as_deref(),
            Some("field required; field required")
        );

        let odd: ErrorBody = serde_json::from_str(r#"{"detail": 42}"#).unwrap();
        assert!(odd.message().is_none());
    }
}
