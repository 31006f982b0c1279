// ── Push event normalization ──
//
// Turns raw Socket.IO frames into domain events. Anything that is not a
// fall-class alert, an alert update, or a room join is dropped here and
// never reaches the store.

use ohmguard_api::PushFrame;
use ohmguard_api::models::EventResponse;
use serde_json::Value;
use tracing::debug;

use crate::model::{Alert, AlertPatch, AlertStatus};

pub const NEW_EVENT: &str = "new_event";
pub const NEW_RADAR_EVENT: &str = "new_radar_event";
pub const EVENT_UPDATED: &str = "event_updated";
pub const JOINED: &str = "joined";

/// A push frame that survived validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A FALL or PRE_FALL alert raised in the tenant.
    NewAlert(Alert),
    /// Field-level change to an existing alert.
    AlertUpdated { id: String, patch: AlertPatch },
    /// Diagnostic: the server confirmed our room membership.
    Joined { tenant_id: String, room: String },
}

/// Classify a frame, or `None` if it should be ignored.
pub fn normalize(frame: &PushFrame) -> Option<PushEvent> {
    match frame.name.as_str() {
        NEW_EVENT | NEW_RADAR_EVENT => new_alert(&frame.payload),
        EVENT_UPDATED => alert_updated(&frame.payload),
        JOINED => Some(PushEvent::Joined {
            tenant_id: string_field(&frame.payload, "tenant_id").unwrap_or_default(),
            room: string_field(&frame.payload, "room").unwrap_or_default(),
        }),
        other => {
            debug!(event = other, "ignoring push event");
            None
        }
    }
}

fn new_alert(payload: &Value) -> Option<PushEvent> {
    // `{type, event}` envelope; bare events are tolerated.
    let raw = payload.get("event").unwrap_or(payload).clone();
    let event: EventResponse = match serde_json::from_value(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "dropping undecodable alert push");
            return None;
        }
    };
    let alert = match Alert::try_from(event) {
        Ok(alert) => alert,
        Err(e) => {
            debug!(error = %e, "dropping alert push");
            return None;
        }
    };

    if alert.alert_type.is_fall_class() {
        Some(PushEvent::NewAlert(alert))
    } else {
        debug!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            "dropping non-fall alert push"
        );
        None
    }
}

fn alert_updated(payload: &Value) -> Option<PushEvent> {
    let Some(id) = string_field(payload, "event_id") else {
        debug!("dropping update push without event_id");
        return None;
    };
    let update = payload.get("update").unwrap_or(&Value::Null);

    let status = string_field(update, "status").and_then(|raw| match raw.parse::<AlertStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            debug!(alert_id = %id, status = %raw, "ignoring unknown status in update push");
            None
        }
    });

    Some(PushEvent::AlertUpdated {
        patch: AlertPatch {
            status,
            assigned_to: string_field(update, "assigned_to"),
            notes: string_field(update, "notes"),
        },
        id,
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::AlertType;

    fn frame(name: &str, payload: Value) -> PushFrame {
        PushFrame {
            name: name.into(),
            payload,
        }
    }

    #[test]
    fn fall_alert_is_admitted() {
        let event = normalize(&frame(
            NEW_EVENT,
            json!({"type": "new_event", "event": {"id": "e1", "type": "FALL", "severity": "HIGH"}}),
        ));
        let Some(PushEvent::NewAlert(alert)) = event else {
            panic!("expected a new alert, got {event:?}");
        };
        assert_eq!(alert.id, "e1");
        assert_eq!(alert.alert_type, AlertType::Fall);
    }

    #[test]
    fn radar_pre_fall_is_admitted() {
        let event = normalize(&frame(
            NEW_RADAR_EVENT,
            json!({"type": "new_radar_event", "event": {"id": "e2", "type": "PRE_FALL"}}),
        ));
        assert!(matches!(event, Some(PushEvent::NewAlert(ref a)) if a.alert_type == AlertType::PreFall));
    }

    #[test]
    fn non_fall_and_garbage_are_dropped() {
        let presence = frame(NEW_EVENT, json!({"event": {"id": "e3", "type": "PRESENCE"}}));
        assert_eq!(normalize(&presence), None);

        let unknown = frame(NEW_EVENT, json!({"event": {"id": "e4", "type": "SMOKE"}}));
        assert_eq!(normalize(&unknown), None);

        let garbage = frame(NEW_EVENT, json!({"event": "not an object"}));
        assert_eq!(normalize(&garbage), None);

        assert_eq!(normalize(&frame("typing", json!({}))), None);
    }

    #[test]
    fn update_passes_through_as_patch() {
        let event = normalize(&frame(
            EVENT_UPDATED,
            json!({"type": "event_updated", "event_id": "e1", "update": {"status": "ACK", "notes": "ok"}}),
        ));
        assert_eq!(
            event,
            Some(PushEvent::AlertUpdated {
                id: "e1".into(),
                patch: AlertPatch {
                    status: Some(AlertStatus::Ack),
                    assigned_to: None,
                    notes: Some("ok".into()),
                },
            })
        );
    }

    #[test]
    fn update_without_id_is_dropped() {
        assert_eq!(normalize(&frame(EVENT_UPDATED, json!({"update": {}}))), None);
    }

    #[test]
    fn joined_is_diagnostic() {
        assert_eq!(
            normalize(&frame(JOINED, json!({"tenant_id": "t1", "room": "tenant_t1"}))),
            Some(PushEvent::Joined {
                tenant_id: "t1".into(),
                room: "tenant_t1".into(),
            })
        );
    }
}
