// ── API-to-domain type conversions ──
//
// Bridges `ohmguard_api` wire types into `ohmguard_core::model` domain
// types and back for request bodies.

use ohmguard_api::models::{
    EventQuery, EventResponse, EventUpdateRequest, LocationResponse, UserResponse,
};
use tracing::warn;

use crate::error::CoreError;
use crate::model::{
    Alert, AlertPatch, AlertQuery, AlertStatus, AlertTime, AlertType, Location, Role, Severity,
    User,
};

// ── Alert ──────────────────────────────────────────────────────────

impl TryFrom<EventResponse> for Alert {
    type Error = CoreError;

    /// Fails only on a status outside the workflow; every other field
    /// degrades to a default.
    fn try_from(event: EventResponse) -> Result<Self, Self::Error> {
        let status: AlertStatus = event.status.parse().map_err(|_| CoreError::Internal(
            format!("alert {} has unknown status {:?}", event.id, event.status),
        ))?;

        Ok(Alert {
            alert_type: AlertType::from_wire(&event.event_type),
            severity: Severity::from_wire(&event.severity),
            status,
            confidence: event.confidence,
            timestamp: event.timestamp.as_deref().map(AlertTime::parse),
            occurred_at: event.occurred_at.as_deref().map(AlertTime::parse),
            sensor_id: event.sensor_id,
            device_id: event.device_id,
            tenant_id: event.tenant_id,
            site_id: event.site_id,
            zone_id: event.zone_id,
            location_path: event.location_path,
            location: event.location.map(Location::from),
            radar_name: event.radar_name,
            serial_product: event.serial_product,
            assigned_to: event.assigned_to,
            notes: event.notes,
            id: event.id,
        })
    }
}

impl From<LocationResponse> for Location {
    fn from(loc: LocationResponse) -> Self {
        Location {
            client_name: loc.client_name,
            building_name: loc.building_name,
            floor_name: loc.floor_name,
            room_number: loc.room_number,
            zone_name: loc.zone_name,
        }
    }
}

/// Convert a fetched page, skipping entries that cannot be represented.
pub(crate) fn alerts_from_page(page: Vec<EventResponse>) -> Vec<Alert> {
    page.into_iter()
        .filter_map(|event| match Alert::try_from(event) {
            Ok(alert) => Some(alert),
            Err(e) => {
                warn!(error = %e, "skipping alert");
                None
            }
        })
        .collect()
}

// ── User ───────────────────────────────────────────────────────────

impl From<UserResponse> for User {
    /// Unrecognised roles get the least-privileged role.
    fn from(user: UserResponse) -> Self {
        let role = user.role.parse().unwrap_or_else(|_| {
            warn!(role = %user.role, "unknown role, treating as viewer");
            Role::Viewer
        });
        User {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role,
            tenant_id: user.tenant_id,
            language: user.language,
            is_active: user.is_active,
        }
    }
}

// ── Requests ───────────────────────────────────────────────────────

impl From<&AlertQuery> for EventQuery {
    fn from(query: &AlertQuery) -> Self {
        EventQuery {
            status: query.status.map(|s| s.to_string()),
            event_type: query.alert_type.map(|t| t.to_string()),
            limit: query.limit,
            skip: query.skip,
        }
    }
}

impl From<&AlertPatch> for EventUpdateRequest {
    fn from(patch: &AlertPatch) -> Self {
        EventUpdateRequest {
            status: patch.status.map(|s| s.to_string()),
            assigned_to: patch.assigned_to.clone(),
            notes: patch.notes.clone(),
        }
    }
}
