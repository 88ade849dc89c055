//! Shared value types used across domains.

use serde::{Deserialize, Serialize};

use super::entity_ids::{ClientId, OperatorId, ProviderId};

/// A geographic point (WGS84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometers (haversine).
    ///
    /// Good enough for a geofence radius check; we are not doing routing.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// The party issuing a lifecycle command.
///
/// Authorization in the lifecycle machine is keyed on this: providers drive
/// operational transitions, clients may cancel their own bookings, operators
/// are the audited superuser bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Client(ClientId),
    Provider(ProviderId),
    Operator(OperatorId),
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Client(id) => write!(f, "client:{}", id),
            Actor::Provider(id) => write!(f, "provider:{}", id),
            Actor::Operator(id) => write!(f, "operator:{}", id),
        }
    }
}
