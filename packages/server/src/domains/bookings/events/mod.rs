//! Wire events pushed through the stream hub.
//!
//! Two topic families exist: `booking:{id}` carries full booking snapshots,
//! one per committed transition, in commit order for that booking;
//! `provider:{id}:requests` carries broadcast offers while a provider is
//! online. Delivery is at-least-once — consumers must treat a repeated
//! identical snapshot as a no-op.

use serde::{Deserialize, Serialize};

use crate::common::{BookingId, ProviderId};
use crate::domains::bookings::models::{Booking, BookingRequest};
use crate::kernel::stream_hub::StreamHub;

pub fn booking_topic(id: BookingId) -> String {
    format!("booking:{}", id)
}

pub fn provider_topic(id: ProviderId) -> String {
    format!("provider:{}:requests", id)
}

/// A booking as subscribers see it. The OTP stays out of the stream — the
/// client reads it from its own booking fetch, the provider never sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSnapshot {
    pub id: BookingId,
    pub client_id: crate::common::ClientId,
    pub provider_id: Option<ProviderId>,
    pub status: crate::domains::bookings::models::BookingStatus,
    pub service_category: String,
    pub estimated_cost: Option<f64>,
    pub final_cost: Option<f64>,
    pub payment_status: crate::domains::bookings::models::PaymentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub accepted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Booking> for BookingSnapshot {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            client_id: b.client_id,
            provider_id: b.provider_id,
            status: b.status,
            service_category: b.service_category.clone(),
            estimated_cost: b.estimated_cost,
            final_cost: b.final_cost,
            payment_status: b.payment_status,
            created_at: b.created_at,
            accepted_at: b.accepted_at,
            started_at: b.started_at,
            completed_at: b.completed_at,
        }
    }
}

/// Publishes a post-commit snapshot to the booking's topic. Best-effort by
/// design: the mutation has already committed, and a missed notification is
/// recovered by the subscriber's next fetch.
pub async fn publish_status(hub: &StreamHub, booking: &Booking) {
    let snapshot = BookingSnapshot::from(booking);
    match serde_json::to_value(serde_json::json!({
        "type": "status_changed",
        "booking": snapshot,
    })) {
        Ok(payload) => hub.publish(&booking_topic(booking.id), payload).await,
        Err(e) => tracing::error!(booking_id = %booking.id, error = %e, "snapshot serialize failed"),
    }
}

/// Publishes a broadcast offer to one candidate provider's topic.
pub async fn publish_offer(hub: &StreamHub, request: &BookingRequest, booking: &Booking) {
    let snapshot = BookingSnapshot::from(booking);
    match serde_json::to_value(serde_json::json!({
        "type": "request_offer",
        "request": request,
        "booking": snapshot,
    })) {
        Ok(payload) => hub.publish(&provider_topic(request.provider_id), payload).await,
        Err(e) => tracing::error!(request_id = %request.id, error = %e, "offer serialize failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_stable() {
        let booking_id = BookingId::new();
        let provider_id = ProviderId::new();
        assert_eq!(booking_topic(booking_id), format!("booking:{}", booking_id));
        assert_eq!(
            provider_topic(provider_id),
            format!("provider:{}:requests", provider_id)
        );
    }
}
