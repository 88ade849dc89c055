//! In-memory booking store for tests and local development.
//!
//! One mutex over both maps makes every compare-and-set trivially atomic —
//! the same guarantee the Postgres store gets from its guarded UPDATE. The
//! lock is never held across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BookingStore, TransitionFields};
use crate::common::{BookingId, RequestId};
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{
    Booking, BookingRequest, BookingStatus, ChecklistItem, PaymentStatus, RequestStatus,
};

#[derive(Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    requests: HashMap<RequestId, BookingRequest>,
}

#[derive(Default)]
pub struct MemoryBookingStore {
    tables: Mutex<Tables>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only happens if another test thread panicked while
        // holding it; propagating the panic is the right behavior there.
        self.tables.lock().expect("booking store lock poisoned")
    }
}

fn apply_fields(booking: &mut Booking, fields: &TransitionFields) {
    if let Some(provider_id) = fields.provider_id {
        booking.provider_id = Some(provider_id);
    }
    if let Some(at) = fields.accepted_at {
        booking.accepted_at = Some(at);
    }
    if let Some(at) = fields.started_at {
        booking.started_at = Some(at);
    }
    if let Some(at) = fields.completed_at {
        booking.completed_at = Some(at);
    }
    if let Some(cost) = fields.final_cost {
        booking.final_cost = Some(cost);
    }
    if let Some(payment) = fields.payment_status {
        booking.payment_status = payment;
    }
    if let Some(reason) = &fields.cancel_reason {
        booking.cancel_reason = Some(reason.clone());
    }
    if let Some(checklist) = &fields.checklist {
        booking.checklist = checklist.clone();
    }
    booking.updated_at = Utc::now();
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, BookingError> {
        let mut tables = self.lock();
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        self.lock()
            .bookings
            .get(&id)
            .cloned()
            .ok_or(BookingError::BookingNotFound(id))
    }

    async fn compare_and_transition(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        fields: TransitionFields,
    ) -> Result<Booking, BookingError> {
        let mut tables = self.lock();
        let booking = tables
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(id))?;

        if booking.status != expected {
            return Err(BookingError::Conflict {
                expected,
                actual: booking.status,
            });
        }

        booking.status = next;
        apply_fields(booking, &fields);
        Ok(booking.clone())
    }

    async fn insert_requests(
        &self,
        requests: Vec<BookingRequest>,
    ) -> Result<Vec<BookingRequest>, BookingError> {
        let mut tables = self.lock();
        for request in &requests {
            tables.requests.insert(request.id, request.clone());
        }
        Ok(requests)
    }

    async fn request(&self, id: RequestId) -> Result<BookingRequest, BookingError> {
        self.lock()
            .requests
            .get(&id)
            .cloned()
            .ok_or(BookingError::RequestNotFound(id))
    }

    async fn requests_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<BookingRequest>, BookingError> {
        let tables = self.lock();
        let mut requests: Vec<_> = tables
            .requests
            .values()
            .filter(|r| r.booking_id == booking_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn resolve_request(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<BookingRequest, BookingError> {
        let mut tables = self.lock();
        let (current, booking_id) = match tables.requests.get(&id) {
            Some(request) => (request.status, request.booking_id),
            None => return Err(BookingError::RequestNotFound(id)),
        };

        if current != expected {
            // Surface the booking's status so callers see what moved
            let actual = tables
                .bookings
                .get(&booking_id)
                .map(|b| b.status)
                .unwrap_or(BookingStatus::Expired);
            return Err(BookingError::Conflict {
                expected: BookingStatus::Pending,
                actual,
            });
        }

        match tables.requests.get_mut(&id) {
            Some(request) => {
                request.status = next;
                Ok(request.clone())
            }
            None => Err(BookingError::RequestNotFound(id)),
        }
    }

    async fn stale_broadcasts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        let tables = self.lock();
        let mut stale: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| {
                matches!(b.status, BookingStatus::Requested | BookingStatus::Pending)
                    && b.created_at < cutoff
            })
            .cloned()
            .collect();
        stale.sort_by_key(|b| b.created_at);
        Ok(stale)
    }

    async fn record_payment(
        &self,
        id: BookingId,
        payment: PaymentStatus,
    ) -> Result<Booking, BookingError> {
        let mut tables = self.lock();
        let booking = tables
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(id))?;

        if booking.status != BookingStatus::Completed {
            return Err(BookingError::Conflict {
                expected: BookingStatus::Completed,
                actual: booking.status,
            });
        }

        booking.payment_status = payment;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn update_checklist(
        &self,
        id: BookingId,
        checklist: Vec<ChecklistItem>,
    ) -> Result<Booking, BookingError> {
        let mut tables = self.lock();
        let booking = tables
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(id))?;

        if booking.status.is_terminal() {
            return Err(BookingError::TerminalState(booking.status));
        }

        booking.checklist = checklist;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ClientId, Coordinates, ProviderId};
    use crate::domains::bookings::otp;

    fn requested_booking() -> Booking {
        let now = Utc::now();
        Booking {
            id: BookingId::new(),
            client_id: ClientId::new(),
            provider_id: None,
            status: BookingStatus::Requested,
            service_category: "Plumber".to_string(),
            requirements: serde_json::json!({}),
            notes: None,
            otp: otp::generate(4),
            checklist: Vec::new(),
            estimated_cost: None,
            final_cost: None,
            payment_status: PaymentStatus::Pending,
            cancel_reason: None,
            location: Coordinates::new(28.70, 76.96),
            created_at: now,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn cas_succeeds_on_matching_status() {
        let store = MemoryBookingStore::new();
        let booking = store.insert_booking(requested_booking()).await.unwrap();

        let updated = store
            .compare_and_transition(
                booking.id,
                BookingStatus::Requested,
                BookingStatus::Pending,
                TransitionFields::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn cas_fails_on_stale_expected_status() {
        let store = MemoryBookingStore::new();
        let booking = store.insert_booking(requested_booking()).await.unwrap();

        store
            .compare_and_transition(
                booking.id,
                BookingStatus::Requested,
                BookingStatus::Pending,
                TransitionFields::default(),
            )
            .await
            .unwrap();

        let err = store
            .compare_and_transition(
                booking.id,
                BookingStatus::Requested,
                BookingStatus::Expired,
                TransitionFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Conflict {
                actual: BookingStatus::Pending,
                ..
            }
        ));

        // Status unchanged by the failed CAS
        let current = store.booking(booking.id).await.unwrap();
        assert_eq!(current.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn request_resolution_is_exactly_once() {
        let store = MemoryBookingStore::new();
        let booking = store.insert_booking(requested_booking()).await.unwrap();
        let offer = BookingRequest::offer(booking.id, ProviderId::new());
        store.insert_requests(vec![offer.clone()]).await.unwrap();

        store
            .resolve_request(offer.id, RequestStatus::Pending, RequestStatus::Accepted)
            .await
            .unwrap();

        let err = store
            .resolve_request(offer.id, RequestStatus::Pending, RequestStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict { .. }));
    }

    #[tokio::test]
    async fn stale_broadcasts_only_cover_requested_and_pending() {
        let store = MemoryBookingStore::new();
        let mut old = requested_booking();
        old.created_at = Utc::now() - chrono::Duration::seconds(60);
        let old = store.insert_booking(old).await.unwrap();
        store.insert_booking(requested_booking()).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::seconds(20);
        let stale = store.stale_broadcasts(cutoff).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);
    }
}
