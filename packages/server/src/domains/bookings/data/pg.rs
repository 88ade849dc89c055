//! Postgres-backed booking store.
//!
//! Thin glue over the SQL in `models/` — the CAS guard is the
//! `WHERE id = $1 AND status = $expected` clause, so atomicity comes from
//! the database, not from any in-process lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{BookingStore, TransitionFields};
use crate::common::{BookingId, RequestId};
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{
    Booking, BookingRequest, BookingStatus, ChecklistItem, PaymentStatus, RequestStatus,
};

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, BookingError> {
        Ok(booking.insert(&self.pool).await?)
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        Booking::find_by_id(id, &self.pool)
            .await?
            .ok_or(BookingError::BookingNotFound(id))
    }

    async fn compare_and_transition(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        fields: TransitionFields,
    ) -> Result<Booking, BookingError> {
        match Booking::compare_and_transition(id, expected, next, &fields, &self.pool).await? {
            Some(updated) => Ok(updated),
            None => {
                // Guard failed: distinguish "gone" from "moved"
                let current = Booking::find_by_id(id, &self.pool)
                    .await?
                    .ok_or(BookingError::BookingNotFound(id))?;
                Err(BookingError::Conflict {
                    expected,
                    actual: current.status,
                })
            }
        }
    }

    async fn insert_requests(
        &self,
        requests: Vec<BookingRequest>,
    ) -> Result<Vec<BookingRequest>, BookingError> {
        BookingRequest::insert_many(&requests, &self.pool).await?;
        Ok(requests)
    }

    async fn request(&self, id: RequestId) -> Result<BookingRequest, BookingError> {
        BookingRequest::find_by_id(id, &self.pool)
            .await?
            .ok_or(BookingError::RequestNotFound(id))
    }

    async fn requests_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<BookingRequest>, BookingError> {
        Ok(BookingRequest::find_by_booking(booking_id, &self.pool).await?)
    }

    async fn resolve_request(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<BookingRequest, BookingError> {
        match BookingRequest::compare_and_resolve(id, expected, next, &self.pool).await? {
            Some(updated) => Ok(updated),
            None => {
                let current = BookingRequest::find_by_id(id, &self.pool)
                    .await?
                    .ok_or(BookingError::RequestNotFound(id))?;
                // Surface the booking-level vocabulary for a stale request
                let booking = self.booking(current.booking_id).await?;
                Err(BookingError::Conflict {
                    expected: BookingStatus::Pending,
                    actual: booking.status,
                })
            }
        }
    }

    async fn stale_broadcasts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        Ok(Booking::find_stale_broadcasts(cutoff, &self.pool).await?)
    }

    async fn record_payment(
        &self,
        id: BookingId,
        payment: PaymentStatus,
    ) -> Result<Booking, BookingError> {
        match Booking::update_payment_status(id, payment, &self.pool).await? {
            Some(updated) => Ok(updated),
            None => {
                let current = Booking::find_by_id(id, &self.pool)
                    .await?
                    .ok_or(BookingError::BookingNotFound(id))?;
                Err(BookingError::Conflict {
                    expected: BookingStatus::Completed,
                    actual: current.status,
                })
            }
        }
    }

    async fn update_checklist(
        &self,
        id: BookingId,
        checklist: Vec<ChecklistItem>,
    ) -> Result<Booking, BookingError> {
        match Booking::update_checklist(id, &checklist, &self.pool).await? {
            Some(updated) => Ok(updated),
            None => {
                let current = Booking::find_by_id(id, &self.pool)
                    .await?
                    .ok_or(BookingError::BookingNotFound(id))?;
                Err(BookingError::TerminalState(current.status))
            }
        }
    }
}
