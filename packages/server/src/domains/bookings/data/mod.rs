//! Booking store abstraction.
//!
//! The store is the single shared mutable resource in the engine. Every
//! mutation funnels through `compare_and_transition` (booking side) or
//! `resolve_request` (request side), both compare-and-set guarded, so two
//! racing callers expecting the same prior state can never both succeed.
//!
//! Production runs [`pg::PgBookingStore`]; tests and local development run
//! [`memory::MemoryBookingStore`] behind the same trait.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{BookingId, ProviderId, RequestId};
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{
    Booking, BookingRequest, BookingStatus, ChecklistItem, PaymentStatus, RequestStatus,
};

pub use memory::MemoryBookingStore;
pub use pg::PgBookingStore;

/// Field updates applied atomically alongside a status transition.
///
/// `None` leaves the stored value untouched. Timestamps are only ever set by
/// the transition that defines them, which is what keeps them monotone and
/// set-exactly-once.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub provider_id: Option<ProviderId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_cost: Option<f64>,
    pub payment_status: Option<PaymentStatus>,
    pub cancel_reason: Option<String>,
    pub checklist: Option<Vec<ChecklistItem>>,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persists a freshly created booking (status `Requested`).
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, BookingError>;

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError>;

    /// The only booking mutation primitive. Atomically moves the booking
    /// from `expected` to `next`, applying `fields`; fails with
    /// [`BookingError::Conflict`] if the stored status moved under the
    /// caller.
    async fn compare_and_transition(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        fields: TransitionFields,
    ) -> Result<Booking, BookingError>;

    /// Creates the per-provider broadcast rows for one fan-out.
    async fn insert_requests(
        &self,
        requests: Vec<BookingRequest>,
    ) -> Result<Vec<BookingRequest>, BookingError>;

    async fn request(&self, id: RequestId) -> Result<BookingRequest, BookingError>;

    async fn requests_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<BookingRequest>, BookingError>;

    /// Request-level CAS; a row is resolved exactly once.
    async fn resolve_request(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<BookingRequest, BookingError>;

    /// Bookings still in `Requested`/`Pending` created before `cutoff`,
    /// i.e. broadcast windows that have elapsed.
    async fn stale_broadcasts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError>;

    /// Records the payment collaborator's outcome on a completed booking.
    async fn record_payment(
        &self,
        id: BookingId,
        payment: PaymentStatus,
    ) -> Result<Booking, BookingError>;

    /// Replaces the informational checklist on a non-terminal booking.
    async fn update_checklist(
        &self,
        id: BookingId,
        checklist: Vec<ChecklistItem>,
    ) -> Result<Booking, BookingError>;
}
