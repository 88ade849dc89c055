//! Typed ID aliases for the booking domain entities.
//!
//! Using distinct marker types means the compiler rejects code that hands a
//! `ClientId` to something expecting a `ProviderId` — which matters in an
//! engine whose whole job is deciding which party may do what.

pub use super::id::Id;

/// Marker type for bookings.
pub struct BookingEntity;

/// Marker type for per-provider broadcast requests.
pub struct RequestEntity;

/// Marker type for clients (the party requesting service).
pub struct ClientEntity;

/// Marker type for service providers.
pub struct ProviderEntity;

/// Marker type for admin operators (emergency override path).
pub struct OperatorEntity;

/// Typed ID for a booking.
pub type BookingId = Id<BookingEntity>;

/// Typed ID for a broadcast request row.
pub type RequestId = Id<RequestEntity>;

/// Typed ID for a client.
pub type ClientId = Id<ClientEntity>;

/// Typed ID for a provider.
pub type ProviderId = Id<ProviderEntity>;

/// Typed ID for an admin operator.
pub type OperatorId = Id<OperatorEntity>;
