//! Booking lifecycle state machine.
//!
//! A pure validation layer in front of the store's CAS: it holds no mutable
//! state. Legality and authorization are checked here, then the action layer
//! issues `compare_and_transition` with the booking's current status as the
//! expected value — so a stale command fails at the store even if it passed
//! validation against an old snapshot.
//!
//! Legal transitions:
//!
//! ```text
//! REQUESTED   -> PENDING        broadcast fans out
//! REQUESTED   -> EXPIRED        no eligible providers / timeout
//! REQUESTED   -> CANCELLED      client withdraws before fan-out
//! PENDING     -> CONFIRMED      acceptance race won
//! PENDING     -> EXPIRED        broadcast window elapsed
//! PENDING     -> CANCELLED      client withdraws during broadcast
//! CONFIRMED   -> EN_ROUTE       provider command
//! CONFIRMED   -> IN_PROGRESS    provider arrived immediately; OTP-gated
//! CONFIRMED   -> CANCELLED      client/provider/operator, pre-arrival
//! EN_ROUTE    -> IN_PROGRESS    provider command; OTP-gated
//! EN_ROUTE    -> CANCELLED      client/provider/operator
//! IN_PROGRESS -> COMPLETED      provider command
//! IN_PROGRESS -> CANCELLED      exceptional; requires a reason
//! ```

use crate::common::Actor;
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{Booking, BookingStatus};

use BookingStatus::*;

/// Whether `from -> to` appears in the legal-transition table.
pub fn is_legal(from: BookingStatus, to: BookingStatus) -> bool {
    matches!(
        (from, to),
        (Requested, Pending)
            | (Requested, Expired)
            | (Requested, Cancelled)
            | (Pending, Confirmed)
            | (Pending, Expired)
            | (Pending, Cancelled)
            | (Confirmed, EnRoute)
            | (Confirmed, InProgress)
            | (Confirmed, Cancelled)
            | (EnRoute, InProgress)
            | (EnRoute, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Cancelled)
    )
}

/// Whether the transition into `to` must be gated by an OTP check.
pub fn requires_otp(to: BookingStatus) -> bool {
    to == InProgress
}

/// Validates a party-issued transition against the given booking snapshot.
///
/// Order matters: terminal check first (a terminal booking is
/// `TerminalState` even for an unauthorized caller), then legality, then
/// authorization. The store CAS remains the final arbiter under races.
pub fn validate(booking: &Booking, actor: &Actor, to: BookingStatus) -> Result<(), BookingError> {
    if booking.status.is_terminal() {
        return Err(BookingError::TerminalState(booking.status));
    }

    if !is_legal(booking.status, to) {
        return Err(BookingError::IllegalTransition {
            from: booking.status,
            to,
        });
    }

    authorize(booking, actor, to)
}

fn authorize(booking: &Booking, actor: &Actor, to: BookingStatus) -> Result<(), BookingError> {
    match to {
        // Operational advances belong to the assigned provider only
        EnRoute | InProgress | Completed => match actor {
            Actor::Provider(provider_id) if booking.provider_id == Some(*provider_id) => Ok(()),
            _ => Err(BookingError::Permission(format!(
                "{} may not drive booking {} to {}",
                actor, booking.id, to
            ))),
        },
        Cancelled => match actor {
            Actor::Client(client_id) if booking.client_id == *client_id => Ok(()),
            Actor::Provider(provider_id) if booking.provider_id == Some(*provider_id) => Ok(()),
            // Operators use the audited force-cancel path
            Actor::Operator(_) => Ok(()),
            _ => Err(BookingError::Permission(format!(
                "{} may not cancel booking {}",
                actor, booking.id
            ))),
        },
        // Pending/Confirmed/Expired are driven by the arbiter and the expiry
        // sweep, not by party commands
        _ => Err(BookingError::Permission(format!(
            "{} transitions are not party commands",
            to
        ))),
    }
}
