//! Error taxonomy for booking operations.
//!
//! Every operation returns a typed error synchronously; nothing in the engine
//! swallows a failure except the best-effort cleanup of losing broadcast
//! requests, which is logged instead. No variant is fatal to the process —
//! each error is scoped to a single booking's operation.

use thiserror::Error;

use crate::common::BookingId;
use crate::domains::bookings::models::BookingStatus;

#[derive(Error, Debug)]
pub enum BookingError {
    /// Malformed or missing input to a command. Never retried automatically.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Referenced booking does not exist.
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// Referenced broadcast request does not exist.
    #[error("booking request {0} not found")]
    RequestNotFound(crate::common::RequestId),

    /// A CAS precondition failed because state moved under the caller.
    /// Safe to refetch and retry once with fresh state.
    #[error("state conflict: expected {expected}, found {actual}")]
    Conflict {
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// The requested transition is not in the lifecycle table for the
    /// booking's current status. Retrying cannot help; the caller asked
    /// for a move the machine never allows from here.
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// The accept race was lost to a faster provider. Not retryable; the
    /// request is gone.
    #[error("booking already taken by another provider")]
    LostRace,

    /// OTP/PIN mismatch on service start. Caller may re-prompt and retry.
    #[error("arrival code verification failed")]
    Authentication,

    /// Transition attempted on a booking already in a terminal state.
    #[error("booking is terminal ({0}); no further transitions")]
    TerminalState(BookingStatus),

    /// Actor is not the assigned party (or an authorized operator) for the
    /// requested transition.
    #[error("permission denied: {0}")]
    Permission(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    /// Stable machine-readable code, used in HTTP payloads and logs.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::BookingNotFound(_) | BookingError::RequestNotFound(_) => "not_found",
            BookingError::Conflict { .. } => "conflict",
            BookingError::IllegalTransition { .. } => "illegal_transition",
            BookingError::LostRace => "lost_race",
            BookingError::Authentication => "authentication",
            BookingError::TerminalState(_) => "terminal_state",
            BookingError::Permission(_) => "permission",
            BookingError::Database(_) => "database",
            BookingError::Internal(_) => "internal",
        }
    }
}
