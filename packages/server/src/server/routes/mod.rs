//! Route handlers and the HTTP error mapping.
//!
//! Actor identity arrives in `X-Actor-Id` / `X-Actor-Role` headers, injected
//! by the auth gateway in front of this service. Authorization of *what the
//! actor may do to the booking* stays in the lifecycle machine — the gateway
//! only vouches for who is calling.

pub mod bookings;
pub mod health;
pub mod requests;
pub mod stream;

pub use bookings::*;
pub use health::health_handler;
pub use requests::*;
pub use stream::stream_handler;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::common::Actor;
use crate::domains::bookings::errors::BookingError;

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::BookingNotFound(_) | BookingError::RequestNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            // Conflict-family errors all mean "this move is not available"
            BookingError::Conflict { .. }
            | BookingError::IllegalTransition { .. }
            | BookingError::LostRace
            | BookingError::TerminalState(_) => StatusCode::CONFLICT,
            BookingError::Authentication => StatusCode::UNAUTHORIZED,
            BookingError::Permission(_) => StatusCode::FORBIDDEN,
            BookingError::Database(_) | BookingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Parses the acting party from the gateway-injected headers.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, BookingError> {
    let role = header_str(headers, "x-actor-role")?;
    let id = header_str(headers, "x-actor-id")?;

    match role {
        "client" => Ok(Actor::Client(parse_id(id)?)),
        "provider" => Ok(Actor::Provider(parse_id(id)?)),
        "operator" => Ok(Actor::Operator(parse_id(id)?)),
        other => Err(BookingError::Validation(format!(
            "unknown actor role: {}",
            other
        ))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, BookingError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BookingError::Validation(format!("missing or invalid {} header", name)))
}

fn parse_id<T>(raw: &str) -> Result<crate::common::id::Id<T>, BookingError> {
    crate::common::id::Id::parse(raw)
        .map_err(|_| BookingError::Validation(format!("invalid actor id: {}", raw)))
}
