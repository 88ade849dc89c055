//! Broadcast offer handlers: the provider side of the acceptance race.

use axum::extract::{Extension, Path};
use axum::http::HeaderMap;
use axum::Json;

use crate::common::{Actor, BookingId, RequestId};
use crate::domains::bookings::data::BookingStore;
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{Booking, BookingRequest};
use crate::domains::dispatch;
use crate::server::app::AxumAppState;
use crate::server::routes::actor_from_headers;

fn provider_from_headers(headers: &HeaderMap) -> Result<crate::common::ProviderId, BookingError> {
    match actor_from_headers(headers)? {
        Actor::Provider(id) => Ok(id),
        other => Err(BookingError::Permission(format!(
            "{} may not act on broadcast offers",
            other
        ))),
    }
}

/// POST /api/requests/:id/accept
///
/// Returns the confirmed booking to the winner; losers get 409 with the
/// `lost_race` code.
pub async fn accept_request_handler(
    Extension(state): Extension<AxumAppState>,
    Path(request_id): Path<RequestId>,
    headers: HeaderMap,
) -> Result<Json<Booking>, BookingError> {
    let provider_id = provider_from_headers(&headers)?;
    let booking = dispatch::actions::accept(&state.deps, request_id, provider_id).await?;
    Ok(Json(booking))
}

/// POST /api/requests/:id/reject
pub async fn reject_request_handler(
    Extension(state): Extension<AxumAppState>,
    Path(request_id): Path<RequestId>,
    headers: HeaderMap,
) -> Result<Json<BookingRequest>, BookingError> {
    let provider_id = provider_from_headers(&headers)?;
    let request = dispatch::actions::reject(&state.deps, request_id, provider_id).await?;
    Ok(Json(request))
}

/// GET /api/bookings/:id/requests
///
/// Offer bookkeeping for the owning client and operators.
pub async fn list_requests_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingRequest>>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let booking = state.deps.store.booking(booking_id).await?;

    match actor {
        Actor::Client(id) if id == booking.client_id => {}
        Actor::Operator(_) => {}
        other => {
            return Err(BookingError::Permission(format!(
                "{} may not list requests for booking {}",
                other, booking_id
            )))
        }
    }

    let requests = state.deps.store.requests_for_booking(booking_id).await?;
    Ok(Json(requests))
}
