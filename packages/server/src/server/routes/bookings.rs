//! Booking command and query handlers.

use axum::extract::{Extension, Path};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::common::{Actor, BookingId, Coordinates};
use crate::domains::bookings::actions::{self, CreateBookingArgs};
use crate::domains::bookings::data::BookingStore;
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{Booking, PaymentStatus};
use crate::server::app::AxumAppState;
use crate::server::routes::actor_from_headers;

#[derive(Deserialize)]
pub struct CreateBookingBody {
    pub service_category: String,
    #[serde(default)]
    pub requirements: serde_json::Value,
    pub notes: Option<String>,
    pub location: Coordinates,
    pub estimated_cost: Option<f64>,
}

/// POST /api/bookings
pub async fn create_booking_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingBody>,
) -> Result<Json<Booking>, BookingError> {
    let client_id = match actor_from_headers(&headers)? {
        Actor::Client(id) => id,
        other => {
            return Err(BookingError::Permission(format!(
                "{} may not create bookings",
                other
            )))
        }
    };

    let booking = actions::create_booking(
        &state.deps,
        CreateBookingArgs {
            client_id,
            service_category: body.service_category,
            requirements: body.requirements,
            notes: body.notes,
            location: body.location,
            estimated_cost: body.estimated_cost,
        },
    )
    .await?;

    Ok(Json(booking))
}

/// GET /api/bookings/:id
///
/// The full record (OTP included) goes to the owning client only; the
/// assigned provider and operators get the record with the OTP blanked.
pub async fn get_booking_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
) -> Result<Json<Booking>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let mut booking = state.deps.store.booking(booking_id).await?;

    match actor {
        Actor::Client(id) if id == booking.client_id => {}
        Actor::Provider(id) if booking.provider_id == Some(id) => {
            booking.otp.clear();
        }
        Actor::Operator(_) => {
            booking.otp.clear();
        }
        other => {
            return Err(BookingError::Permission(format!(
                "{} may not view booking {}",
                other, booking_id
            )))
        }
    }

    Ok(Json(booking))
}

/// POST /api/bookings/:id/en-route
pub async fn en_route_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
) -> Result<Json<Booking>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let booking = actions::mark_en_route(&state.deps, booking_id, actor).await?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct StartBody {
    pub otp: String,
}

/// POST /api/bookings/:id/start
pub async fn start_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
    Json(body): Json<StartBody>,
) -> Result<Json<Booking>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let booking = actions::verify_and_start(&state.deps, booking_id, actor, &body.otp).await?;
    Ok(Json(booking))
}

#[derive(Deserialize, Default)]
pub struct CompleteBody {
    pub final_cost: Option<f64>,
}

/// POST /api/bookings/:id/complete
pub async fn complete_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
    body: Option<Json<CompleteBody>>,
) -> Result<Json<Booking>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let final_cost = body.and_then(|Json(b)| b.final_cost);
    let booking = actions::complete_booking(&state.deps, booking_id, actor, final_cost).await?;
    Ok(Json(booking))
}

#[derive(Deserialize, Default)]
pub struct CancelBody {
    pub reason: Option<String>,
}

/// POST /api/bookings/:id/cancel
pub async fn cancel_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
    body: Option<Json<CancelBody>>,
) -> Result<Json<Booking>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let booking = actions::cancel_booking(&state.deps, booking_id, actor, reason).await?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct ForceCancelBody {
    pub reason: String,
}

/// POST /api/bookings/:id/force-cancel
pub async fn force_cancel_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
    Json(body): Json<ForceCancelBody>,
) -> Result<Json<Booking>, BookingError> {
    let operator_id = match actor_from_headers(&headers)? {
        Actor::Operator(id) => id,
        other => {
            return Err(BookingError::Permission(format!(
                "{} may not force-cancel bookings",
                other
            )))
        }
    };
    let booking =
        actions::force_cancel(&state.deps, booking_id, operator_id, body.reason).await?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct ChecklistBody {
    pub index: usize,
    pub done: bool,
}

/// PATCH /api/bookings/:id/checklist
pub async fn checklist_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
    Json(body): Json<ChecklistBody>,
) -> Result<Json<Booking>, BookingError> {
    let actor = actor_from_headers(&headers)?;
    let booking =
        actions::set_checklist_item(&state.deps, booking_id, actor, body.index, body.done).await?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct PaymentBody {
    pub payment_status: PaymentStatus,
}

/// POST /api/bookings/:id/payment
///
/// Settlement webhook path. Restricted to operators; the payment
/// collaborator calls through the gateway with an operator identity.
pub async fn payment_handler(
    Extension(state): Extension<AxumAppState>,
    Path(booking_id): Path<BookingId>,
    headers: HeaderMap,
    Json(body): Json<PaymentBody>,
) -> Result<Json<Booking>, BookingError> {
    match actor_from_headers(&headers)? {
        Actor::Operator(_) => {}
        other => {
            return Err(BookingError::Permission(format!(
                "{} may not record payments",
                other
            )))
        }
    }
    let booking = actions::record_payment(&state.deps, booking_id, body.payment_status).await?;
    Ok(Json(booking))
}
