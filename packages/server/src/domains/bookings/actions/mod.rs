//! Party-facing booking commands.
//!
//! Every command here follows the same shape: fetch a snapshot, validate
//! against the lifecycle machine, issue the store CAS with the snapshot's
//! status as the expected value, then publish the committed snapshot to the
//! stream hub. The CAS is what makes racing commands safe — validation on a
//! stale snapshot just fails at the store instead.

use chrono::Utc;

use crate::common::{Actor, BookingId, ClientId, Coordinates, OperatorId};
use crate::domains::bookings::data::{BookingStore, TransitionFields};
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::models::{Booking, BookingStatus, PaymentStatus};
use crate::domains::bookings::{events, machines, otp};
use crate::domains::dispatch;
use crate::kernel::{AuditEntry, EngineDeps};

pub struct CreateBookingArgs {
    pub client_id: ClientId,
    pub service_category: String,
    pub requirements: serde_json::Value,
    pub notes: Option<String>,
    pub location: Coordinates,
    pub estimated_cost: Option<f64>,
}

/// Creates a booking and fans it out to eligible providers.
///
/// The booking is durable once inserted; a broadcast failure (presence
/// service down, for example) leaves it `REQUESTED` where the expiry sweep
/// will eventually pick it up, so broadcast errors are logged rather than
/// surfaced to the client.
pub async fn create_booking(
    deps: &EngineDeps,
    args: CreateBookingArgs,
) -> Result<Booking, BookingError> {
    if args.service_category.trim().is_empty() {
        return Err(BookingError::Validation(
            "service category is required".to_string(),
        ));
    }

    let now = Utc::now();
    let booking = Booking {
        id: BookingId::new(),
        client_id: args.client_id,
        provider_id: None,
        status: BookingStatus::Requested,
        service_category: args.service_category,
        requirements: args.requirements,
        notes: args.notes,
        otp: otp::generate(deps.config.otp_length),
        checklist: Vec::new(),
        estimated_cost: args.estimated_cost,
        final_cost: None,
        payment_status: PaymentStatus::Pending,
        cancel_reason: None,
        location: args.location,
        created_at: now,
        accepted_at: None,
        started_at: None,
        completed_at: None,
        updated_at: now,
    };

    let booking = deps.store.insert_booking(booking).await?;
    tracing::info!(
        booking_id = %booking.id,
        client_id = %booking.client_id,
        category = %booking.service_category,
        "booking created"
    );

    if let Err(e) = dispatch::actions::broadcast(deps, booking.id).await {
        tracing::warn!(booking_id = %booking.id, error = %e, "broadcast failed; booking left for expiry sweep");
    }

    deps.store.booking(booking.id).await
}

/// Provider is on the way.
pub async fn mark_en_route(
    deps: &EngineDeps,
    booking_id: BookingId,
    actor: Actor,
) -> Result<Booking, BookingError> {
    let booking = deps.store.booking(booking_id).await?;
    transition(deps, &booking, &actor, BookingStatus::EnRoute, TransitionFields::default()).await
}

/// OTP-gated service start.
///
/// The code check happens inside the same operation as the CAS: a wrong
/// code refuses the transition with `Authentication` and leaves the status
/// untouched.
pub async fn verify_and_start(
    deps: &EngineDeps,
    booking_id: BookingId,
    actor: Actor,
    submitted_code: &str,
) -> Result<Booking, BookingError> {
    let booking = deps.store.booking(booking_id).await?;
    machines::validate(&booking, &actor, BookingStatus::InProgress)?;

    if !otp::verify(&booking, submitted_code) {
        return Err(BookingError::Authentication);
    }

    let fields = TransitionFields {
        started_at: Some(Utc::now()),
        ..Default::default()
    };
    let updated = deps
        .store
        .compare_and_transition(booking.id, booking.status, BookingStatus::InProgress, fields)
        .await?;
    events::publish_status(&deps.stream_hub, &updated).await;
    Ok(updated)
}

/// Provider marks the job done. Settlement runs after the transition
/// commits; a payment failure is recorded, never unwinds the completion.
pub async fn complete_booking(
    deps: &EngineDeps,
    booking_id: BookingId,
    actor: Actor,
    final_cost: Option<f64>,
) -> Result<Booking, BookingError> {
    let booking = deps.store.booking(booking_id).await?;
    let fields = TransitionFields {
        completed_at: Some(Utc::now()),
        final_cost,
        ..Default::default()
    };
    let completed = transition(deps, &booking, &actor, BookingStatus::Completed, fields).await?;

    let amount = completed.final_cost.or(completed.estimated_cost);
    if let Some(amount) = amount {
        match deps
            .payments
            .charge(completed.id, completed.client_id, amount)
            .await
        {
            Ok(outcome) => {
                let updated = deps.store.record_payment(completed.id, outcome).await?;
                events::publish_status(&deps.stream_hub, &updated).await;
                return Ok(updated);
            }
            Err(e) => {
                tracing::error!(booking_id = %completed.id, error = %e, "payment charge failed");
                let updated = deps
                    .store
                    .record_payment(completed.id, PaymentStatus::Failed)
                    .await?;
                events::publish_status(&deps.stream_hub, &updated).await;
                return Ok(updated);
            }
        }
    }

    Ok(completed)
}

/// Client or provider cancellation. In-progress cancellations are the
/// exceptional path and must carry a reason. If this loses a race to a
/// concurrent advance, the caller gets `Conflict` and must refetch — an
/// already-advanced booking is never overridden.
pub async fn cancel_booking(
    deps: &EngineDeps,
    booking_id: BookingId,
    actor: Actor,
    reason: Option<String>,
) -> Result<Booking, BookingError> {
    let booking = deps.store.booking(booking_id).await?;

    if booking.status == BookingStatus::InProgress && reason.is_none() {
        return Err(BookingError::Validation(
            "cancelling an in-progress booking requires a reason".to_string(),
        ));
    }

    let was_broadcasting = matches!(
        booking.status,
        BookingStatus::Requested | BookingStatus::Pending
    );

    let fields = TransitionFields {
        cancel_reason: reason,
        ..Default::default()
    };
    let cancelled = transition(deps, &booking, &actor, BookingStatus::Cancelled, fields).await?;

    if was_broadcasting {
        dispatch::actions::withdraw_open_offers(deps, cancelled.id).await;
    }

    Ok(cancelled)
}

/// Audited operator override: cancels a booking regardless of which party
/// it belongs to. Still refuses terminal bookings — there is nothing left
/// to override.
pub async fn force_cancel(
    deps: &EngineDeps,
    booking_id: BookingId,
    operator_id: OperatorId,
    reason: String,
) -> Result<Booking, BookingError> {
    if reason.trim().is_empty() {
        return Err(BookingError::Validation(
            "an override reason is required".to_string(),
        ));
    }

    let actor = Actor::Operator(operator_id);
    let cancelled = cancel_booking(deps, booking_id, actor, Some(reason.clone())).await?;

    if let Err(e) = deps
        .audit
        .record(AuditEntry {
            action: "force_cancel".to_string(),
            actor,
            booking_id,
            reason,
            at: Utc::now(),
        })
        .await
    {
        tracing::error!(booking_id = %booking_id, error = %e, "audit record failed");
    }

    Ok(cancelled)
}

/// Toggles one checklist item. Informational only — never gates a
/// transition — but still restricted to the assigned provider.
pub async fn set_checklist_item(
    deps: &EngineDeps,
    booking_id: BookingId,
    actor: Actor,
    index: usize,
    done: bool,
) -> Result<Booking, BookingError> {
    let booking = deps.store.booking(booking_id).await?;

    match actor {
        Actor::Provider(provider_id) if booking.provider_id == Some(provider_id) => {}
        _ => {
            return Err(BookingError::Permission(format!(
                "{} may not edit the checklist of booking {}",
                actor, booking_id
            )))
        }
    }

    let mut checklist = booking.checklist.clone();
    let item = checklist
        .get_mut(index)
        .ok_or_else(|| BookingError::Validation(format!("no checklist item at index {}", index)))?;
    item.done = done;

    let updated = deps.store.update_checklist(booking_id, checklist).await?;
    events::publish_status(&deps.stream_hub, &updated).await;
    Ok(updated)
}

/// Records the payment collaborator's settlement outcome (webhook path).
pub async fn record_payment(
    deps: &EngineDeps,
    booking_id: BookingId,
    payment: PaymentStatus,
) -> Result<Booking, BookingError> {
    let updated = deps.store.record_payment(booking_id, payment).await?;
    events::publish_status(&deps.stream_hub, &updated).await;
    Ok(updated)
}

/// Shared transition path: machine validation, CAS, post-commit publish.
async fn transition(
    deps: &EngineDeps,
    booking: &Booking,
    actor: &Actor,
    to: BookingStatus,
    fields: TransitionFields,
) -> Result<Booking, BookingError> {
    machines::validate(booking, actor, to)?;
    let updated = deps
        .store
        .compare_and_transition(booking.id, booking.status, to, fields)
        .await?;
    tracing::info!(
        booking_id = %updated.id,
        from = %booking.status,
        to = %updated.status,
        actor = %actor,
        "booking transitioned"
    );
    events::publish_status(&deps.stream_hub, &updated).await;
    Ok(updated)
}
