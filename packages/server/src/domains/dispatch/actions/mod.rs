//! Broadcast and acceptance arbitration.
//!
//! `broadcast` fans a fresh request out to every eligible online provider;
//! `accept` resolves the race so that exactly one provider wins. The
//! booking-level CAS is the authority — the request-level CAS is defense in
//! depth, and the cleanup of losing requests is best-effort bookkeeping
//! that correctness never depends on.

use chrono::Utc;

use crate::common::{BookingId, ProviderId, RequestId};
use crate::domains::bookings::data::{BookingStore, TransitionFields};
use crate::domains::bookings::errors::BookingError;
use crate::domains::bookings::events;
use crate::domains::bookings::models::{Booking, BookingRequest, BookingStatus, RequestStatus};
use crate::kernel::EngineDeps;

/// Fans a `REQUESTED` booking out to eligible providers.
///
/// Creates one `PENDING` request row per candidate, then moves the booking
/// to `PENDING`. An empty eligible set leaves the booking `REQUESTED` for
/// the expiry sweep. Offer rows are inserted before the booking CAS; if the
/// CAS loses (client cancelled mid-fan-out), the fresh offers are withdrawn
/// again.
pub async fn broadcast(
    deps: &EngineDeps,
    booking_id: BookingId,
) -> Result<Vec<BookingRequest>, BookingError> {
    let booking = deps.store.booking(booking_id).await?;

    if booking.status != BookingStatus::Requested {
        return Err(BookingError::Conflict {
            expected: BookingStatus::Requested,
            actual: booking.status,
        });
    }

    let eligible = deps
        .presence
        .list_eligible_providers(
            &booking.service_category,
            booking.location,
            deps.config.broadcast_radius_km,
        )
        .await
        .map_err(BookingError::Internal)?;

    if eligible.is_empty() {
        tracing::info!(
            booking_id = %booking.id,
            category = %booking.service_category,
            "no eligible providers; booking stays REQUESTED"
        );
        return Ok(Vec::new());
    }

    let offers: Vec<BookingRequest> = eligible
        .iter()
        .map(|&provider_id| BookingRequest::offer(booking.id, provider_id))
        .collect();
    let offers = deps.store.insert_requests(offers).await?;

    let pending = match deps
        .store
        .compare_and_transition(
            booking.id,
            BookingStatus::Requested,
            BookingStatus::Pending,
            TransitionFields::default(),
        )
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            // The booking moved under us; the offers are already dead
            withdraw_open_offers(deps, booking.id).await;
            return Err(e);
        }
    };

    tracing::info!(
        booking_id = %pending.id,
        providers = offers.len(),
        "broadcast fanned out"
    );

    events::publish_status(&deps.stream_hub, &pending).await;
    for offer in &offers {
        events::publish_offer(&deps.stream_hub, offer, &pending).await;
    }

    Ok(offers)
}

/// The core race resolution: first the targeted request row flips
/// `PENDING -> ACCEPTED`, then the booking flips `PENDING -> CONFIRMED`
/// naming the winner. If the booking CAS loses to a faster provider, the
/// request is rolled back to `REJECTED` and the caller gets `LostRace` so
/// the app can show "already taken".
pub async fn accept(
    deps: &EngineDeps,
    request_id: RequestId,
    provider_id: ProviderId,
) -> Result<Booking, BookingError> {
    let request = deps.store.request(request_id).await?;

    if request.provider_id != provider_id {
        return Err(BookingError::Permission(format!(
            "request {} was not offered to provider {}",
            request_id, provider_id
        )));
    }

    deps.store
        .resolve_request(request_id, RequestStatus::Pending, RequestStatus::Accepted)
        .await?;

    let fields = TransitionFields {
        provider_id: Some(provider_id),
        accepted_at: Some(Utc::now()),
        ..Default::default()
    };
    let confirmed = match deps
        .store
        .compare_and_transition(
            request.booking_id,
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            fields,
        )
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            // Roll the optimistic request resolution back; the booking CAS
            // is authoritative and someone else already won (or the booking
            // expired/cancelled underneath).
            if let Err(rollback) = deps
                .store
                .resolve_request(request_id, RequestStatus::Accepted, RequestStatus::Rejected)
                .await
            {
                tracing::warn!(
                    request_id = %request_id,
                    error = %rollback,
                    "losing request rollback failed"
                );
            }
            return Err(match e {
                BookingError::Conflict { .. } => BookingError::LostRace,
                other => other,
            });
        }
    };

    tracing::info!(
        booking_id = %confirmed.id,
        provider_id = %provider_id,
        "acceptance race won"
    );
    events::publish_status(&deps.stream_hub, &confirmed).await;

    // Losing offers are resolved off the request path; the booking CAS
    // already guarantees at-most-one winner
    let cleanup_deps = deps.clone();
    let booking_id = confirmed.id;
    tokio::spawn(async move {
        reject_open_offers(&cleanup_deps, booking_id, request_id).await;
    });

    Ok(confirmed)
}

/// Provider declines an offer. No effect on the booking itself.
pub async fn reject(
    deps: &EngineDeps,
    request_id: RequestId,
    provider_id: ProviderId,
) -> Result<BookingRequest, BookingError> {
    let request = deps.store.request(request_id).await?;

    if request.provider_id != provider_id {
        return Err(BookingError::Permission(format!(
            "request {} was not offered to provider {}",
            request_id, provider_id
        )));
    }

    deps.store
        .resolve_request(request_id, RequestStatus::Pending, RequestStatus::Rejected)
        .await
}

/// Expires one booking whose broadcast window elapsed. CAS-guarded: a
/// concurrent acceptance always wins, in which case this is a no-op.
/// Returns whether the booking was expired.
pub async fn expire(deps: &EngineDeps, booking_id: BookingId) -> Result<bool, BookingError> {
    let booking = deps.store.booking(booking_id).await?;

    if !matches!(
        booking.status,
        BookingStatus::Requested | BookingStatus::Pending
    ) {
        return Ok(false);
    }

    let expired = match deps
        .store
        .compare_and_transition(
            booking.id,
            booking.status,
            BookingStatus::Expired,
            TransitionFields::default(),
        )
        .await
    {
        Ok(updated) => updated,
        // Lost to a concurrent acceptance or cancellation; nothing to do
        Err(BookingError::Conflict { .. }) => return Ok(false),
        Err(e) => return Err(e),
    };

    tracing::info!(booking_id = %expired.id, "broadcast window elapsed; booking expired");
    events::publish_status(&deps.stream_hub, &expired).await;
    withdraw_open_offers(deps, expired.id).await;

    Ok(true)
}

/// Time-based sweep over all bookings whose broadcast window elapsed.
/// Returns how many were expired.
pub async fn expire_stale(deps: &EngineDeps) -> Result<usize, BookingError> {
    let cutoff = Utc::now() - deps.config.broadcast_window();
    let stale = deps.store.stale_broadcasts(cutoff).await?;

    let mut expired = 0;
    for booking in stale {
        match expire(deps, booking.id).await {
            Ok(true) => expired += 1,
            Ok(false) => {}
            Err(e) => {
                // One booking's failure must not stop the sweep
                tracing::error!(booking_id = %booking.id, error = %e, "expiry failed");
            }
        }
    }

    Ok(expired)
}

/// Best-effort: resolves every still-pending offer for a dead broadcast to
/// `EXPIRED`. Failures are logged, never surfaced.
pub async fn withdraw_open_offers(deps: &EngineDeps, booking_id: BookingId) {
    resolve_open_offers(deps, booking_id, None, RequestStatus::Expired).await;
}

/// Best-effort: resolves every pending offer except the winner's to
/// `REJECTED` once an acceptance committed.
async fn reject_open_offers(deps: &EngineDeps, booking_id: BookingId, winner: RequestId) {
    resolve_open_offers(deps, booking_id, Some(winner), RequestStatus::Rejected).await;
}

async fn resolve_open_offers(
    deps: &EngineDeps,
    booking_id: BookingId,
    skip: Option<RequestId>,
    to: RequestStatus,
) {
    let requests = match deps.store.requests_for_booking(booking_id).await {
        Ok(requests) => requests,
        Err(e) => {
            tracing::warn!(booking_id = %booking_id, error = %e, "offer cleanup fetch failed");
            return;
        }
    };

    for request in requests {
        if Some(request.id) == skip || request.status != RequestStatus::Pending {
            continue;
        }
        if let Err(e) = deps
            .store
            .resolve_request(request.id, RequestStatus::Pending, to)
            .await
        {
            tracing::warn!(
                request_id = %request.id,
                error = %e,
                "offer cleanup resolution failed"
            );
        }
    }
}
