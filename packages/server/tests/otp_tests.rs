//! Arrival OTP verification at the service-start boundary.

mod common;

use common::TestHarness;
use server_core::common::{Actor, ProviderId};
use server_core::domains::bookings::actions;
use server_core::domains::bookings::data::BookingStore;
use server_core::domains::bookings::errors::BookingError;
use server_core::domains::bookings::models::BookingStatus;
use server_core::domains::dispatch;

async fn confirmed_booking(harness: &TestHarness, provider: ProviderId) -> (String, server_core::common::BookingId) {
    let booking = harness.create_booking().await;
    let offer = harness.offer_for(&booking, provider).await;
    dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap();
    let stored = harness.deps.store.booking(booking.id).await.unwrap();
    (stored.otp, booking.id)
}

#[tokio::test]
async fn wrong_code_refuses_the_start_and_leaves_status_alone() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);
    let (otp, booking_id) = confirmed_booking(&harness, provider).await;

    let wrong = if otp == "0000" { "9999" } else { "0000" };
    let err =
        actions::verify_and_start(&harness.deps, booking_id, Actor::Provider(provider), wrong)
            .await
            .unwrap_err();
    assert!(matches!(err, BookingError::Authentication));

    let current = harness.deps.store.booking(booking_id).await.unwrap();
    assert_eq!(current.status, BookingStatus::Confirmed);
    assert!(current.started_at.is_none());
}

#[tokio::test]
async fn retries_are_allowed_until_the_right_code() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);
    let (otp, booking_id) = confirmed_booking(&harness, provider).await;

    // A batch of near-miss codes: truncated, padded, and flipped digits
    let candidates = [
        &otp[..otp.len() - 1],
        "12345678",
        "",
        "abcd",
    ];
    for wrong in candidates {
        if wrong == otp {
            continue;
        }
        let err =
            actions::verify_and_start(&harness.deps, booking_id, Actor::Provider(provider), wrong)
                .await
                .unwrap_err();
        assert!(matches!(err, BookingError::Authentication));
    }

    let started =
        actions::verify_and_start(&harness.deps, booking_id, Actor::Provider(provider), &otp)
            .await
            .unwrap();
    assert_eq!(started.status, BookingStatus::InProgress);
}

#[tokio::test]
async fn start_is_refused_for_the_wrong_actor_before_checking_the_code() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);
    let (otp, booking_id) = confirmed_booking(&harness, provider).await;

    // Even with the right code, the client cannot start the job
    let err = actions::verify_and_start(
        &harness.deps,
        booking_id,
        Actor::Client(harness.client_id),
        &otp,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BookingError::Permission(_)));
}

#[tokio::test]
async fn start_from_en_route_works_too() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);
    let (otp, booking_id) = confirmed_booking(&harness, provider).await;

    actions::mark_en_route(&harness.deps, booking_id, Actor::Provider(provider))
        .await
        .unwrap();
    let started =
        actions::verify_and_start(&harness.deps, booking_id, Actor::Provider(provider), &otp)
            .await
            .unwrap();
    assert_eq!(started.status, BookingStatus::InProgress);
}
