//! Acceptance arbitration under contention: at most one provider ever wins
//! a broadcast, and every loser finds out.

mod common;

use common::TestHarness;
use server_core::common::{Actor, ProviderId};
use server_core::domains::bookings::actions;
use server_core::domains::bookings::data::BookingStore;
use server_core::domains::bookings::errors::BookingError;
use server_core::domains::bookings::models::{BookingStatus, RequestStatus};
use server_core::domains::dispatch;

#[tokio::test]
async fn concurrent_accepts_produce_exactly_one_winner() {
    let providers: Vec<ProviderId> = (0..8).map(|_| ProviderId::new()).collect();
    let harness = TestHarness::with_online_providers(&providers);

    let booking = harness.create_booking().await;
    assert_eq!(booking.status, BookingStatus::Pending);

    let mut handles = Vec::new();
    for &provider in &providers {
        let offer = harness.offer_for(&booking, provider).await;
        let deps = harness.deps.clone();
        handles.push(tokio::spawn(async move {
            (
                provider,
                dispatch::actions::accept(&deps, offer.id, provider).await,
            )
        }));
    }

    let mut winners = Vec::new();
    let mut losses = 0;
    for handle in handles {
        let (provider, outcome) = handle.await.unwrap();
        match outcome {
            Ok(confirmed) => winners.push((provider, confirmed)),
            Err(BookingError::LostRace) => losses += 1,
            Err(other) => panic!("unexpected acceptance error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(losses, providers.len() - 1);

    let (winner, confirmed) = &winners[0];
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.provider_id, Some(*winner));

    // Every losing request was rolled back; the winner's stays accepted
    let requests = harness
        .deps
        .store
        .requests_for_booking(booking.id)
        .await
        .unwrap();
    let accepted: Vec<_> = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Accepted)
        .collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].provider_id, *winner);
    assert!(requests
        .iter()
        .filter(|r| r.provider_id != *winner)
        .all(|r| r.status == RequestStatus::Rejected));
}

#[tokio::test]
async fn accept_on_foreign_request_is_refused() {
    let provider = ProviderId::new();
    let imposter = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let booking = harness.create_booking().await;
    let offer = harness.offer_for(&booking, provider).await;

    let err = dispatch::actions::accept(&harness.deps, offer.id, imposter)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Permission(_)));

    // The offer is still open for its addressee
    let offer = harness.offer_for(&booking, provider).await;
    assert_eq!(offer.status, RequestStatus::Pending);
}

#[tokio::test]
async fn reject_leaves_the_booking_pending() {
    let provider_a = ProviderId::new();
    let provider_b = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider_a, provider_b]);

    let booking = harness.create_booking().await;
    let offer_a = harness.offer_for(&booking, provider_a).await;

    let rejected = dispatch::actions::reject(&harness.deps, offer_a.id, provider_a)
        .await
        .unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);

    let current = harness.deps.store.booking(booking.id).await.unwrap();
    assert_eq!(current.status, BookingStatus::Pending);

    // The other provider can still win
    let offer_b = harness.offer_for(&booking, provider_b).await;
    let confirmed = dispatch::actions::accept(&harness.deps, offer_b.id, provider_b)
        .await
        .unwrap();
    assert_eq!(confirmed.provider_id, Some(provider_b));
}

#[tokio::test]
async fn double_accept_by_the_same_provider_fails_second_time() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let booking = harness.create_booking().await;
    let offer = harness.offer_for(&booking, provider).await;

    dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap();
    let err = dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict { .. }));
}

#[tokio::test]
async fn cancel_and_complete_race_has_one_winner() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let booking = harness.create_booking().await;
    let offer = harness.offer_for(&booking, provider).await;
    dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap();
    let otp = harness.deps.store.booking(booking.id).await.unwrap().otp;
    actions::verify_and_start(&harness.deps, booking.id, Actor::Provider(provider), &otp)
        .await
        .unwrap();

    let cancel = actions::cancel_booking(
        &harness.deps,
        booking.id,
        Actor::Client(harness.client_id),
        Some("changed my mind".to_string()),
    );
    let complete =
        actions::complete_booking(&harness.deps, booking.id, Actor::Provider(provider), None);

    let (cancel_outcome, complete_outcome) = tokio::join!(cancel, complete);
    let succeeded = [cancel_outcome.is_ok(), complete_outcome.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(succeeded, 1);

    let current = harness.deps.store.booking(booking.id).await.unwrap();
    assert!(current.status.is_terminal());
    // The loser never overwrote the winner's terminal state
    match current.status {
        BookingStatus::Cancelled => assert!(complete_outcome.is_err()),
        BookingStatus::Completed => assert!(cancel_outcome.is_err()),
        other => panic!("unexpected terminal status: {other}"),
    }
}
