//! Realtime notification stream: per-booking snapshots in commit order,
//! offer pushes to candidate providers, no secrets on the wire.

mod common;

use common::TestHarness;
use server_core::common::{Actor, ProviderId};
use server_core::domains::bookings::actions;
use server_core::domains::bookings::data::BookingStore;
use server_core::domains::bookings::events;
use server_core::domains::dispatch;

#[tokio::test]
async fn subscribers_see_every_transition_in_commit_order() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let booking = harness.create_booking().await;
    let mut rx = harness
        .deps
        .stream_hub
        .subscribe(&events::booking_topic(booking.id))
        .await;

    let offer = harness.offer_for(&booking, provider).await;
    dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap();
    actions::mark_en_route(&harness.deps, booking.id, Actor::Provider(provider))
        .await
        .unwrap();
    let otp = harness.deps.store.booking(booking.id).await.unwrap().otp;
    actions::verify_and_start(&harness.deps, booking.id, Actor::Provider(provider), &otp)
        .await
        .unwrap();

    for expected in ["CONFIRMED", "EN_ROUTE", "IN_PROGRESS"] {
        let event = rx.recv().await.unwrap();
        assert_eq!(event["type"], "status_changed");
        assert_eq!(event["booking"]["status"], expected);
        assert_eq!(
            event["booking"]["id"],
            serde_json::json!(booking.id.to_string())
        );
    }
}

#[tokio::test]
async fn snapshots_never_carry_the_otp() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let booking = harness.create_booking().await;
    let mut rx = harness
        .deps
        .stream_hub
        .subscribe(&events::booking_topic(booking.id))
        .await;

    let offer = harness.offer_for(&booking, provider).await;
    dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert!(event["booking"].get("otp").is_none());
    assert!(event["booking"].get("requirements").is_none());
}

#[tokio::test]
async fn candidate_providers_get_offer_pushes() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let mut rx = harness
        .deps
        .stream_hub
        .subscribe(&events::provider_topic(provider))
        .await;

    let booking = harness.create_booking().await;
    let offer = harness.offer_for(&booking, provider).await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event["type"], "request_offer");
    assert_eq!(
        event["request"]["id"],
        serde_json::json!(offer.id.to_string())
    );
    assert_eq!(event["booking"]["status"], "PENDING");
}

#[tokio::test]
async fn a_repeated_snapshot_is_identical_and_safe_to_reapply() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    let booking = harness.create_booking().await;
    let mut rx_a = harness
        .deps
        .stream_hub
        .subscribe(&events::booking_topic(booking.id))
        .await;
    let mut rx_b = harness
        .deps
        .stream_hub
        .subscribe(&events::booking_topic(booking.id))
        .await;

    let offer = harness.offer_for(&booking, provider).await;
    dispatch::actions::accept(&harness.deps, offer.id, provider)
        .await
        .unwrap();

    // At-least-once delivery means a consumer may see the same snapshot
    // twice; the payload is self-contained so reapplying it is a no-op.
    let from_a = rx_a.recv().await.unwrap();
    let from_b = rx_b.recv().await.unwrap();
    assert_eq!(from_a, from_b);
}
