//! Eligibility filtering on the fan-out path.

mod common;

use common::TestHarness;
use server_core::common::ProviderId;
use server_core::domains::bookings::data::BookingStore;
use server_core::domains::bookings::errors::BookingError;
use server_core::domains::bookings::models::BookingStatus;
use server_core::domains::dispatch;
use server_core::kernel::test_dependencies::{MockProviderPresence, TestDependencies};

#[tokio::test]
async fn offline_wrong_category_and_far_providers_are_skipped() {
    let eligible = ProviderId::new();
    let offline = ProviderId::new();
    let wrong_trade = ProviderId::new();
    let out_of_town = ProviderId::new();

    let presence = MockProviderPresence::new()
        .with_provider(eligible, common::nearby(), &[common::CATEGORY])
        .with_offline_provider(offline, common::nearby(), &[common::CATEGORY])
        .with_provider(wrong_trade, common::nearby(), &["Electrician"])
        .with_provider(out_of_town, common::another_city(), &[common::CATEGORY]);
    let harness = TestHarness::build(TestDependencies::new().mock_presence(presence));

    let booking = harness.create_booking().await;
    assert_eq!(booking.status, BookingStatus::Pending);

    let requests = harness
        .deps
        .store
        .requests_for_booking(booking.id)
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].provider_id, eligible);
}

#[tokio::test]
async fn broadcast_refuses_non_requested_bookings() {
    let provider = ProviderId::new();
    let harness = TestHarness::with_online_providers(&[provider]);

    // create_booking already broadcast; the booking is PENDING now
    let booking = harness.create_booking().await;
    let err = dispatch::actions::broadcast(&harness.deps, booking.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::Conflict {
            expected: BookingStatus::Requested,
            actual: BookingStatus::Pending,
        }
    ));

    // No duplicate offers appeared
    let requests = harness
        .deps
        .store
        .requests_for_booking(booking.id)
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
}
