//! Shared harness for engine integration tests.
//!
//! Everything runs against the in-memory store and mock collaborators, so
//! tests exercise real action/dispatch code paths without Postgres.

#![allow(dead_code)]

use server_core::common::{ClientId, Coordinates, ProviderId};
use server_core::domains::bookings::actions::{self, CreateBookingArgs};
use server_core::domains::bookings::data::BookingStore;
use server_core::domains::bookings::models::{Booking, BookingRequest, RequestStatus};
use server_core::kernel::test_dependencies::{MockProviderPresence, TestDependencies};
use server_core::kernel::EngineDeps;

pub const CATEGORY: &str = "Plumber";

/// A point in the serviced city.
pub fn downtown() -> Coordinates {
    Coordinates::new(28.7041, 77.1025)
}

/// Roughly 2km from downtown, well inside the default radius.
pub fn nearby() -> Coordinates {
    Coordinates::new(28.7221, 77.1025)
}

/// Far outside any sane geofence.
pub fn another_city() -> Coordinates {
    Coordinates::new(19.0760, 72.8777)
}

pub struct TestHarness {
    pub td: TestDependencies,
    pub deps: EngineDeps,
    pub client_id: ClientId,
}

impl TestHarness {
    /// Harness with `providers` online sessions for [`CATEGORY`] near
    /// downtown.
    pub fn with_online_providers(providers: &[ProviderId]) -> Self {
        let mut presence = MockProviderPresence::new();
        for &provider_id in providers {
            presence = presence.with_provider(provider_id, nearby(), &[CATEGORY]);
        }
        Self::build(TestDependencies::new().mock_presence(presence))
    }

    pub fn with_no_providers() -> Self {
        Self::build(TestDependencies::new())
    }

    pub fn build(td: TestDependencies) -> Self {
        let deps = td.into_deps();
        Self {
            td,
            deps,
            client_id: ClientId::new(),
        }
    }

    /// Creates a booking for [`CATEGORY`] at downtown and returns it after
    /// broadcast (PENDING when providers were eligible, REQUESTED otherwise).
    pub async fn create_booking(&self) -> Booking {
        actions::create_booking(
            &self.deps,
            CreateBookingArgs {
                client_id: self.client_id,
                service_category: CATEGORY.to_string(),
                requirements: serde_json::json!({"urgency": "normal"}),
                notes: None,
                location: downtown(),
                estimated_cost: Some(500.0),
            },
        )
        .await
        .expect("booking creation failed")
    }

    /// The still-open offer row addressed to one provider.
    pub async fn offer_for(&self, booking: &Booking, provider_id: ProviderId) -> BookingRequest {
        self.deps
            .store
            .requests_for_booking(booking.id)
            .await
            .expect("request fetch failed")
            .into_iter()
            .find(|r| r.provider_id == provider_id && r.status == RequestStatus::Pending)
            .expect("no open offer for provider")
    }
}
