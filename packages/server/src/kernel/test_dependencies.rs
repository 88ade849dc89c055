// TestDependencies - mock implementations for testing
//
// Provides mock collaborators and an in-memory store wired into EngineDeps,
// so lifecycle and race behavior can be exercised without Postgres or any
// external service.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use super::config::Config;
use super::deps::EngineDeps;
use super::stream_hub::StreamHub;
use super::traits::{
    AuditEntry, BaseAuditLog, BasePaymentService, BaseProviderPresence,
};
use crate::common::{BookingId, ClientId, Coordinates, ProviderId};
use crate::domains::bookings::data::MemoryBookingStore;
use crate::domains::bookings::models::PaymentStatus;

// =============================================================================
// Mock Provider Presence
// =============================================================================

#[derive(Debug, Clone)]
struct SessionRow {
    provider_id: ProviderId,
    location: Coordinates,
    categories: Vec<String>,
    is_online: bool,
}

pub struct MockProviderPresence {
    sessions: Mutex<Vec<SessionRow>>,
}

impl MockProviderPresence {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Registers an online provider session.
    pub fn with_provider(
        self,
        provider_id: ProviderId,
        location: Coordinates,
        categories: &[&str],
    ) -> Self {
        self.sessions.lock().unwrap().push(SessionRow {
            provider_id,
            location,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            is_online: true,
        });
        self
    }

    /// Registers an offline session (must never be matched).
    pub fn with_offline_provider(
        self,
        provider_id: ProviderId,
        location: Coordinates,
        categories: &[&str],
    ) -> Self {
        self.sessions.lock().unwrap().push(SessionRow {
            provider_id,
            location,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            is_online: false,
        });
        self
    }
}

impl Default for MockProviderPresence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseProviderPresence for MockProviderPresence {
    async fn list_eligible_providers(
        &self,
        category: &str,
        location: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<ProviderId>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.is_online
                    && s.categories.iter().any(|c| c == category)
                    && s.location.distance_km(&location) <= radius_km
            })
            .map(|s| s.provider_id)
            .collect())
    }
}

// =============================================================================
// Mock Payment Service
// =============================================================================

pub struct MockPaymentService {
    outcome: PaymentStatus,
    charges: Mutex<Vec<(BookingId, ClientId, f64)>>,
}

impl MockPaymentService {
    pub fn new() -> Self {
        Self {
            outcome: PaymentStatus::Paid,
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcome(mut self, outcome: PaymentStatus) -> Self {
        self.outcome = outcome;
        self
    }

    /// All charges issued so far.
    pub fn charges(&self) -> Vec<(BookingId, ClientId, f64)> {
        self.charges.lock().unwrap().clone()
    }
}

impl Default for MockPaymentService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePaymentService for MockPaymentService {
    async fn charge(
        &self,
        booking_id: BookingId,
        client_id: ClientId,
        amount: f64,
    ) -> Result<PaymentStatus> {
        self.charges
            .lock()
            .unwrap()
            .push((booking_id, client_id, amount));
        Ok(self.outcome)
    }
}

// =============================================================================
// Recording Audit Log
// =============================================================================

pub struct RecordingAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Default for RecordingAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuditLog for RecordingAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

// =============================================================================
// TestDependencies - builder
// =============================================================================

pub struct TestDependencies {
    pub store: Arc<MemoryBookingStore>,
    pub presence: Arc<MockProviderPresence>,
    pub payments: Arc<MockPaymentService>,
    pub audit: Arc<RecordingAuditLog>,
    pub stream_hub: StreamHub,
    pub config: Config,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryBookingStore::new()),
            presence: Arc::new(MockProviderPresence::new()),
            payments: Arc::new(MockPaymentService::new()),
            audit: Arc::new(RecordingAuditLog::new()),
            stream_hub: StreamHub::new(),
            config: Config::for_tests(),
        }
    }

    pub fn mock_presence(mut self, presence: MockProviderPresence) -> Self {
        self.presence = Arc::new(presence);
        self
    }

    pub fn mock_payments(mut self, payments: MockPaymentService) -> Self {
        self.payments = Arc::new(payments);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Wires everything into an `EngineDeps`. Keep the `TestDependencies`
    /// around — the mock handles stay shared for assertions.
    pub fn into_deps(&self) -> EngineDeps {
        EngineDeps::new(
            self.store.clone(),
            self.presence.clone(),
            self.payments.clone(),
            self.audit.clone(),
            self.stream_hub.clone(),
            Arc::new(self.config.clone()),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
