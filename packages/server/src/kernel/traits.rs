// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The external
// collaborators (presence service, payment gateway, audit sink) sit behind
// them so the engine can be driven by mocks in tests.
//
// Naming convention: Base* for trait names

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{Actor, BookingId, ClientId, Coordinates, ProviderId};
use crate::domains::bookings::models::PaymentStatus;

// =============================================================================
// Provider Presence (external presence service; read-only to the engine)
// =============================================================================

#[async_trait]
pub trait BaseProviderPresence: Send + Sync {
    /// Providers that are online, serve `category`, and sit within
    /// `radius_km` of `location`. Pure query, no side effects on the core.
    async fn list_eligible_providers(
        &self,
        category: &str,
        location: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<ProviderId>>;
}

// =============================================================================
// Payment collaborator (gateway logic lives elsewhere)
// =============================================================================

#[async_trait]
pub trait BasePaymentService: Send + Sync {
    /// Settles the final cost after completion. The engine only records the
    /// resulting payment status.
    async fn charge(
        &self,
        booking_id: BookingId,
        client_id: ClientId,
        amount: f64,
    ) -> Result<PaymentStatus>;
}

// =============================================================================
// Audit log (admin override path must leave a trail)
// =============================================================================

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: String,
    pub actor: Actor,
    pub booking_id: BookingId,
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait BaseAuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Default audit sink: structured tracing records. Deployments that need a
/// queryable trail swap in a database-backed implementation.
pub struct TracingAuditLog;

#[async_trait]
impl BaseAuditLog for TracingAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        tracing::warn!(
            action = %entry.action,
            actor = %entry.actor,
            booking_id = %entry.booking_id,
            reason = %entry.reason,
            at = %entry.at,
            "admin override"
        );
        Ok(())
    }
}

/// Payment service used until a gateway is wired in: logs the charge and
/// leaves the payment pending for offline settlement.
pub struct NoopPaymentService;

#[async_trait]
impl BasePaymentService for NoopPaymentService {
    async fn charge(
        &self,
        booking_id: BookingId,
        client_id: ClientId,
        amount: f64,
    ) -> Result<PaymentStatus> {
        tracing::info!(
            booking_id = %booking_id,
            client_id = %client_id,
            amount,
            "payment charge recorded for offline settlement"
        );
        Ok(PaymentStatus::Pending)
    }
}
