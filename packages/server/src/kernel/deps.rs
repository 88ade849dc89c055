//! Central dependency container handed to every action.
//!
//! All external services sit behind the `Base*` traits so the engine can run
//! against mocks in tests; the store itself is trait-backed for the same
//! reason (Postgres in production, in-memory in tests).

use std::sync::Arc;

use super::config::Config;
use super::stream_hub::StreamHub;
use super::traits::{BaseAuditLog, BasePaymentService, BaseProviderPresence};
use crate::domains::bookings::data::BookingStore;

#[derive(Clone)]
pub struct EngineDeps {
    pub store: Arc<dyn BookingStore>,
    pub presence: Arc<dyn BaseProviderPresence>,
    pub payments: Arc<dyn BasePaymentService>,
    pub audit: Arc<dyn BaseAuditLog>,
    pub stream_hub: StreamHub,
    pub config: Arc<Config>,
}

impl EngineDeps {
    pub fn new(
        store: Arc<dyn BookingStore>,
        presence: Arc<dyn BaseProviderPresence>,
        payments: Arc<dyn BasePaymentService>,
        audit: Arc<dyn BaseAuditLog>,
        stream_hub: StreamHub,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            presence,
            payments,
            audit,
            stream_hub,
            config,
        }
    }
}
