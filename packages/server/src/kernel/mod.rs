pub mod config;
pub mod deps;
pub mod presence;
pub mod scheduled_tasks;
pub mod stream_hub;
pub mod test_dependencies;
pub mod traits;

pub use config::Config;
pub use deps::EngineDeps;
pub use stream_hub::StreamHub;
pub use traits::{
    AuditEntry, BaseAuditLog, BasePaymentService, BaseProviderPresence, NoopPaymentService,
    TracingAuditLog,
};
