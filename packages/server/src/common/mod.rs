pub mod entity_ids;
pub mod id;
pub mod types;

pub use entity_ids::{BookingId, ClientId, OperatorId, ProviderId, RequestId};
pub use types::{Actor, Coordinates};
