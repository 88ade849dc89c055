//! The bookings domain: entity models, the CAS-guarded store, the lifecycle
//! state machine, OTP verification, and the party-facing actions.

pub mod actions;
pub mod data;
pub mod errors;
pub mod events;
pub mod machines;
pub mod models;
pub mod otp;
