//! Booking lifecycle engine for an on-demand local services marketplace.
//!
//! The authoritative core behind the client and provider apps: a client posts
//! a service request, the dispatch arbiter broadcasts it to eligible online
//! providers, exactly one acceptance wins, and the booking then advances
//! through a fixed operational sequence (en route, in progress, completed)
//! with OTP-gated service start and real-time fan-out to both parties.
//!
//! Everything presentational (screens, admin panels, CSV export) lives in the
//! apps; they talk to this engine through the actions in
//! [`domains::bookings::actions`] and [`domains::dispatch::actions`] and the
//! SSE streams served by [`server`].

pub mod common;
pub mod domains;
pub mod kernel;
pub mod server;

pub use kernel::config::Config;
