//! The dispatch domain: request broadcast and acceptance arbitration.

pub mod actions;
