//! Application layer — hexagonal core of the firmware.
//!
//! - [`service`] — the power-mode controller (domain logic)
//! - [`ports`] — traits the adapters implement
//! - [`commands`] — inbound control commands
//! - [`events`] — outbound structured events

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
