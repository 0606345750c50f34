//! Unified error types for the btboost firmware.
//!
//! A single `Error` enum every subsystem can convert into, keeping the
//! top-level bootstrap's error handling uniform. All variants are `Copy`
//! so they can be passed around without allocation.
//!
//! Directive failures are deliberately NOT represented here: the radio and
//! transport adapters log rejected directives and move on, because the
//! controller's mode is authoritative regardless of whether the underlying
//! radio configuration converged.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A communication subsystem failed to come up.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

/// Startup failures of the Bluetooth subsystems. These are fatal: the
/// controller has no meaningful degraded behaviour without a working radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    BtControllerInitFailed,
    BluedroidInitFailed,
    GattRegisterFailed,
    SppInitFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BtControllerInitFailed => write!(f, "BT controller init failed"),
            Self::BluedroidInitFailed => write!(f, "Bluedroid init failed"),
            Self::GattRegisterFailed => write!(f, "GATT app register failed"),
            Self::SppInitFailed => write!(f, "SPP init failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
