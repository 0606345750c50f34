//! Port traits — the hexagonal boundary between the controller and the
//! Bluetooth stack.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PowerModeController (domain)
//! ```
//!
//! Driven adapters (radio, bulk transport, timers, config storage, event
//! sinks) implement these traits. The controller consumes them via
//! generics, so the domain core never touches Bluedroid directly.
//!
//! All radio and transport calls are fire-and-forget: implementations log
//! rejections and never report them back, because the controller's mode
//! is authoritative regardless of whether the hardware converged.

use crate::config::SystemConfig;
use crate::power::{AdvPreset, ConnPreset, TxContext};

// ───────────────────────────────────────────────────────────────
// Radio directive sink (driven adapter: domain → GAP layer)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the controller issues radio directives through this.
pub trait RadioPort {
    /// Set the transmit power for one radio context.
    fn set_tx_power(&mut self, context: TxContext, dbm: i8);

    /// (Re)start advertising with the given parameter set.
    fn start_advertising(&mut self, preset: AdvPreset);

    /// Ask the central to renegotiate connection parameters. A request
    /// targeting a stale connection id is dropped by the stack.
    fn request_conn_params(&mut self, conn_id: u16, preset: ConnPreset);
}

// ───────────────────────────────────────────────────────────────
// Bulk transport gate (driven adapter: domain → SPP)
// ───────────────────────────────────────────────────────────────

/// Start/stop control over the secondary high-throughput transport.
/// Both operations are idempotent. Only the controller calls these —
/// no other component may toggle the transport.
pub trait TransportPort {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Deadline/window timers (driven adapter: domain → esp_timer)
// ───────────────────────────────────────────────────────────────

/// Rearm control over the controller's two timers.
///
/// The inactivity deadline is stop-then-start; `generation` is what the
/// controller will accept when the armed instance expires, letting it
/// discard an expiry that raced a restart. The sampling window is
/// periodic; restarting it resets the window phase.
pub trait DeadlinePort {
    fn restart_inactivity(&mut self, generation: u32);
    fn restart_window(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, a notify
/// characteristic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] semantics are up to the caller
    /// on [`ConfigError::NotFound`] (first boot).
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
