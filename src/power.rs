//! Power-mode vocabulary and the per-mode entry-effect table.
//!
//! `Mode` is the controller's power/throughput posture. Each mode fully
//! determines transmit power and advertising interval; entering a mode
//! issues a fixed, ordered set of radio directives. The table is a pure
//! function of (mode, link state, config) so it can be tested without any
//! controller or adapter involvement.
//!
//! ```text
//!  IDLE ───[connect]──▶ PROBE ◀──[window < threshold, connected]── ACTIVE
//!   ▲  ▲                  │                                          ▲
//!   │  │          [window ≥ threshold]────────────────────────────────┘
//!   │  └───[window elapsed, disconnected]
//!   └──────[inactivity deadline]─── (any mode)
//! ```
//!
//! The bulk transport never appears as an *enable* effect here: only an
//! explicit BoostOn command starts it. Idle entry does carry the disable
//! effect, so a forced demotion always tears the transport down.

use crate::config::{ConnParamPreset, SystemConfig};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// The controller's current power/throughput posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    /// Minimum transmit power, slow advertising, bulk transport disabled.
    Idle = 0,
    /// Minimum transmit power, fast advertising; traffic volume under assessment.
    Probe = 1,
    /// Maximum transmit power, tightened connection parameters.
    Active = 2,
}

impl Mode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Probe => "Probe",
            Self::Active => "Active",
        }
    }
}

// ---------------------------------------------------------------------------
// Link state
// ---------------------------------------------------------------------------

/// Whether a BLE central is currently connected. The connection id is
/// opaque; it is only echoed back into directives that target the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected(u16),
}

impl LinkState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn conn_id(self) -> Option<u16> {
        match self {
            Self::Connected(id) => Some(id),
            Self::Disconnected => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Directive vocabulary
// ---------------------------------------------------------------------------

/// Which radio context a transmit-power directive applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxContext {
    Advertising,
    Connection,
}

/// Advertising parameter set, fully determined by `Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvPreset {
    Slow,
    Fast,
}

impl AdvPreset {
    /// Advertising interval for this preset (0.625 ms units).
    pub fn interval(self, cfg: &SystemConfig) -> u16 {
        match self {
            Self::Slow => cfg.adv_interval_slow,
            Self::Fast => cfg.adv_interval_fast,
        }
    }
}

/// Connection-parameter preset identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnPreset {
    PowerSave,
    LowLatency,
}

impl ConnPreset {
    pub fn params(self, cfg: &SystemConfig) -> ConnParamPreset {
        match self {
            Self::PowerSave => cfg.conn_params_power_save,
            Self::LowLatency => cfg.conn_params_low_latency,
        }
    }
}

/// A one-way, fire-and-forget instruction to the radio/transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    SetTxPower { context: TxContext, dbm: i8 },
    StartAdvertising(AdvPreset),
    RequestConnParams { conn_id: u16, preset: ConnPreset },
    StopBulkTransport,
}

/// Maximum number of entry effects any mode produces.
pub const MAX_ENTRY_EFFECTS: usize = 4;

// ---------------------------------------------------------------------------
// Entry-effect table
// ---------------------------------------------------------------------------

/// The ordered directives issued when entering `mode`.
///
/// Order is part of the contract: transmit power is set before any
/// advertising restart so the radio never advertises at a stale power
/// level, and Idle tears the bulk transport down before touching the
/// radio. Advertising directives are gated on `Disconnected`; a
/// connection-parameter request is gated on `Connected`.
pub fn entry_effects(
    mode: Mode,
    link: LinkState,
    cfg: &SystemConfig,
) -> heapless::Vec<Directive, MAX_ENTRY_EFFECTS> {
    let mut fx = heapless::Vec::new();
    let low = cfg.tx_power_low_dbm;
    let high = cfg.tx_power_high_dbm;

    match mode {
        Mode::Idle => {
            let _ = fx.push(Directive::StopBulkTransport);
            let _ = fx.push(Directive::SetTxPower {
                context: TxContext::Advertising,
                dbm: low,
            });
            let _ = fx.push(Directive::SetTxPower {
                context: TxContext::Connection,
                dbm: low,
            });
            if !link.is_connected() {
                let _ = fx.push(Directive::StartAdvertising(AdvPreset::Slow));
            }
        }
        Mode::Probe => {
            let _ = fx.push(Directive::SetTxPower {
                context: TxContext::Advertising,
                dbm: low,
            });
            let _ = fx.push(Directive::SetTxPower {
                context: TxContext::Connection,
                dbm: low,
            });
            if !link.is_connected() {
                let _ = fx.push(Directive::StartAdvertising(AdvPreset::Fast));
            }
        }
        Mode::Active => {
            let _ = fx.push(Directive::SetTxPower {
                context: TxContext::Advertising,
                dbm: high,
            });
            let _ = fx.push(Directive::SetTxPower {
                context: TxContext::Connection,
                dbm: high,
            });
            if let Some(id) = link.conn_id() {
                let _ = fx.push(Directive::RequestConnParams {
                    conn_id: id,
                    preset: ConnPreset::LowLatency,
                });
            }
        }
    }

    fx
}
