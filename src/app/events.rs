//! Outbound application events.
//!
//! The [`PowerModeController`](super::service::PowerModeController) emits
//! these through the [`EventSink`](super::ports::EventSink) port. Adapters
//! on the other side decide what to do with them — log to serial, update a
//! status characteristic, etc.

use crate::power::Mode;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller has started (carries initial mode).
    Started(Mode),

    /// The controller switched modes.
    ModeChanged { from: Mode, to: Mode },

    /// A central connected.
    LinkUp { conn_id: u16 },

    /// The central disconnected.
    LinkDown,

    /// The bulk transport was started or stopped by an explicit command.
    BoostChanged { enabled: bool },

    /// A sampling window closed with the given byte count.
    WindowSampled { bytes: u32, promoted: bool },

    /// The inactivity deadline forced a demotion to Idle.
    InactivityDemotion,
}
