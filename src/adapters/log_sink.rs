//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production). A future notify
//! characteristic or telemetry channel would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => {
                info!("START | initial_mode={}", mode.name());
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {} -> {}", from.name(), to.name());
            }
            AppEvent::LinkUp { conn_id } => {
                info!("LINK  | up (conn_id={})", conn_id);
            }
            AppEvent::LinkDown => {
                info!("LINK  | down");
            }
            AppEvent::BoostChanged { enabled } => {
                info!("BOOST | {}", if *enabled { "on" } else { "off" });
            }
            AppEvent::WindowSampled { bytes, promoted } => {
                info!("WINDOW| {} bytes, promoted={}", bytes, promoted);
            }
            AppEvent::InactivityDemotion => {
                info!("TIMER | inactivity timeout -> Idle");
            }
        }
    }
}
