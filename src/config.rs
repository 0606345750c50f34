//! System configuration parameters
//!
//! All tunable parameters for the power-mode controller and its radio
//! presets. Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// A connection-parameter preset submitted to the BLE stack.
///
/// Intervals are in 1.25 ms units, timeout in 10 ms units — the raw
/// units the GAP layer expects, stored unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnParamPreset {
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    pub timeout: u16,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Activity heuristic ---
    /// Milliseconds without qualifying traffic before forced demotion to Idle
    pub inactivity_timeout_ms: u32,
    /// Sampling window period (milliseconds)
    pub activity_window_ms: u32,
    /// Bytes within one window at or above which the controller promotes to Active
    pub activity_bytes_threshold: u32,

    // --- Connection parameters ---
    /// Tightened parameters requested on promotion to Active
    pub conn_params_low_latency: ConnParamPreset,
    /// Loosened parameters requested for power saving
    pub conn_params_power_save: ConnParamPreset,

    // --- Transmit power ---
    /// Minimum transmit power (dBm) — Idle and Probe
    pub tx_power_low_dbm: i8,
    /// Maximum transmit power (dBm) — Active
    pub tx_power_high_dbm: i8,

    // --- Advertising ---
    /// Slow advertising interval (0.625 ms units) — Idle
    pub adv_interval_slow: u16,
    /// Fast advertising interval (0.625 ms units) — Probe
    pub adv_interval_fast: u16,

    // --- Input ---
    /// Manual-trigger button polling interval (milliseconds)
    pub button_poll_interval_ms: u32,

    // --- Identity ---
    /// BLE advertised device name
    pub ble_device_name: heapless::String<24>,
    /// SPP (bulk transport) service name
    pub spp_service_name: heapless::String<24>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Activity heuristic
            inactivity_timeout_ms: 15_000,
            activity_window_ms: 3_000,
            activity_bytes_threshold: 256,

            // Connection parameters
            conn_params_low_latency: ConnParamPreset {
                interval_min: 6, // 7.5 ms
                interval_max: 12,
                latency: 0,
                timeout: 400, // 4 s
            },
            conn_params_power_save: ConnParamPreset {
                interval_min: 80, // 100 ms
                interval_max: 200,
                latency: 4,
                timeout: 500, // 5 s
            },

            // Transmit power
            tx_power_low_dbm: -24,
            tx_power_high_dbm: 9,

            // Advertising (0.625 ms units: 1600 = 1 s, 160 = 100 ms)
            adv_interval_slow: 1600,
            adv_interval_fast: 160,

            // Input
            button_poll_interval_ms: 20,

            // Identity
            ble_device_name: heapless::String::try_from("ESP32-LOWPOWER-HYBRID")
                .unwrap_or_default(),
            spp_service_name: heapless::String::try_from("ESP32-SPP-BOOST").unwrap_or_default(),
        }
    }
}
