//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                 |
//! |------------|--------------|-----------------------------|
//! | `ble`      | (via `BtIo`) | Bluedroid GAP / GATT server |
//! | `spp`      | (via `BtIo`) | Classic-BT SPP server       |
//! | `log_sink` | EventSink    | Serial log output           |
//! | `nvs`      | ConfigPort   | NVS / in-memory store       |
//! | `time`     | —            | esp_timer monotonic clock   |
//!
//! [`BtIo`] is the single object handed to the controller: it implements
//! [`RadioPort`], [`TransportPort`] and [`DeadlinePort`] by delegating to
//! the Bluetooth adapters and the esp_timer driver.

pub mod ble;
pub mod log_sink;
pub mod nvs;
pub mod spp;
pub mod time;

use crate::app::ports::{DeadlinePort, RadioPort, TransportPort};
use crate::config::SystemConfig;
use crate::power::{AdvPreset, ConnPreset, TxContext};

/// Copy a device name into a NUL-terminated buffer for the Bluedroid
/// `set_device_name` calls, which expect a C string. The heapless buffer
/// itself is not NUL-terminated and its bytes past `len()` are
/// uninitialised, so it must never be passed to FFI directly.
pub fn c_device_name(name: &heapless::String<24>) -> [u8; 25] {
    let mut buf = [0u8; 25];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    buf
}

/// Combined I/O adapter for the power-mode controller.
///
/// Holds a copy of the config so presets resolve to concrete parameters
/// at the port boundary — the domain core only ever speaks in presets.
pub struct BtIo {
    config: SystemConfig,
}

impl BtIo {
    pub fn new(config: SystemConfig) -> Self {
        Self { config }
    }
}

impl RadioPort for BtIo {
    fn set_tx_power(&mut self, context: TxContext, dbm: i8) {
        ble::set_tx_power(context, dbm);
    }

    fn start_advertising(&mut self, preset: AdvPreset) {
        ble::start_advertising(preset.interval(&self.config));
    }

    fn request_conn_params(&mut self, conn_id: u16, preset: ConnPreset) {
        ble::request_conn_params(conn_id, preset.params(&self.config));
    }
}

impl TransportPort for BtIo {
    fn start(&mut self) {
        spp::start(&self.config.spp_service_name);
    }

    fn stop(&mut self) {
        spp::stop();
    }

    fn is_running(&self) -> bool {
        spp::is_running()
    }
}

impl DeadlinePort for BtIo {
    fn restart_inactivity(&mut self, generation: u32) {
        crate::drivers::hw_timer::restart_inactivity(generation);
    }

    fn restart_window(&mut self) {
        crate::drivers::hw_timer::restart_window();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_device_name_is_nul_terminated() {
        let name = heapless::String::try_from("ESP32-LOWPOWER-HYBRID").unwrap();
        let raw = c_device_name(&name);
        assert_eq!(&raw[..name.len()], name.as_bytes());
        assert_eq!(raw[name.len()], 0, "terminator must follow the name bytes");
    }

    #[test]
    fn c_device_name_terminates_a_full_length_name() {
        let name = heapless::String::try_from("123456789012345678901234").unwrap();
        assert_eq!(name.len(), 24);
        let raw = c_device_name(&name);
        assert_eq!(raw[24], 0, "a 24-byte name still carries its terminator");
    }
}
