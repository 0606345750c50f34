//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`]: the system configuration is stored as one
//! postcard blob under the `btboost` namespace. All fields are
//! range-checked before persistence — bad values are rejected, not
//! clamped. On ESP32, NVS commits are atomic per nvs_commit().

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "btboost";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "syscfg";

#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsStore {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after a partition version mismatch the NVS
    /// partition is erased and re-initialised automatically. Returns
    /// `Err(ConfigError::IoError)` only if that recovery also fails.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open the config namespace, run a closure with the handle, close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = CONFIG_NAMESPACE.as_bytes();
        ns_buf[..ns_bytes.len()].copy_from_slice(ns_bytes);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(1_000..=600_000).contains(&cfg.inactivity_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "inactivity_timeout_ms must be 1000–600000",
        ));
    }
    if !(100..=60_000).contains(&cfg.activity_window_ms) {
        return Err(ConfigError::ValidationFailed(
            "activity_window_ms must be 100–60000",
        ));
    }
    if cfg.activity_window_ms >= cfg.inactivity_timeout_ms {
        return Err(ConfigError::ValidationFailed(
            "activity_window_ms must be < inactivity_timeout_ms",
        ));
    }
    if cfg.activity_bytes_threshold == 0 {
        return Err(ConfigError::ValidationFailed(
            "activity_bytes_threshold must be >= 1",
        ));
    }
    for (name, preset) in [
        ("conn_params_low_latency", &cfg.conn_params_low_latency),
        ("conn_params_power_save", &cfg.conn_params_power_save),
    ] {
        if preset.interval_min > preset.interval_max {
            return Err(ConfigError::ValidationFailed(name));
        }
        if !(6..=3200).contains(&preset.interval_min) || !(6..=3200).contains(&preset.interval_max)
        {
            return Err(ConfigError::ValidationFailed(name));
        }
        if !(10..=3200).contains(&preset.timeout) {
            return Err(ConfigError::ValidationFailed(name));
        }
    }
    for interval in [cfg.adv_interval_slow, cfg.adv_interval_fast] {
        if !(0x20..=0x4000).contains(&interval) {
            return Err(ConfigError::ValidationFailed(
                "advertising interval must be 0x20–0x4000",
            ));
        }
    }
    if cfg.tx_power_low_dbm > cfg.tx_power_high_dbm {
        return Err(ConfigError::ValidationFailed(
            "tx_power_low_dbm must be <= tx_power_high_dbm",
        ));
    }
    if !(-24..=9).contains(&cfg.tx_power_low_dbm) || !(-24..=9).contains(&cfg.tx_power_high_dbm) {
        return Err(ConfigError::ValidationFailed(
            "tx power must be -24–9 dBm",
        ));
    }
    if !(5..=1_000).contains(&cfg.button_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "button_poll_interval_ms must be 5–1000",
        ));
    }
    if cfg.ble_device_name.is_empty() || cfg.spp_service_name.is_empty() {
        return Err(ConfigError::ValidationFailed("device names must be non-empty"));
    }
    Ok(())
}

impl ConfigPort for NvsStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsStore: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsStore: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let key_cstr = b"syscfg\0";
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsStore: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsStore: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsStore: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsStore: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(true, |handle| {
                let key_cstr = b"syscfg\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsStore: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsStore: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_config(&SystemConfig::default()).is_ok());
    }

    #[test]
    fn rejects_window_longer_than_deadline() {
        let cfg = SystemConfig {
            inactivity_timeout_ms: 2_000,
            activity_window_ms: 3_000,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_zero_byte_threshold() {
        let cfg = SystemConfig {
            activity_bytes_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_inverted_conn_interval() {
        let mut cfg = SystemConfig::default();
        cfg.conn_params_low_latency.interval_min = 100;
        cfg.conn_params_low_latency.interval_max = 50;
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_adv_interval() {
        let cfg = SystemConfig {
            adv_interval_fast: 0x10,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_inverted_tx_power() {
        let cfg = SystemConfig {
            tx_power_low_dbm: 9,
            tx_power_high_dbm: -24,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = NvsStore::new().unwrap();
        let cfg = SystemConfig {
            inactivity_timeout_ms: 30_000,
            activity_bytes_threshold: 512,
            ..Default::default()
        };
        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_without_save_yields_defaults() {
        let store = NvsStore::new().unwrap();
        assert_eq!(store.load().unwrap(), SystemConfig::default());
    }

    #[test]
    fn save_rejects_invalid_without_persisting() {
        let store = NvsStore::new().unwrap();
        let bad = SystemConfig {
            activity_bytes_threshold: 0,
            ..Default::default()
        };
        assert!(store.save(&bad).is_err());
        assert_eq!(store.load().unwrap(), SystemConfig::default());
    }
}
