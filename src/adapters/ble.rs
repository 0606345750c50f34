//! Bluedroid BLE adapter — GAP directives plus the GATT relay service.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: dual-mode Bluedroid stack via raw
//!   `esp_idf_svc::sys` calls (BTDM, because the boost transport is
//!   classic-BT SPP).
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID     | Perms          |
//! |----------------|----------|----------------|
//! | Relay RX       | `0xABF1` | Write          |
//! | Relay TX       | `0xABF2` | Read + Notify  |
//! | Control        | `0xABF3` | Write          |
//!
//! Relay RX writes are echoed back on the TX notify characteristic and
//! counted as qualifying traffic. Control writes carry the
//! `BOOST_ON` / `BOOST_OFF` tokens.
//!
//! All directive functions are fire-and-forget: a rejected GAP call is
//! logged and dropped, never reported back to the controller.

use crate::config::ConnParamPreset;
use crate::power::TxContext;

#[cfg(target_os = "espidf")]
use log::{info, warn};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const GATT_SVC_UUID: u16 = 0xABF0;
/// Central → peripheral relay (Write).
pub const GATT_CHAR_RX_UUID: u16 = 0xABF1;
/// Peripheral → central relay (Notify).
pub const GATT_CHAR_TX_UUID: u16 = 0xABF2;
/// Control tokens (Write).
pub const GATT_CHAR_CTL_UUID: u16 = 0xABF3;

/// Sentinel for "no live connection".
pub const CONN_ID_NONE: u32 = 0xFFFF;

// ── ESP-IDF static state (callback-safe atomics) ──────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These atomics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static CONN_ID: AtomicU32 = AtomicU32::new(CONN_ID_NONE);
#[cfg(target_os = "espidf")]
static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static RX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static TX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static CTL_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static CHAR_STEP: AtomicU32 = AtomicU32::new(0);

/// Advertising interval (0.625 ms units) the GAP layer should use when it
/// (re)starts advertising — updated on every start_advertising call so the
/// adv-data-set-complete event re-issues with the mode-appropriate rate.
#[cfg(target_os = "espidf")]
static CURRENT_ADV_INTERVAL: AtomicU32 = AtomicU32::new(1600);

// Peer address of the live connection, needed for conn-param updates.
// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static PEER_BDA: std::sync::Mutex<[u8; 6]> = std::sync::Mutex::new([0; 6]);

// Device name, captured at init for the REG event.
#[cfg(target_os = "espidf")]
static DEVICE_NAME: std::sync::Mutex<heapless::String<24>> =
    std::sync::Mutex::new(heapless::String::new());

#[cfg(target_os = "espidf")]
fn uuid16(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = esp_idf_svc::sys::ESP_UUID_LEN_16 as u16;
    t.uuid.uuid16 = uuid;
    t
}

/// Nearest Bluedroid power level at or below the requested dBm.
#[cfg(target_os = "espidf")]
fn power_level(dbm: i8) -> esp_idf_svc::sys::esp_power_level_t {
    use esp_idf_svc::sys::*;
    match dbm {
        i8::MIN..=-22 => esp_power_level_t_ESP_PWR_LVL_N24,
        -21..=-10 => esp_power_level_t_ESP_PWR_LVL_N12,
        -9..=-4 => esp_power_level_t_ESP_PWR_LVL_N6,
        -3..=2 => esp_power_level_t_ESP_PWR_LVL_N0,
        3..=5 => esp_power_level_t_ESP_PWR_LVL_P3,
        6..=8 => esp_power_level_t_ESP_PWR_LVL_P6,
        _ => esp_power_level_t_ESP_PWR_LVL_P9,
    }
}

// ───────────────────────────────────────────────────────────────
// Callbacks
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        // Adv payload landed in the stack — (re)start advertising at the
        // interval the current mode asked for.
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT
        | esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
            start_advertising(CURRENT_ADV_INTERVAL.load(AtomicOrdering::Relaxed) as u16);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            let status = unsafe { (*param).adv_start_cmpl.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                info!("BLE GAP: advertising started");
            } else {
                warn!("BLE GAP: advertising start failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
            let p = unsafe { &(*param).update_conn_params };
            info!(
                "BLE GAP: conn params updated intv={}-{} lat={} timeout={}",
                p.min_int, p.max_int, p.latency, p.timeout
            );
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            info!("BLE GATTS: app registered (if={})", gatts_if);
            if let Ok(name) = DEVICE_NAME.lock() {
                let raw = crate::adapters::c_device_name(&name);
                unsafe {
                    esp_ble_gap_set_device_name(raw.as_ptr() as *const _);
                }
            }
            let mut adv_data = esp_ble_adv_data_t {
                set_scan_rsp: false,
                include_name: true,
                include_txpower: false,
                appearance: 0,
                flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                ..unsafe { core::mem::zeroed() }
            };
            unsafe {
                esp_ble_gap_config_adv_data(&mut adv_data);
            }
            let mut scan_rsp = esp_ble_adv_data_t {
                set_scan_rsp: true,
                include_name: true,
                ..unsafe { core::mem::zeroed() }
            };
            unsafe {
                esp_ble_gap_config_adv_data(&mut scan_rsp);
            }

            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid16(GATT_SVC_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 12);
            }
        }

        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
            }
            CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            let mut rx_uuid = uuid16(GATT_CHAR_RX_UUID);
            unsafe {
                esp_ble_gatts_add_char(
                    svc_handle,
                    &mut rx_uuid,
                    ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
                    (ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR)
                        as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }

        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    RX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    info!("BLE GATTS: relay RX char (handle={})", handle);
                    CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    let mut tx_uuid = uuid16(GATT_CHAR_TX_UUID);
                    unsafe {
                        esp_ble_gatts_add_char(
                            svc_handle,
                            &mut tx_uuid,
                            ESP_GATT_PERM_READ as esp_gatt_perm_t,
                            (ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY)
                                as esp_gatt_char_prop_t,
                            core::ptr::null_mut(),
                            core::ptr::null_mut(),
                        );
                    }
                }
                2 => {
                    TX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    info!("BLE GATTS: relay TX char (handle={})", handle);
                    let mut cccd_uuid = uuid16(ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16);
                    unsafe {
                        esp_ble_gatts_add_char_descr(
                            svc_handle,
                            &mut cccd_uuid,
                            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                            core::ptr::null_mut(),
                            core::ptr::null_mut(),
                        );
                    }
                }
                3 => {
                    CTL_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    info!("BLE GATTS: control char (handle={}) — all registered", handle);
                    CHAR_STEP.store(4, AtomicOrdering::Relaxed);
                }
                _ => {}
            }
        }

        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let svc_handle = SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            CHAR_STEP.store(3, AtomicOrdering::Relaxed);
            let mut ctl_uuid = uuid16(GATT_CHAR_CTL_UUID);
            unsafe {
                esp_ble_gatts_add_char(
                    svc_handle,
                    &mut ctl_uuid,
                    ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
                    (ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR)
                        as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }

        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            CONN_ID.store(p.conn_id as u32, AtomicOrdering::Relaxed);
            if let Ok(mut bda) = PEER_BDA.lock() {
                *bda = p.remote_bda;
            }
            info!("BLE GATTS: central connected (conn_id={})", p.conn_id);
            crate::events::push_event(crate::events::Event::Connected { conn_id: p.conn_id });
        }

        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            CONN_ID.store(CONN_ID_NONE, AtomicOrdering::Relaxed);
            info!("BLE GATTS: central disconnected");
            crate::events::push_event(crate::events::Event::Disconnected);
        }

        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let handle = p.handle as u32;
            let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };

            if handle == RX_CHAR_HANDLE.load(AtomicOrdering::Relaxed) && !data.is_empty() {
                // Echo back on the TX notify characteristic.
                unsafe {
                    esp_ble_gatts_send_indicate(
                        gatts_if,
                        p.conn_id,
                        TX_CHAR_HANDLE.load(AtomicOrdering::Relaxed) as u16,
                        p.len,
                        p.value,
                        false,
                    );
                }
                crate::events::push_event(crate::events::Event::RelayWrite { len: p.len });
            } else if handle == CTL_CHAR_HANDLE.load(AtomicOrdering::Relaxed) && !data.is_empty() {
                match crate::app::commands::ControlCommand::parse(data) {
                    Some(cmd) => {
                        crate::events::push_event(crate::events::Event::Control(cmd));
                    }
                    None => {
                        warn!("BLE GATTS: unrecognised control write ({} bytes)", p.len);
                    }
                }
            }
        }

        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// Stack bring-up
// ───────────────────────────────────────────────────────────────

/// Initialise the dual-mode controller and Bluedroid, register callbacks,
/// and kick off GATT service registration. Advertising starts once the
/// adv data lands (see the GAP handler).
#[cfg(target_os = "espidf")]
pub fn init(config: &crate::config::SystemConfig) -> crate::error::Result<()> {
    use crate::error::CommsError;
    use esp_idf_svc::sys::*;

    CURRENT_ADV_INTERVAL.store(config.adv_interval_slow as u32, AtomicOrdering::Relaxed);
    if let Ok(mut name) = DEVICE_NAME.lock() {
        *name = config.ble_device_name.clone();
    }

    // SAFETY: single main-task bring-up sequence; no Bluetooth callback
    // can fire before its register call below.
    unsafe {
        let mut bt_cfg = esp_bt_controller_config_t::default();
        if esp_bt_controller_init(&mut bt_cfg) != ESP_OK {
            return Err(CommsError::BtControllerInitFailed.into());
        }
        // BTDM: BLE for the relay service, BR/EDR for the SPP boost link.
        if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BTDM) != ESP_OK {
            return Err(CommsError::BtControllerInitFailed.into());
        }
        if esp_bluedroid_init() != ESP_OK {
            return Err(CommsError::BluedroidInitFailed.into());
        }
        if esp_bluedroid_enable() != ESP_OK {
            return Err(CommsError::BluedroidInitFailed.into());
        }

        esp_ble_gap_register_callback(Some(ble_gap_event_handler));
        esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
        if esp_ble_gatts_app_register(0x55) != ESP_OK {
            return Err(CommsError::GattRegisterFailed.into());
        }
    }

    info!("BLE(espidf): Bluedroid up, device '{}'", config.ble_device_name);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init(config: &crate::config::SystemConfig) -> crate::error::Result<()> {
    log::info!(
        "BLE(sim): '{}' (service 0x{:04X})",
        config.ble_device_name,
        GATT_SVC_UUID
    );
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Directives (fire-and-forget)
// ───────────────────────────────────────────────────────────────

/// Set the transmit power for one radio context.
#[cfg(target_os = "espidf")]
pub fn set_tx_power(context: TxContext, dbm: i8) {
    use esp_idf_svc::sys::*;
    let power_type = match context {
        TxContext::Advertising => esp_ble_power_type_t_ESP_BLE_PWR_TYPE_ADV,
        TxContext::Connection => esp_ble_power_type_t_ESP_BLE_PWR_TYPE_CONN_HDL0,
    };
    // SAFETY: esp_ble_tx_power_set is callable from any task once the
    // controller is enabled.
    let rc = unsafe { esp_ble_tx_power_set(power_type, power_level(dbm)) };
    if rc != ESP_OK {
        warn!("BLE: tx power set {:?}={}dBm rejected (rc={})", context, dbm, rc);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn set_tx_power(context: TxContext, dbm: i8) {
    log::debug!("BLE(sim): tx power {:?} = {} dBm", context, dbm);
}

/// (Re)start advertising at `interval` (0.625 ms units, min == max).
#[cfg(target_os = "espidf")]
pub fn start_advertising(interval: u16) {
    use esp_idf_svc::sys::*;
    CURRENT_ADV_INTERVAL.store(interval as u32, AtomicOrdering::Relaxed);
    // SAFETY: adv params are read synchronously by the GAP call.
    unsafe {
        let mut params = esp_ble_adv_params_t {
            adv_int_min: interval,
            adv_int_max: interval,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..core::mem::zeroed()
        };
        let rc = esp_ble_gap_start_advertising(&mut params);
        if rc != ESP_OK {
            warn!("BLE: advertising start rejected (rc={})", rc);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_advertising(interval: u16) {
    log::debug!("BLE(sim): advertising at {} units", interval);
}

/// Ask the central to renegotiate connection parameters.
#[cfg(target_os = "espidf")]
pub fn request_conn_params(conn_id: u16, params: ConnParamPreset) {
    use esp_idf_svc::sys::*;
    if CONN_ID.load(AtomicOrdering::Relaxed) != conn_id as u32 {
        warn!("BLE: conn param request for stale conn_id {} dropped", conn_id);
        return;
    }
    let bda = match PEER_BDA.lock() {
        Ok(bda) => *bda,
        Err(_) => return,
    };
    let mut update = esp_ble_conn_update_params_t {
        bda,
        min_int: params.interval_min,
        max_int: params.interval_max,
        latency: params.latency,
        timeout: params.timeout,
    };
    // SAFETY: the update struct is read synchronously by the GAP call.
    let rc = unsafe { esp_ble_gap_update_conn_params(&mut update) };
    if rc != ESP_OK {
        warn!("BLE: conn param update rejected (rc={})", rc);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn request_conn_params(conn_id: u16, params: ConnParamPreset) {
    log::debug!(
        "BLE(sim): conn {} params intv={}-{} lat={} timeout={}",
        conn_id,
        params.interval_min,
        params.interval_max,
        params.latency,
        params.timeout
    );
}
