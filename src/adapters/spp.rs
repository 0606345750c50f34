//! Classic-BT SPP adapter — the secondary bulk transport.
//!
//! The SPP server exists only while boost is on: `start()` brings the
//! profile up and registers the server, `stop()` deinitialises it
//! entirely. Both are idempotent. Inbound data is echoed back on the
//! same handle and reported to the main loop as qualifying traffic.
//!
//! On non-ESP targets the running flag is tracked without a stack, so
//! host tests can exercise the start/stop discipline.

use core::sync::atomic::{AtomicBool, Ordering};

use log::info;

/// RFCOMM server channel name (not the radio-visible device name).
#[cfg(target_os = "espidf")]
const SPP_SERVER_NAME: &str = "SPP_SERVER\0";

static SPP_RUNNING: AtomicBool = AtomicBool::new(false);

// The radio-visible device name, captured at start for the INIT event.
#[cfg(target_os = "espidf")]
static SPP_DEVICE_NAME: std::sync::Mutex<heapless::String<24>> =
    std::sync::Mutex::new(heapless::String::new());

#[cfg(target_os = "espidf")]
unsafe extern "C" fn spp_event_handler(
    event: esp_idf_svc::sys::esp_spp_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_spp_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_spp_cb_event_t_ESP_SPP_INIT_EVT => {
            // Profile is up — publish the device name and open the server.
            unsafe {
                if let Ok(name) = SPP_DEVICE_NAME.lock() {
                    let raw = crate::adapters::c_device_name(&name);
                    esp_bt_gap_set_device_name(raw.as_ptr() as *const _);
                }
                esp_spp_start_srv(
                    esp_spp_sec_t_ESP_SPP_SEC_NONE,
                    esp_spp_role_t_ESP_SPP_ROLE_SLAVE,
                    0,
                    SPP_SERVER_NAME.as_ptr() as *const _,
                );
            }
        }
        esp_spp_cb_event_t_ESP_SPP_START_EVT => {
            info!("SPP: server started");
        }
        esp_spp_cb_event_t_ESP_SPP_SRV_OPEN_EVT => {
            info!("SPP: client connected");
            crate::events::push_event(crate::events::Event::BulkOpened);
        }
        esp_spp_cb_event_t_ESP_SPP_CLOSE_EVT => {
            info!("SPP: connection closed");
            crate::events::push_event(crate::events::Event::BulkClosed);
        }
        esp_spp_cb_event_t_ESP_SPP_DATA_IND_EVT => {
            let p = unsafe { &(*param).data_ind };
            // Echo back on the same handle.
            unsafe {
                esp_spp_write(p.handle, p.len as i32, p.data);
            }
            crate::events::push_event(crate::events::Event::BulkReceive { len: p.len });
        }
        _ => {}
    }
}

/// Bring the SPP profile up and start the server. No-op when running.
#[cfg(target_os = "espidf")]
pub fn start(device_name: &heapless::String<24>) {
    use esp_idf_svc::sys::*;
    if SPP_RUNNING.swap(true, Ordering::AcqRel) {
        return;
    }
    if let Ok(mut name) = SPP_DEVICE_NAME.lock() {
        *name = device_name.clone();
    }
    // SAFETY: register-then-init from the single main task; the callback
    // only fires after esp_spp_init.
    unsafe {
        esp_spp_register_callback(Some(spp_event_handler));
        let cfg = esp_spp_cfg_t {
            mode: esp_spp_mode_t_ESP_SPP_MODE_CB,
            enable_l2cap_ertm: false,
            tx_buffer_size: 0,
        };
        let rc = esp_spp_enhanced_init(&cfg);
        if rc != ESP_OK {
            log::error!("SPP: init failed (rc={})", rc);
            SPP_RUNNING.store(false, Ordering::Release);
            return;
        }
    }
    info!("SPP: boost transport ON");
}

#[cfg(not(target_os = "espidf"))]
pub fn start(device_name: &heapless::String<24>) {
    if SPP_RUNNING.swap(true, Ordering::AcqRel) {
        return;
    }
    info!("SPP(sim): boost transport ON ('{}')", device_name);
}

/// Tear the SPP profile down. No-op when not running.
#[cfg(target_os = "espidf")]
pub fn stop() {
    if !SPP_RUNNING.swap(false, Ordering::AcqRel) {
        return;
    }
    // SAFETY: deinit from the main task; Bluedroid serialises profile
    // teardown internally.
    unsafe {
        esp_idf_svc::sys::esp_spp_deinit();
    }
    info!("SPP: boost transport OFF");
}

#[cfg(not(target_os = "espidf"))]
pub fn stop() {
    if !SPP_RUNNING.swap(false, Ordering::AcqRel) {
        return;
    }
    info!("SPP(sim): boost transport OFF");
}

/// Whether the bulk transport is currently up.
pub fn is_running() -> bool {
    SPP_RUNNING.load(Ordering::Acquire)
}
