//! Hybrid BT power-mode firmware — main entry point.
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  BtIo (GAP · SPP · esp_timer)   LogEventSink   NvsStore  │
//! │                                                          │
//! │  ───────────── Port Trait Boundary ─────────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │      PowerModeController (pure logic)          │      │
//! │  │  Idle · Probe · Active                         │      │
//! │  └────────────────────────────────────────────────┘      │
//! │                                                          │
//! │  Event queue (Bluedroid callbacks + timers → main loop)  │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use btboost::adapters::ble;
use btboost::adapters::log_sink::LogEventSink;
use btboost::adapters::nvs::NvsStore;
use btboost::adapters::time::MonotonicClock;
use btboost::adapters::BtIo;
use btboost::app::ports::ConfigPort;
use btboost::app::service::PowerModeController;
use btboost::config::SystemConfig;
use btboost::drivers::button::{self, ButtonDriver};
use btboost::drivers::hw_timer;
use btboost::events::{self, push_event, Event};
use btboost::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("btboost v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsStore::new() {
        Ok(nvs) => match nvs.load() {
            Ok(cfg) => {
                info!("Config loaded from NVS");
                cfg
            }
            Err(e) => {
                warn!("NVS config load failed ({}), using defaults", e);
                SystemConfig::default()
            }
        },
        Err(e) => {
            warn!("NVS init failed ({}), using defaults and no persistence", e);
            SystemConfig::default()
        }
    };

    // ── 3. DFS power-management hint ──────────────────────────
    // Lets the idle task drop the CPU clock between Bluetooth events.
    // A rejection (pm support not compiled in) is non-fatal.
    unsafe {
        let pm = esp_idf_svc::sys::esp_pm_config_t {
            max_freq_mhz: 160,
            min_freq_mhz: 80,
            light_sleep_enable: false,
        };
        let rc = esp_idf_svc::sys::esp_pm_configure(&pm as *const _ as *const core::ffi::c_void);
        if rc != esp_idf_svc::sys::ESP_OK {
            warn!("esp_pm_configure rejected (rc={})", rc);
        }
    }

    // ── 4. Bluetooth stack + timers + button ──────────────────
    ble::init(&config)?;
    hw_timer::init_timers(config.inactivity_timeout_ms, config.activity_window_ms);
    button::init_gpio(pins::BUTTON_GPIO)?;

    // ── 5. Controller + adapters ──────────────────────────────
    let mut io = BtIo::new(config.clone());
    let mut sink = LogEventSink::new();
    let mut ctrl = PowerModeController::new(config.clone());
    ctrl.start(&mut io, &mut sink);

    let mut btn = ButtonDriver::new(pins::BUTTON_GPIO);
    let clock = MonotonicClock::new();

    info!("Ready: advertising low-power. Write BOOST_ON to the control char for SPP boost.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        std::thread::sleep(std::time::Duration::from_millis(
            config.button_poll_interval_ms as u64,
        ));

        if btn.on_sample(button::sample(btn.gpio())) {
            info!("Button edge at {} ms -> manual wake", clock.uptime_ms());
            push_event(Event::ButtonPressed);
        }

        events::drain_events(|event| match event {
            Event::Connected { conn_id } => ctrl.on_connect(conn_id, &mut io, &mut sink),
            Event::Disconnected => ctrl.on_disconnect(&mut io, &mut sink),
            Event::RelayWrite { len } | Event::BulkReceive { len } => {
                ctrl.on_qualifying_traffic(len as usize, &mut io);
            }
            Event::Control(cmd) => ctrl.on_control_command(cmd, &mut io, &mut sink),
            Event::BulkOpened => info!("Bulk transport: client connected"),
            Event::BulkClosed => info!("Bulk transport: client closed"),
            Event::InactivityExpired { generation } => {
                ctrl.on_inactivity_expired(generation, &mut io, &mut sink);
            }
            Event::WindowElapsed => ctrl.on_window_elapsed(&mut io, &mut sink),
            Event::ButtonPressed => ctrl.on_manual_trigger(&mut io, &mut sink),
        });
    }
}
