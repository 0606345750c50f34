//! esp_timer wrappers for the two controller timers.
//!
//! - **Inactivity deadline** — one-shot. Restart is stop-then-start with
//!   the new generation published in between, all under one lock.
//! - **Sampling window** — periodic. Restart resets the window phase.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can block on a `std::sync::Mutex` and call push_event().
//!
//! ## Deadline generation hand-off
//!
//! The expiry callback must report the generation the timer was *armed*
//! with, not whatever is current when the callback happens to run. Both
//! sides go through [`DeadlineLatch`]: `rearm` holds the lock across
//! stop + publish + start, and the callback reads the generation under
//! the same lock. esp_timer_stop removes an undispatched timer from the
//! armed list, so after `rearm` returns the old instance either already
//! ran (and read the old generation, which the controller discards as
//! stale) or never will.

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

use std::sync::Mutex;

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{error, info};

/// Serialises deadline rearms against the expiry callback.
pub(crate) struct DeadlineLatch {
    generation: Mutex<u32>,
}

impl DeadlineLatch {
    pub(crate) const fn new() -> Self {
        Self {
            generation: Mutex::new(0),
        }
    }

    /// Publish `generation` and rearm the timer. `stop` runs before the
    /// store and `start` after it, all under the lock, so an expiry
    /// callback can never observe the new generation while the old
    /// instance is still live.
    pub(crate) fn rearm(&self, generation: u32, stop: impl FnOnce(), start: impl FnOnce()) {
        let mut armed = match self.generation.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        stop();
        *armed = generation;
        start();
    }

    /// Generation of the armed instance, as seen by the expiry callback.
    /// Blocks while a rearm is in progress.
    pub(crate) fn armed_generation(&self) -> u32 {
        match self.generation.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

static DEADLINE_LATCH: DeadlineLatch = DeadlineLatch::new();

#[cfg(target_os = "espidf")]
static mut INACTIVITY_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut WINDOW_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// Periods, fixed at init from the loaded config.
#[cfg(target_os = "espidf")]
static INACTIVITY_MS: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static WINDOW_MS: AtomicU32 = AtomicU32::new(0);

/// SAFETY: INACTIVITY_TIMER is written once in `init_timers()` before any
/// restart or callback touches it. Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn inactivity_timer() -> esp_timer_handle_t {
    unsafe { INACTIVITY_TIMER }
}

/// SAFETY: Same invariants as `inactivity_timer()`.
#[cfg(target_os = "espidf")]
unsafe fn window_timer() -> esp_timer_handle_t {
    unsafe { WINDOW_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn inactivity_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::InactivityExpired {
        generation: DEADLINE_LATCH.armed_generation(),
    });
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn window_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::WindowElapsed);
}

/// Create both timers and start the periodic sampling window.
/// The inactivity deadline stays unarmed until the first restart.
#[cfg(target_os = "espidf")]
pub fn init_timers(inactivity_ms: u32, window_ms: u32) {
    INACTIVITY_MS.store(inactivity_ms, Ordering::Relaxed);
    WINDOW_MS.store(window_ms, Ordering::Relaxed);

    // SAFETY: INACTIVITY_TIMER / WINDOW_TIMER are written here once at
    // boot from the single main-task context before any callbacks fire.
    // The callbacks themselves only read the latch and call push_event().
    unsafe {
        let inactivity_args = esp_timer_create_args_t {
            callback: Some(inactivity_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"inactivity\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&inactivity_args, &raw mut INACTIVITY_TIMER);
        if ret != ESP_OK {
            error!("hw_timer: inactivity timer create failed (rc={})", ret);
            return;
        }

        let window_args = esp_timer_create_args_t {
            callback: Some(window_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"actwindow\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&window_args, &raw mut WINDOW_TIMER);
        if ret != ESP_OK {
            error!("hw_timer: window timer create failed (rc={})", ret);
            return;
        }
        let ret = esp_timer_start_periodic(WINDOW_TIMER, window_ms as u64 * 1000);
        if ret != ESP_OK {
            error!("hw_timer: window timer start failed (rc={})", ret);
            return;
        }

        info!(
            "hw_timer: inactivity={}ms (one-shot) + window={}ms (periodic)",
            inactivity_ms, window_ms
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn init_timers(_inactivity_ms: u32, _window_ms: u32) {
    log::info!("hw_timer(sim): timers not started (events driven by tests)");
}

/// Rearm the inactivity deadline for a full period. `generation` is what
/// the expiry callback will report.
#[cfg(target_os = "espidf")]
pub fn restart_inactivity(generation: u32) {
    DEADLINE_LATCH.rearm(
        generation,
        || {
            // SAFETY: inactivity_timer() contract — main task only.
            // ESP_ERR_INVALID_STATE when not armed — fine.
            unsafe {
                let t = inactivity_timer();
                if !t.is_null() {
                    esp_timer_stop(t);
                }
            }
        },
        || {
            // SAFETY: same contract.
            unsafe {
                let t = inactivity_timer();
                if t.is_null() {
                    return;
                }
                let ret =
                    esp_timer_start_once(t, INACTIVITY_MS.load(Ordering::Relaxed) as u64 * 1000);
                if ret != ESP_OK {
                    error!("hw_timer: inactivity restart failed (rc={})", ret);
                }
            }
        },
    );
}

#[cfg(not(target_os = "espidf"))]
pub fn restart_inactivity(generation: u32) {
    DEADLINE_LATCH.rearm(generation, || {}, || {});
}

/// Restart the periodic sampling window from phase zero.
#[cfg(target_os = "espidf")]
pub fn restart_window() {
    // SAFETY: window_timer() contract — main task only.
    unsafe {
        let t = window_timer();
        if t.is_null() {
            return;
        }
        esp_timer_stop(t);
        let ret = esp_timer_start_periodic(t, WINDOW_MS.load(Ordering::Relaxed) as u64 * 1000);
        if ret != ESP_OK {
            error!("hw_timer: window restart failed (rc={})", ret);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn restart_window() {}

/// Stop both timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if init_timers() succeeded; null-check
    // prevents touching never-created timers.
    unsafe {
        let it = inactivity_timer();
        if !it.is_null() {
            esp_timer_stop(it);
        }
        let wt = window_timer();
        if !wt.is_null() {
            esp_timer_stop(wt);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
