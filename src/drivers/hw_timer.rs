//! Acquisition timers using ESP-IDF's esp_timer API.
//!
//! Two periodic timers feed the event queue:
//!
//! - the **duty timer** (500 µs) pushes [`Event::MqDutyTick`] for the
//!   heater duty-cycle driver;
//! - the **sample timer** (20 ms) pushes [`Event::MqSampleTick`] while a
//!   measurement batch is in flight. Arming it pushes one tick
//!   immediately ("run now"), so the first ADC sample lands at the very
//!   start of the window.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call `push_event()` which uses atomics only.
//!
//! On simulation targets both timers are inert; tests drive the state
//! machines directly.

use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{error, info};

#[cfg(target_os = "espidf")]
use crate::sensors::mq::{HW_TICK_US, SAMPLE_TICK_MS};

#[cfg(target_os = "espidf")]
static mut DUTY_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut SAMPLE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: DUTY_TIMER/SAMPLE_TIMER are created once, lazily, from the
/// single main task; callbacks only call `push_event()` (atomic SPSC).
#[cfg(target_os = "espidf")]
unsafe extern "C" fn duty_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::MqDutyTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::MqSampleTick);
}

#[cfg(target_os = "espidf")]
unsafe fn ensure_timer(
    handle: *mut esp_timer_handle_t,
    callback: esp_timer_cb_t,
    name: &'static [u8],
) -> bool {
    // SAFETY: caller holds the main-task-only contract for `handle`.
    unsafe {
        if !(*handle).is_null() {
            return true;
        }
        let args = esp_timer_create_args_t {
            callback,
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: name.as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, handle);
        if ret != ESP_OK {
            error!("hw_timer: create failed (rc={})", ret);
            return false;
        }
        true
    }
}

/// Start the 500 µs duty-cycle timer.
#[cfg(target_os = "espidf")]
pub fn start_duty_timer() {
    // SAFETY: main-task only; see the static contracts above.
    unsafe {
        if !ensure_timer(&raw mut DUTY_TIMER, Some(duty_tick_cb), b"mq_duty\0") {
            return;
        }
        let ret = esp_timer_start_periodic(DUTY_TIMER, HW_TICK_US);
        if ret != ESP_OK {
            error!("hw_timer: duty start failed (rc={})", ret);
            return;
        }
    }
    info!("hw_timer: duty tick @ {} us", HW_TICK_US);
}

#[cfg(not(target_os = "espidf"))]
pub fn start_duty_timer() {
    log::info!("hw_timer(sim): duty timer not started");
}

/// Stop the duty-cycle timer. Idempotent.
#[cfg(target_os = "espidf")]
pub fn stop_duty_timer() {
    // SAFETY: main-task only; stop on a never-started timer is guarded.
    unsafe {
        if !DUTY_TIMER.is_null() {
            esp_timer_stop(DUTY_TIMER);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_duty_timer() {}

/// Arm the 20 ms sampling timer and push the immediate first tick.
#[cfg(target_os = "espidf")]
pub fn start_sample_timer() {
    // SAFETY: main-task only; see the static contracts above.
    unsafe {
        if !ensure_timer(&raw mut SAMPLE_TIMER, Some(sample_tick_cb), b"mq_sample\0") {
            return;
        }
        let ret = esp_timer_start_periodic(SAMPLE_TIMER, u64::from(SAMPLE_TICK_MS) * 1000);
        if ret != ESP_OK {
            error!("hw_timer: sample start failed (rc={})", ret);
            return;
        }
    }
    // Run-now semantics: the first sample must not wait a full period.
    push_event(Event::MqSampleTick);
}

#[cfg(not(target_os = "espidf"))]
pub fn start_sample_timer() {
    push_event(Event::MqSampleTick);
}

/// Cancel the sampling timer. Idempotent; called from batch finalize and
/// from subsystem disable.
#[cfg(target_os = "espidf")]
pub fn stop_sample_timer() {
    // SAFETY: main-task only; stop on a never-started timer is guarded.
    unsafe {
        if !SAMPLE_TIMER.is_null() {
            esp_timer_stop(SAMPLE_TIMER);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_sample_timer() {}
