//! Timer-driven event system.
//!
//! Events are produced by:
//! - The 500 µs duty-cycle hardware timer
//! - The 20 ms measurement sampling timer
//! - The UART poll (a full PM frame is buffered)
//! - Software (deferred batch start, deferred display refresh)
//!
//! Events are consumed by the main loop, which processes them one at a
//! time — the cooperative scheduling model: no two handlers ever
//! interleave, so the acquisition state needs no locking.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Duty timer   │────▶│              │     │              │
//! │ Sample timer │────▶│  Event Queue │────▶│  Main Loop   │
//! │ UART poll    │────▶│  (lock-free) │     │  (consumer)  │
//! │ Software     │────▶│              │     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo; sized to absorb a full
/// display-refresh pause worth of 500 µs duty ticks.
const EVENT_QUEUE_CAP: usize = 64;

/// System event types, ordered by rough priority.
/// Lower discriminant = higher priority when multiple events
/// are pending simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Gas acquisition ───────────────────────────────────
    /// 500 µs duty-cycle hardware tick.
    MqDutyTick      = 0,
    /// Deferred measurement-batch start (window entry). Pushed by the
    /// duty-tick handler so the sampling timer is never armed from
    /// inside another timer's callback.
    MqWindowStart   = 1,
    /// 20 ms measurement sampling tick.
    MqSampleTick    = 2,

    // ── PM sensor ─────────────────────────────────────────
    /// At least one full PM frame is waiting in the UART buffer.
    PmUartData      = 10,

    // ── Display ───────────────────────────────────────────
    /// Deferred refresh retry (a refresh was throttled).
    DisplayRefresh  = 20,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Timer callbacks write (produce), main loop reads (consume).
// Uses atomic head/tail indices.  The buffer is intentionally
// kept in a static so timer callbacks can access it.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is accessed under the SPSC discipline only.
// Producer (push_event): ESP timer-task context — one writer.
// Consumer (pop_event): main-loop task — one reader.
// The acquire/release pairs on head/tail order the slot writes.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from timer-task context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the Release store below publishes the write.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback.
/// Processes events in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::MqDutyTick),
        1 => Some(Event::MqWindowStart),
        2 => Some(Event::MqSampleTick),
        10 => Some(Event::PmUartData),
        20 => Some(Event::DisplayRefresh),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The queue is a process-wide static shared by every #[test] thread;
    // serialise the tests that touch it.
    static QUEUE_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn drain_all() {
        while pop_event().is_some() {}
    }

    #[test]
    fn fifo_order_is_preserved() {
        let _guard = QUEUE_LOCK.lock().unwrap();
        drain_all();
        assert!(push_event(Event::MqDutyTick));
        assert!(push_event(Event::MqWindowStart));
        assert!(push_event(Event::PmUartData));

        assert_eq!(pop_event(), Some(Event::MqDutyTick));
        assert_eq!(pop_event(), Some(Event::MqWindowStart));
        assert_eq!(pop_event(), Some(Event::PmUartData));
        assert_eq!(pop_event(), None);
    }

    #[test]
    fn discriminant_roundtrip() {
        for ev in [
            Event::MqDutyTick,
            Event::MqWindowStart,
            Event::MqSampleTick,
            Event::PmUartData,
            Event::DisplayRefresh,
        ] {
            assert_eq!(event_from_u8(ev as u8), Some(ev));
        }
        assert_eq!(event_from_u8(0xFF), None);
    }

    #[test]
    fn full_queue_drops_events() {
        let _guard = QUEUE_LOCK.lock().unwrap();
        drain_all();
        // One slot is sacrificed to distinguish full from empty.
        for _ in 0..EVENT_QUEUE_CAP - 1 {
            assert!(push_event(Event::MqDutyTick));
        }
        assert!(!push_event(Event::MqSampleTick));
        drain_all();
        assert!(queue_is_empty());
    }
}
