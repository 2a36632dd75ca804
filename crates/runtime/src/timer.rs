// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic-interval timers
//!
//! Timers live under an Application. `start` computes the remaining time and
//! inserts the timer into the application's running list, which the main
//! loop keeps sorted ascending by remaining time; the loop fires expired
//! timers through detached event dispatchers. Timers with equal remaining
//! time fire in insertion order.

use crate::object::Object;
use crate::signal::{Receiver, Signal};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_INTERVAL_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutMode {
    /// Fire once, then stop.
    SingleShot,
    /// Fire every interval until stopped.
    Repeating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
}

/// Timer state shared with the application's running list.
pub(crate) struct TimerShared {
    object: Object,
    timeout: Signal<()>,
    interval: Mutex<i64>,
    remaining: Mutex<i64>,
    mode: Mutex<TimeoutMode>,
    state: Mutex<TimerState>,
}

impl TimerShared {
    pub(crate) fn object(&self) -> &Object {
        &self.object
    }

    pub(crate) fn timeout(&self) -> &Signal<()> {
        &self.timeout
    }

    pub(crate) fn interval(&self) -> i64 {
        *self.interval.lock()
    }

    pub(crate) fn remaining(&self) -> i64 {
        *self.remaining.lock()
    }

    pub(crate) fn set_remaining(&self, ms: i64) {
        *self.remaining.lock() = ms;
    }

    pub(crate) fn sub_remaining(&self, ms: i64) {
        *self.remaining.lock() -= ms;
    }

    pub(crate) fn mode(&self) -> TimeoutMode {
        *self.mode.lock()
    }

    pub(crate) fn set_state(&self, state: TimerState) {
        *self.state.lock() = state;
    }

    pub(crate) fn object_destroyed(&self) -> bool {
        self.object.is_destroyed()
    }
}

/// An interval timer. Emits `timeout` when the interval elapses.
pub struct Timer {
    shared: Arc<TimerShared>,
    /// This timer has finished its interval.
    pub timeout: Signal<()>,
}

impl Timer {
    /// Create a stopped timer with the default interval (1000 ms).
    pub fn new(parent: &Object) -> Timer {
        let object = Object::new(parent);
        let timeout: Signal<()> = Signal::new(&object);
        let shared = Arc::new(TimerShared {
            object,
            timeout: timeout.clone(),
            interval: Mutex::new(DEFAULT_INTERVAL_MS),
            remaining: Mutex::new(0),
            mode: Mutex::new(TimeoutMode::SingleShot),
            state: Mutex::new(TimerState::Stopped),
        });
        Timer { shared, timeout }
    }

    pub fn object(&self) -> &Object {
        &self.shared.object
    }

    pub fn state(&self) -> TimerState {
        *self.shared.state.lock()
    }

    pub fn interval(&self) -> i64 {
        self.shared.interval()
    }

    /// Set the timeout interval in milliseconds. Takes effect at the next
    /// `start`.
    pub fn set_interval(&self, msec: i64) {
        *self.shared.interval.lock() = msec;
    }

    /// Start (or restart) the timer in `mode`.
    pub fn start(&self, mode: TimeoutMode) {
        let Some(app) = self.shared.object.app_inner().upgrade() else {
            tracing::warn!("timer started without an application");
            return;
        };
        *self.shared.mode.lock() = mode;
        self.shared.set_remaining(self.shared.interval());
        self.shared.set_state(TimerState::Running);
        app.start_timer(Arc::clone(&self.shared));
    }

    /// Stop the timer and remove it from the running list.
    pub fn stop(&self) {
        self.shared.set_state(TimerState::Stopped);
        if let Some(app) = self.shared.object.app_inner().upgrade() {
            app.stop_timer(&self.shared);
        }
    }

    /// Suspend the calling thread for `ms` milliseconds.
    pub fn wait(ms: i64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms as u64));
        }
    }

    /// Invoke `method` on `receiver` once, `ms` milliseconds from now. The
    /// backing timer cleans itself up through `delete_later`.
    pub fn call_after<R: Receiver>(ms: i64, receiver: &Arc<R>, method: fn(&R, &())) {
        let timer = Timer::new(receiver.object());
        timer.set_interval(ms);
        timer.timeout.connect(receiver, method);
        let object = timer.object().clone();
        timer.timeout.connect_closure(move |_| object.delete_later());
        timer.start(TimeoutMode::SingleShot);
    }

    /// Invoke `function` once, `ms` milliseconds from now, parented to the
    /// given object.
    pub fn call_static_after(ms: i64, parent: &Object, function: fn(&())) {
        let timer = Timer::new(parent);
        timer.set_interval(ms);
        timer.timeout.connect_static(function);
        let object = timer.object().clone();
        timer.timeout.connect_closure(move |_| object.delete_later());
        timer.start(TimeoutMode::SingleShot);
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
