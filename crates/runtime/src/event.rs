// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events and the detached dispatcher
//!
//! The main loop never runs user callbacks itself: expired timers are handed
//! to short-lived detached dispatcher threads which emit the corresponding
//! signal and vanish.

use crate::object::Object;
use crate::signal::Signal;
use crate::thread::{Thread, ThreadMode};

/// What happened.
pub enum EventKind {
    /// A timer's interval elapsed; carries the timer's `timeout` signal.
    Timeout(Signal<()>),
}

/// An event bound to the object it concerns.
pub struct Event {
    object: Object,
    kind: EventKind,
}

impl Event {
    pub fn new(object: Object, kind: EventKind) -> Event {
        Event { object, kind }
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }
}

/// Delivers events on detached worker threads.
pub struct EventDispatcher;

impl EventDispatcher {
    /// Spawn a detached thread that delivers `event` and self-destroys.
    pub fn dispatch(event: Event) {
        let worker = Thread::new(ThreadMode::Detached, move || deliver(event));
        worker.exec();
    }
}

fn deliver(event: Event) {
    match event.kind {
        EventKind::Timeout(timeout) => timeout.emit(()),
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
