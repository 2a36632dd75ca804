// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide coordinator and the main event loop
//!
//! The application owns the root of the object tree and every piece of
//! shared loop state: the running-timer list, the deferred-deletion list,
//! the module-unload list, and the protocol-handler cache. `exec` runs the
//! single main loop; worker threads touch the shared lists only under their
//! locks.
//!
//! There is one application per process by contract. The invariant is not
//! enforced with a process-global so test binaries can host several
//! independent applications.

use crate::event::{Event, EventDispatcher, EventKind};
use crate::local::LocalModule;
use crate::module::{ModuleHandle, ModuleRegistry};
use crate::object::Object;
use crate::options::OptionEntry;
use crate::signal::Signal;
use crate::timer::{TimeoutMode, Timer, TimerShared, TimerState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Environment variable through which the module search path is exported,
/// so child processes inherit it.
pub const MODULES_PATH_ENV: &str = "RELAY_MODULES_PATH";

/// Install prefix of the runtime's own module directory.
const BUILTIN_PREFIX: &str = "/usr/local";

const DEFAULT_SLEEP_TIME_MS: i64 = 500;

pub(crate) struct AppInner {
    pub(crate) self_weak: Weak<AppInner>,
    name: String,
    args: Vec<String>,
    prefix: Mutex<String>,
    modules_path_exported: AtomicBool,
    default_sleep_time: i64,
    /// Milliseconds the loop sleeps per iteration; -1 while idle.
    sleep_time: Mutex<i64>,
    next_timeout: Mutex<i64>,
    pub(crate) marked_for_deletion: Mutex<Vec<Object>>,
    pub(crate) marked_for_unload: Mutex<Vec<Arc<ModuleHandle>>>,
    pub(crate) running_timers: Mutex<Vec<Arc<TimerShared>>>,
    pub(crate) handler_cache: Mutex<Vec<crate::cache::CacheEntry>>,
    pub(crate) registry: ModuleRegistry,
    pub(crate) options: Mutex<Vec<OptionEntry>>,
}

/// The application: root of the object tree and owner of the main loop.
pub struct Application {
    inner: Arc<AppInner>,
    object: Object,
    /// An unknown option was seen while parsing the command line.
    pub invalid_option: Signal<()>,
    /// An option that requires an argument was given without one.
    pub missing_parameter: Signal<()>,
}

impl Application {
    /// Create the application from the process arguments. The builtin
    /// protocol-handler module is registered immediately.
    pub fn new(args: Vec<String>, name: &str) -> Application {
        let resolved_name = if name.is_empty() {
            args.first().cloned().unwrap_or_default()
        } else {
            name.to_string()
        };
        let inner = Arc::new_cyclic(|weak: &Weak<AppInner>| AppInner {
            self_weak: weak.clone(),
            name: resolved_name,
            args,
            prefix: Mutex::new(String::new()),
            modules_path_exported: AtomicBool::new(false),
            default_sleep_time: DEFAULT_SLEEP_TIME_MS,
            sleep_time: Mutex::new(-1),
            next_timeout: Mutex::new(-1),
            marked_for_deletion: Mutex::new(Vec::new()),
            marked_for_unload: Mutex::new(Vec::new()),
            running_timers: Mutex::new(Vec::new()),
            handler_cache: Mutex::new(Vec::new()),
            registry: ModuleRegistry::new(),
            options: Mutex::new(Vec::new()),
        });
        let object = Object::root(&inner);
        let invalid_option = Signal::new(&object);
        let missing_parameter = Signal::new(&object);
        inner
            .registry
            .register("builtin/protocol-handlers", Box::new(LocalModule));
        Application { inner, object, invalid_option, missing_parameter }
    }

    /// The root object; parent for top-level objects.
    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn args(&self) -> &[String] {
        &self.inner.args
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.inner.registry
    }

    /// Application install prefix used for the module search path. Empty by
    /// default.
    pub fn set_prefix(&self, prefix: &str) {
        *self.inner.prefix.lock() = prefix.to_string();
    }

    pub fn prefix(&self) -> String {
        self.inner.prefix.lock().clone()
    }

    /// The colon-separated module search path, exported through
    /// [`MODULES_PATH_ENV`] on first use.
    pub fn module_path(&self) -> String {
        let path = self.inner.module_path();
        if !self.inner.modules_path_exported.swap(true, Ordering::SeqCst) {
            std::env::set_var(MODULES_PATH_ENV, &path);
        }
        path
    }

    /// Run the main loop. Never returns; the process leaves through
    /// [`quit`](Application::quit).
    pub fn exec(&self) -> ! {
        loop {
            self.inner.process_events();
            self.inner.process_delayed_deletions();
            self.inner.check_file_watches();
            self.inner.unload_unneeded_modules();
        }
    }

    /// Terminate the process successfully.
    pub fn quit(&self) -> ! {
        std::process::exit(0)
    }

    pub(crate) fn inner(&self) -> &Arc<AppInner> {
        &self.inner
    }
}

impl AppInner {
    fn module_path(&self) -> String {
        let prefix = self.prefix.lock().clone();
        if prefix.is_empty() {
            format!("{BUILTIN_PREFIX}/lib/relay/modules/")
        } else {
            format!(
                "{prefix}/lib/{name}/modules/:{BUILTIN_PREFIX}/lib/relay/modules/",
                name = self.name
            )
        }
    }

    /// One sleep quantum of the main loop: fire due timers, then sleep
    /// either until the next timer or for the default interval.
    pub(crate) fn process_events(&self) {
        let time_to_sleep;
        if *self.sleep_time.lock() != -1 {
            self.check_timers();
            time_to_sleep = *self.sleep_time.lock();
        } else {
            let timers = self.running_timers.lock();
            if let Some(front) = timers.first() {
                let interval = front.interval();
                *self.sleep_time.lock() = interval;
                time_to_sleep = interval;
            } else {
                time_to_sleep = self.default_sleep_time;
            }
        }
        Timer::wait(time_to_sleep);
    }

    /// Drain and destroy the deferred-deletion list. Destruction happens
    /// outside the lock; destructors may queue further deletions.
    pub(crate) fn process_delayed_deletions(&self) {
        let marked: Vec<Object> = {
            let mut list = self.marked_for_deletion.lock();
            std::mem::take(&mut *list)
        };
        for object in marked {
            object.delete_now();
        }
    }

    /// Hook for platforms with file-watch support. No-op here.
    pub(crate) fn check_file_watches(&self) {}

    /// Drop module registrations whose last extension instance went away.
    pub(crate) fn unload_unneeded_modules(&self) {
        let marked: Vec<Arc<ModuleHandle>> = {
            let mut list = self.marked_for_unload.lock();
            std::mem::take(&mut *list)
        };
        for module in marked {
            if module.refs() == 0 {
                self.registry.unload(&module);
            }
        }
    }

    /// Advance the timer wheel by the time just slept; fire expired timers
    /// through detached dispatchers outside the lock.
    pub(crate) fn check_timers(&self) {
        for timer in self.collect_expired_timers() {
            let event = Event::new(
                timer.object().clone(),
                EventKind::Timeout(timer.timeout().clone()),
            );
            EventDispatcher::dispatch(event);
        }
    }

    /// The locked half of the wheel: account for the elapsed sleep, pop the
    /// batch of timers whose remaining time hit zero (in insertion order),
    /// re-sort, and pick the next sleep time.
    pub(crate) fn collect_expired_timers(&self) -> Vec<Arc<TimerShared>> {
        let mut expired: Vec<Arc<TimerShared>> = Vec::new();
        {
            let mut timers = self.running_timers.lock();
            timers.retain(|t| !t.object_destroyed());
            if timers.is_empty() {
                return expired;
            }
            let sleep_time = *self.sleep_time.lock();
            let head_remaining = timers[0].remaining();
            // The head may have been stopped and replaced while we slept; if
            // the new head still has time left, just account for the sleep.
            let ms_delta = head_remaining - sleep_time;
            if ms_delta > 0 {
                for timer in timers.iter() {
                    timer.sub_remaining(sleep_time);
                }
                *self.sleep_time.lock() = ms_delta.min(self.default_sleep_time);
                return expired;
            }
            let next_timeout = head_remaining;
            *self.next_timeout.lock() = next_timeout;
            let mut index = 0;
            while index < timers.len() {
                let timer = Arc::clone(&timers[index]);
                if timer.remaining() != head_remaining {
                    break;
                }
                if timer.mode() == TimeoutMode::SingleShot {
                    timer.set_state(TimerState::Stopped);
                    timers.remove(index);
                } else {
                    timer.set_remaining(timer.interval());
                    index += 1;
                }
                expired.push(timer);
            }
            for timer in timers.iter().skip(index) {
                timer.sub_remaining(next_timeout);
            }
            if timers.is_empty() {
                *self.sleep_time.lock() = -1;
            } else {
                // stable: timers with equal remaining keep insertion order
                timers.sort_by_key(|t| t.remaining());
                *self.sleep_time.lock() = timers[0].remaining();
            }
        }
        expired
    }

    /// Insert (or re-insert) a timer and keep the list sorted by remaining
    /// time.
    pub(crate) fn start_timer(&self, shared: Arc<TimerShared>) {
        let mut timers = self.running_timers.lock();
        timers.retain(|t| !Arc::ptr_eq(t, &shared));
        timers.push(shared);
        timers.sort_by_key(|t| t.remaining());
    }

    pub(crate) fn stop_timer(&self, shared: &Arc<TimerShared>) {
        let mut timers = self.running_timers.lock();
        timers.retain(|t| !Arc::ptr_eq(t, shared));
    }

    #[cfg(test)]
    pub(crate) fn sleep_time(&self) -> i64 {
        *self.sleep_time.lock()
    }

    #[cfg(test)]
    pub(crate) fn set_sleep_time(&self, ms: i64) {
        *self.sleep_time.lock() = ms;
    }

    #[cfg(test)]
    pub(crate) fn running_timer_count(&self) -> usize {
        self.running_timers.lock().len()
    }
}

#[cfg(test)]
#[path = "application_tests.rs"]
mod tests;
