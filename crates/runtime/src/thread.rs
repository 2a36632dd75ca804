// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Joinable and detached worker threads
//!
//! A [`Thread`] carries one job. `exec` starts it; a joinable thread must be
//! joined exactly once, a detached thread runs to completion on its own and
//! must not be joined. File jobs and timer-expiry dispatchers are built on
//! this primitive.

use parking_lot::Mutex;
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadMode {
    /// The caller keeps ownership and must call `join` exactly once.
    Joinable,
    /// The worker runs to completion on its own; `join` is an error.
    Detached,
}

/// A one-shot worker thread.
pub struct Thread {
    mode: ThreadMode,
    job: Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Thread {
    pub fn new(mode: ThreadMode, job: impl FnOnce() + Send + 'static) -> Thread {
        Thread {
            mode,
            job: Mutex::new(Some(Box::new(job))),
            handle: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> ThreadMode {
        self.mode
    }

    /// Start the job on a new OS thread. A second call is a no-op.
    pub fn exec(&self) {
        let Some(job) = self.job.lock().take() else {
            tracing::warn!("thread already started");
            return;
        };
        match std::thread::Builder::new().spawn(job) {
            Ok(handle) => {
                if self.mode == ThreadMode::Joinable {
                    *self.handle.lock() = Some(handle);
                }
                // dropping the handle detaches the worker
            }
            Err(err) => tracing::warn!(%err, "failed to spawn worker thread"),
        }
    }

    /// Wait for a joinable thread to finish. Exactly one join per exec.
    pub fn join(&self) {
        if self.mode == ThreadMode::Detached {
            tracing::warn!("join called on a detached thread");
            return;
        }
        let Some(handle) = self.handle.lock().take() else {
            tracing::warn!("join called on a thread that was not started or was already joined");
            return;
        };
        if handle.join().is_err() {
            tracing::warn!("worker thread panicked");
        }
    }
}

#[cfg(test)]
#[path = "thread_tests.rs"]
mod tests;
