// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous file requests
//!
//! A [`File`] names a local or remote resource by URI and exposes its
//! operations as unstarted worker [`Thread`]s. Each job acquires a protocol
//! handler from the application cache, drives it, fans results back through
//! the file's typed signals, and returns the handler to the cache. Signals
//! fire on the worker thread.

use crate::application::AppInner;
use crate::object::Object;
use crate::signal::{Receiver, Signal};
use crate::thread::{Thread, ThreadMode};
use relay_core::{ByteStream, ErrorCode, OpenMode, Permissions, ProtocolHandler, StatResult, Uri};
use std::sync::Weak;

/// Retrieve the whole resource.
pub const NO_MAX_BYTES: u64 = 0;

const BUFFER_SIZE: usize = 32 * 1024;

/// A file (or directory) reachable through some protocol handler.
///
/// Results arrive through the signals: at most one `stat_result` per stat
/// job, `data_read` chunks in read order, at most one `dir_read` per
/// directory get, and `error` for failed get/mkdir jobs. A request whose
/// scheme no extension handles emits nothing and logs a warning.
pub struct File {
    object: Object,
    uri: Uri,
    /// The stat result.
    pub stat_result: Signal<StatResult>,
    /// A chunk of data is ready.
    pub data_read: Signal<ByteStream>,
    /// The contents of a directory.
    pub dir_read: Signal<Vec<Uri>>,
    /// The request could not finish correctly.
    pub error: Signal<ErrorCode>,
}

impl Receiver for File {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl File {
    pub fn new(uri: Uri, parent: &Object) -> File {
        let object = Object::new(parent);
        object.set_delete_children_recursively(false);
        let stat_result = Signal::new(&object);
        let data_read = Signal::new(&object);
        let dir_read = Signal::new(&object);
        let error = Signal::new(&object);
        File { object, uri, stat_result, data_read, dir_read, error }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// A worker that stats the resource and emits `stat_result` once.
    /// Errors are reported inside the stat result, never through `error`.
    pub fn stat(&self, mode: ThreadMode) -> Thread {
        self.job(mode, Operation::Stat)
    }

    /// A worker that retrieves the resource: `dir_read` once for a
    /// directory, otherwise `data_read` per chunk until end of file or until
    /// the first chunk that crosses `max_bytes` (0 means unbounded).
    pub fn get(&self, max_bytes: u64, mode: ThreadMode) -> Thread {
        self.job(mode, Operation::Get { max_bytes })
    }

    /// A worker that creates the directory named by this file's URI.
    pub fn mkdir(&self, permissions: Permissions, mode: ThreadMode) -> Thread {
        self.job(mode, Operation::Mkdir { permissions })
    }

    fn job(&self, mode: ThreadMode, operation: Operation) -> Thread {
        let job = Job {
            uri: self.uri.clone(),
            app: self.object.app_inner(),
            operation,
            stat_result: self.stat_result.clone(),
            data_read: self.data_read.clone(),
            dir_read: self.dir_read.clone(),
            error: self.error.clone(),
        };
        Thread::new(mode, move || job.run())
    }
}

enum Operation {
    Stat,
    Get { max_bytes: u64 },
    Mkdir { permissions: Permissions },
}

struct Job {
    uri: Uri,
    app: Weak<AppInner>,
    operation: Operation,
    stat_result: Signal<StatResult>,
    data_read: Signal<ByteStream>,
    dir_read: Signal<Vec<Uri>>,
    error: Signal<ErrorCode>,
}

impl Job {
    fn run(self) {
        let Some(app) = self.app.upgrade() else {
            tracing::warn!("file job outlived its application");
            return;
        };
        let decider = crate::module::protocol_handler_decider(self.uri.scheme().to_string());
        let Some(mut active) = app.acquire_handler(&self.uri, &decider) else {
            tracing::warn!(
                scheme = self.uri.scheme(),
                "no installed extension is capable of handling this protocol"
            );
            return;
        };
        match self.operation {
            Operation::Stat => {
                let result = active.handler.stat(&self.uri);
                self.stat_result.emit(result);
            }
            Operation::Get { max_bytes } => {
                self.get(&mut *active.handler, max_bytes);
            }
            Operation::Mkdir { permissions } => {
                if let Err(code) = active.handler.mkdir(&self.uri, permissions) {
                    self.error.emit(code);
                }
            }
        }
        app.release_handler(active);
    }

    fn get(&self, handler: &mut dyn ProtocolHandler, max_bytes: u64) {
        let stat = handler.stat(&self.uri);
        if stat.error_code.is_error() {
            self.error.emit(stat.error_code);
            return;
        }
        if stat.kind.is_dir() {
            match handler.list_dir(&self.uri) {
                Ok(entries) => self.dir_read.emit(entries),
                Err(code) => self.error.emit(code),
            }
            return;
        }
        if handler.open(&self.uri, OpenMode::Read).is_err() {
            // mid-stream failures end the transfer without an error signal
            return;
        }
        let mut bytes_read: u64 = 0;
        loop {
            let chunk = match handler.read(BUFFER_SIZE) {
                Ok(chunk) => chunk,
                Err(_) => break,
            };
            if chunk.is_empty() {
                break;
            }
            bytes_read += chunk.len() as u64;
            self.data_read.emit(chunk);
            if max_bytes != NO_MAX_BYTES && bytes_read >= max_bytes {
                break;
            }
        }
        handler.close();
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
