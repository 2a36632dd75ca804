// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the runtime test suites

use crate::application::Application;
use crate::module::{
    AdditionalInfo, ExtensionInfo, ExtensionType, ModuleFactory, COMPONENT_OWNER,
};
use crate::object::Object;
use crate::signal::Receiver;
use relay_core::{
    ByteStream, ErrorCode, FileType, OpenMode, Permissions, ProtocolHandler, StatResult, Uri,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) fn test_app() -> Application {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    Application::new(vec!["test-app".to_string()], "test-app")
}

/// A receiver that counts how many times its slot ran.
pub(crate) struct Counter {
    object: Object,
    hits: AtomicUsize,
}

impl Counter {
    pub(crate) fn new(parent: &Object) -> Arc<Counter> {
        Arc::new(Counter { object: Object::new(parent), hits: AtomicUsize::new(0) })
    }

    pub(crate) fn on_fire(&self, _arg: &()) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Receiver for Counter {
    fn object(&self) -> &Object {
        &self.object
    }
}

/// Poll `condition` until it holds or the deadline passes.
pub(crate) fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// In-memory protocol handler for a single scheme; every file reads as
/// `content`.
pub(crate) struct MemHandler {
    scheme: String,
    content: Vec<u8>,
    offset: usize,
    open: bool,
}

impl ProtocolHandler for MemHandler {
    fn open(&mut self, _uri: &Uri, _mode: OpenMode) -> Result<(), ErrorCode> {
        self.open = true;
        self.offset = 0;
        Ok(())
    }

    fn read(&mut self, max_bytes: usize) -> Result<ByteStream, ErrorCode> {
        if !self.open {
            return Err(ErrorCode::Unknown);
        }
        let end = (self.offset + max_bytes).min(self.content.len());
        let chunk = ByteStream::new(&self.content[self.offset..end]);
        self.offset = end;
        Ok(chunk)
    }

    fn write(&mut self, data: &ByteStream) -> Result<u64, ErrorCode> {
        Ok(data.len() as u64)
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn list_dir(&mut self, _uri: &Uri) -> Result<Vec<Uri>, ErrorCode> {
        Ok(Vec::new())
    }

    fn mkdir(&mut self, _uri: &Uri, _permissions: Permissions) -> Result<(), ErrorCode> {
        Ok(())
    }

    fn rm(&mut self, _uri: &Uri) -> Result<(), ErrorCode> {
        Ok(())
    }

    fn stat(&mut self, uri: &Uri) -> StatResult {
        StatResult {
            exists: true,
            kind: FileType::REGULAR,
            size: self.content.len() as u64,
            uri: uri.clone(),
            ..StatResult::default()
        }
    }

    fn can_be_reused_with(&self, uri: &Uri) -> bool {
        uri.scheme() == self.scheme
    }
}

/// A module serving one scheme, counting how many handler instances it
/// created.
pub(crate) struct MemModule {
    scheme: String,
    content: Vec<u8>,
    created: Arc<AtomicUsize>,
}

impl MemModule {
    pub(crate) fn new(scheme: &str, content: &[u8]) -> (MemModule, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let module = MemModule {
            scheme: scheme.to_string(),
            content: content.to_vec(),
            created: Arc::clone(&created),
        };
        (module, created)
    }
}

impl ModuleFactory for MemModule {
    fn extension_info_list(&self) -> Vec<ExtensionInfo> {
        vec![ExtensionInfo {
            entry_point: format!("mem-{}", self.scheme),
            extension_type: ExtensionType::ProtocolHandler,
            additional_info: AdditionalInfo::ProtocolHandler {
                handles_protocols: vec![self.scheme.clone()],
            },
            component_owner: COMPONENT_OWNER.to_string(),
            name: format!("In-memory {} handler", self.scheme),
            description: "Test protocol handler".to_string(),
            author: "relay contributors".to_string(),
            version: "0.0.1".to_string(),
        }]
    }

    fn create_protocol_handler(&self, entry_point: &str) -> Option<Box<dyn ProtocolHandler>> {
        if entry_point != format!("mem-{}", self.scheme) {
            return None;
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MemHandler {
            scheme: self.scheme.clone(),
            content: self.content.clone(),
            offset: 0,
            open: false,
        }))
    }
}
