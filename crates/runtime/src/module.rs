// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension module registry
//!
//! A module bundles one or more extensions behind a factory. The registry
//! enumerates module extension info, instantiates the first extension that
//! satisfies a caller-supplied predicate, and refcounts modules so the main
//! loop can unload registrations that no longer back any live extension.

use crate::application::AppInner;
use parking_lot::Mutex;
use relay_core::ProtocolHandler;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Component owner string for extensions shipped with the runtime itself.
pub const COMPONENT_OWNER: &str = "relay";

/// Well-known extension types. User-defined types carry their own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionType {
    ProtocolHandler,
    UserDefined(u32),
}

/// Extra, type-specific information attached to an extension record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdditionalInfo {
    None,
    /// For `ExtensionType::ProtocolHandler`: the URI schemes the handler
    /// accepts. The empty string matches bare paths; "file" matches file
    /// URIs.
    ProtocolHandler { handles_protocols: Vec<String> },
}

/// One extension advertised by a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    pub entry_point: String,
    pub extension_type: ExtensionType,
    pub additional_info: AdditionalInfo,
    pub component_owner: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: String,
}

/// Implemented by modules: enumerate extensions and construct them by entry
/// point.
pub trait ModuleFactory: Send + Sync {
    fn extension_info_list(&self) -> Vec<ExtensionInfo>;

    /// Construct the protocol handler registered under `entry_point`, if
    /// this module has one.
    fn create_protocol_handler(&self, entry_point: &str) -> Option<Box<dyn ProtocolHandler>>;
}

/// A registered module plus its live-extension refcount.
pub(crate) struct ModuleHandle {
    path: String,
    factory: Box<dyn ModuleFactory>,
    refs: AtomicUsize,
}

impl ModuleHandle {
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn refs(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }
}

/// A protocol handler together with the module that created it. Dropping
/// the last handler of a module queues the module for unload.
pub struct LoadedHandler {
    handler: Option<Box<dyn ProtocolHandler>>,
    module: Arc<ModuleHandle>,
    app: Weak<AppInner>,
}

impl Deref for LoadedHandler {
    type Target = dyn ProtocolHandler;

    fn deref(&self) -> &Self::Target {
        match &self.handler {
            Some(handler) => handler.as_ref(),
            None => unreachable!("handler is present until drop"),
        }
    }
}

impl DerefMut for LoadedHandler {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.handler {
            Some(handler) => handler.as_mut(),
            None => unreachable!("handler is present until drop"),
        }
    }
}

impl Drop for LoadedHandler {
    fn drop(&mut self) {
        drop(self.handler.take());
        if self.module.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Some(app) = self.app.upgrade() {
                app.marked_for_unload.lock().push(Arc::clone(&self.module));
            }
        }
    }
}

/// Per-application registry of extension modules.
pub struct ModuleRegistry {
    modules: Mutex<Vec<Arc<ModuleHandle>>>,
}

impl ModuleRegistry {
    pub(crate) fn new() -> ModuleRegistry {
        ModuleRegistry { modules: Mutex::new(Vec::new()) }
    }

    /// Register a module under `path`. Modules are searched in registration
    /// order.
    pub fn register(&self, path: impl Into<String>, factory: Box<dyn ModuleFactory>) {
        let handle = Arc::new(ModuleHandle {
            path: path.into(),
            factory,
            refs: AtomicUsize::new(0),
        });
        self.modules.lock().push(handle);
    }

    pub fn module_count(&self) -> usize {
        self.modules.lock().len()
    }

    /// All extension info records across registered modules, in search
    /// order.
    pub fn extension_infos(&self) -> Vec<ExtensionInfo> {
        let modules: Vec<Arc<ModuleHandle>> = self.modules.lock().clone();
        modules.iter().flat_map(|m| m.factory.extension_info_list()).collect()
    }

    /// Instantiate the first protocol handler whose extension info satisfies
    /// `decider`.
    pub(crate) fn find_first_handler(
        &self,
        app: Weak<AppInner>,
        decider: &dyn Fn(&ExtensionInfo) -> bool,
    ) -> Option<LoadedHandler> {
        let modules: Vec<Arc<ModuleHandle>> = self.modules.lock().clone();
        for module in modules {
            for info in module.factory.extension_info_list() {
                if !decider(&info) {
                    continue;
                }
                if let Some(handler) = module.factory.create_protocol_handler(&info.entry_point)
                {
                    module.refs.fetch_add(1, Ordering::SeqCst);
                    return Some(LoadedHandler { handler: Some(handler), module, app });
                }
                tracing::warn!(
                    entry_point = %info.entry_point,
                    module = module.path(),
                    "module advertised an extension it could not construct"
                );
            }
        }
        None
    }

    /// Drop a registration whose refcount reached zero.
    pub(crate) fn unload(&self, module: &Arc<ModuleHandle>) {
        let mut modules = self.modules.lock();
        if let Some(pos) = modules.iter().position(|m| Arc::ptr_eq(m, module)) {
            let unloaded = modules.remove(pos);
            tracing::debug!(module = unloaded.path(), "unloaded module");
        }
    }
}

/// The predicate the file pipeline uses to pick a protocol handler for a
/// scheme.
pub(crate) fn protocol_handler_decider(scheme: String) -> impl Fn(&ExtensionInfo) -> bool {
    move |info| {
        if info.component_owner != COMPONENT_OWNER
            || info.extension_type != ExtensionType::ProtocolHandler
        {
            return false;
        }
        match &info.additional_info {
            AdditionalInfo::ProtocolHandler { handles_protocols } => {
                handles_protocols.iter().any(|p| p == &scheme)
            }
            AdditionalInfo::None => false,
        }
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;
