// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded protocol-handler pool
//!
//! Each application keeps up to ten released handlers. Acquire scans the
//! pool for the first handler that can be reused with the request URI and
//! pulls it out with a weight bump; a miss asks the module registry for a
//! fresh instance. Release appends while there is room, otherwise the
//! least-weight entry is evicted and the released handler is bumped and
//! prepended, which biases the pool toward frequently reused handlers while
//! giving new ones an initial shot at staying.

use crate::application::AppInner;
use crate::module::{ExtensionInfo, LoadedHandler};
use relay_core::Uri;

pub(crate) const CACHE_SIZE: usize = 10;

pub(crate) struct CacheEntry {
    pub(crate) handler: LoadedHandler,
    pub(crate) weight: u32,
}

/// A handler checked out of the cache (or freshly loaded) for one request.
pub(crate) struct ActiveHandler {
    pub(crate) handler: LoadedHandler,
    pub(crate) weight: u32,
}

impl AppInner {
    /// Find a handler for `uri`: first a reusable cached one, otherwise the
    /// first registry extension accepted by `decider`. Returns `None` when
    /// no extension handles the scheme.
    pub(crate) fn acquire_handler(
        &self,
        uri: &Uri,
        decider: &dyn Fn(&ExtensionInfo) -> bool,
    ) -> Option<ActiveHandler> {
        {
            let mut cache = self.handler_cache.lock();
            if let Some(pos) = cache.iter().position(|e| e.handler.can_be_reused_with(uri)) {
                let entry = cache.remove(pos);
                return Some(ActiveHandler {
                    handler: entry.handler,
                    weight: entry.weight + 1,
                });
            }
        }
        self.registry
            .find_first_handler(self.self_weak.clone(), decider)
            .map(|handler| ActiveHandler { handler, weight: 0 })
    }

    /// Return a handler to the pool, evicting the least-weight entry when
    /// the pool is full.
    pub(crate) fn release_handler(&self, active: ActiveHandler) {
        let mut cache = self.handler_cache.lock();
        if cache.len() < CACHE_SIZE {
            cache.push(CacheEntry { handler: active.handler, weight: active.weight });
        } else {
            cache.sort_by_key(|e| e.weight);
            let evicted = cache.remove(0);
            drop(evicted);
            cache.insert(
                0,
                CacheEntry { handler: active.handler, weight: active.weight + 1 },
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.handler_cache.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn cache_weights(&self) -> Vec<u32> {
        self.handler_cache.lock().iter().map(|e| e.weight).collect()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
