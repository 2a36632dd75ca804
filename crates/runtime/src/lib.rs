// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-runtime: object graph, signal dispatch, event loop, and the file
//! request pipeline
//!
//! The runtime is built around a parent-owned tree of [`Object`]s. Objects
//! own typed [`Signal`]s; receivers connect slots to them and are severed
//! automatically when either side is destroyed. An [`Application`] drives
//! the single main loop (timers, deferred deletions, module unloading) while
//! worker [`Thread`]s carry file jobs and timer-expiry dispatch.

pub mod application;
mod cache;
pub mod event;
pub mod file;
pub mod local;
pub mod module;
pub mod object;
pub mod options;
pub mod signal;
pub mod thread;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_support;

pub use application::Application;
pub use event::{Event, EventDispatcher, EventKind};
pub use file::{File, NO_MAX_BYTES};
pub use local::LocalHandler;
pub use module::{
    AdditionalInfo, ExtensionInfo, ExtensionType, ModuleFactory, ModuleRegistry,
    COMPONENT_OWNER,
};
pub use object::Object;
pub use options::{AppOption, FailVerbosity, OptionKind, Strictness};
pub use signal::{Receiver, Signal};
pub use thread::{Thread, ThreadMode};
pub use timer::{TimeoutMode, Timer, TimerState};
