// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed signal/slot dispatch
//!
//! A [`Signal<T>`] is a broadcast point owned by exactly one [`Object`].
//! Five connection variants are supported: instance methods, multi methods
//! (which receive the sender first), static functions, static multi
//! functions, and signal forwarding. Emission snapshots the connection list,
//! so slots connected during an emission are not invoked in that pass, and a
//! signal whose owner is destroyed mid-emission aborts safely through a
//! process-wide tombstone set.
//!
//! Slots are plain `fn` pointers so disconnection can match them by
//! identity, the receiver is held weakly, and an optional caller-supplied
//! mutex serializes invocation (`*_synchronized` variants).

use crate::object::{Object, ObjectInner};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);

/// A shareable lock for `*_synchronized` connections. The same lock may be
/// passed to unrelated connections to serialize their callbacks.
pub type SharedLock = Arc<Mutex<()>>;

/// Implemented by types that can receive signal callbacks. The embedded
/// [`Object`] carries the receiver's lifetime and blocking flags.
pub trait Receiver: Send + Sync + 'static {
    fn object(&self) -> &Object;
}

/// Signals destroyed while they were being emitted, so the emitting pass
/// can notice and abort. Process-wide, like the destruction it guards.
mod tombstones {
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::OnceLock;

    static SET: OnceLock<Mutex<HashSet<u64>>> = OnceLock::new();

    fn set() -> &'static Mutex<HashSet<u64>> {
        SET.get_or_init(|| Mutex::new(HashSet::new()))
    }

    pub(super) fn poison(id: u64) {
        set().lock().insert(id);
    }

    pub(super) fn take(id: u64) -> bool {
        set().lock().remove(&id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ConnKind {
    Method,
    Multi,
    Static,
    StaticMulti,
    Forward,
}

struct Connection<T> {
    kind: ConnKind,
    /// Receiver object for Method/Multi (and the target's owner for
    /// Forward); checked for liveness and blocking at dispatch time.
    receiver: Option<Weak<ObjectInner>>,
    receiver_id: u64,
    /// Identity used by disconnect: the slot `fn` pointer, or the target
    /// signal id for forwards.
    method_key: usize,
    lock: Option<SharedLock>,
    call: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Clone for Connection<T> {
    fn clone(&self) -> Self {
        Connection {
            kind: self.kind,
            receiver: self.receiver.clone(),
            receiver_id: self.receiver_id,
            method_key: self.method_key,
            lock: self.lock.clone(),
            call: Arc::clone(&self.call),
        }
    }
}

impl<T> Connection<T> {
    fn invoke(&self, arg: &T) {
        if matches!(self.kind, ConnKind::Method | ConnKind::Multi) {
            let Some(receiver) = self.receiver.as_ref().and_then(Weak::upgrade) else {
                return;
            };
            if receiver.is_destroyed() || receiver.signals_blocked() {
                return;
            }
        }
        let _guard = self.lock.as_ref().map(|l| l.lock());
        (self.call)(arg);
    }

    fn matches(
        &self,
        kind: ConnKind,
        receiver_id: u64,
        method_key: usize,
        lock: Option<&SharedLock>,
    ) -> bool {
        self.kind == kind
            && self.receiver_id == receiver_id
            && self.method_key == method_key
            && match (&self.lock, lock) {
                (None, None) => true,
                (Some(own), Some(given)) => Arc::ptr_eq(own, given),
                _ => false,
            }
    }
}

pub(crate) struct SignalInner<T> {
    id: u64,
    owner: Weak<ObjectInner>,
    owner_id: u64,
    is_destroyed_signal: bool,
    connections: Mutex<Vec<Connection<T>>>,
    emitting: AtomicUsize,
}

/// Type-erased view of a signal, held by its owning object for
/// auto-disconnect and destruction bookkeeping.
pub(crate) trait SignalEdge: Send + Sync {
    fn owner_id(&self) -> u64;

    /// Remove every connection whose receiver is `receiver_id`.
    fn disconnect_object(&self, receiver_id: u64);

    /// Drop all connections without notifying receivers (disconnectSender).
    fn clear_connections(&self);

    /// The owning object was destroyed: poison an in-flight emission and
    /// drop all connections.
    fn owner_destroyed(&self);
}

impl<T: Clone + Send + Sync + 'static> SignalEdge for SignalInner<T> {
    fn owner_id(&self) -> u64 {
        self.owner_id
    }

    fn disconnect_object(&self, receiver_id: u64) {
        let removed: Vec<Connection<T>> = {
            let mut conns = self.connections.lock();
            let mut removed = Vec::new();
            conns.retain(|c| {
                if c.receiver_id == receiver_id && receiver_id != 0 {
                    removed.push(c.clone());
                    false
                } else {
                    true
                }
            });
            removed
        };
        for conn in removed {
            self.notify_disconnection(&conn);
        }
    }

    fn clear_connections(&self) {
        self.connections.lock().clear();
    }

    fn owner_destroyed(&self) {
        if self.emitting.load(Ordering::SeqCst) > 0 {
            tombstones::poison(self.id);
        }
        self.connections.lock().clear();
    }
}

impl<T: Clone + Send + Sync + 'static> SignalInner<T> {
    fn notify_connection(&self, receiver: &Arc<ObjectInner>) {
        if self.is_destroyed_signal {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            receiver.add_peer(Arc::downgrade(&owner));
        }
    }

    fn notify_disconnection(&self, conn: &Connection<T>) {
        if self.is_destroyed_signal {
            return;
        }
        if let Some(receiver) = conn.receiver.as_ref().and_then(Weak::upgrade) {
            receiver.remove_peer(self.owner_id);
        }
    }
}

/// A typed broadcast point owned by exactly one [`Object`].
///
/// Cloning yields another handle to the same signal; this is how signals
/// travel into dispatcher threads and file jobs.
pub struct Signal<T = ()> {
    pub(crate) inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a signal owned by `owner`.
    pub fn new(owner: &Object) -> Signal<T> {
        Signal::create(owner, false)
    }

    fn create(owner: &Object, is_destroyed_signal: bool) -> Signal<T> {
        let inner = Arc::new(SignalInner {
            id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
            owner: Arc::downgrade(&owner.inner),
            owner_id: owner.inner.id(),
            is_destroyed_signal,
            connections: Mutex::new(Vec::new()),
            emitting: AtomicUsize::new(0),
        });
        let edge_concrete: Weak<SignalInner<T>> = Arc::downgrade(&inner);
        let edge: Weak<dyn SignalEdge> = edge_concrete;
        owner.inner.register_signal(edge);
        Signal { inner }
    }

    /// Connect `method` on `receiver`. The receiver is held weakly; when it
    /// or its object is destroyed the connection goes quiet and is severed.
    pub fn connect<R: Receiver>(&self, receiver: &Arc<R>, method: fn(&R, &T)) {
        self.connect_with_lock(receiver, method, None);
    }

    /// Like [`connect`](Signal::connect), but the callback runs under the
    /// caller-supplied lock.
    pub fn connect_synchronized<R: Receiver>(
        &self,
        receiver: &Arc<R>,
        method: fn(&R, &T),
        lock: &SharedLock,
    ) {
        self.connect_with_lock(receiver, method, Some(Arc::clone(lock)));
    }

    fn connect_with_lock<R: Receiver>(
        &self,
        receiver: &Arc<R>,
        method: fn(&R, &T),
        lock: Option<SharedLock>,
    ) {
        let robj = receiver.object().clone();
        self.inner.notify_connection(&robj.inner);
        let weak = Arc::downgrade(receiver);
        let call = move |arg: &T| {
            if let Some(r) = weak.upgrade() {
                method(&r, arg);
            }
        };
        self.push(Connection {
            kind: ConnKind::Method,
            receiver: Some(Arc::downgrade(&robj.inner)),
            receiver_id: robj.id(),
            method_key: method as usize,
            lock,
            call: Arc::new(call),
        });
    }

    /// Connect a multi method: it receives the sender object first.
    /// The sender is captured at connection time.
    pub fn connect_multi<R: Receiver>(&self, receiver: &Arc<R>, method: fn(&R, &Object, &T)) {
        self.connect_multi_with_lock(receiver, method, None);
    }

    pub fn connect_multi_synchronized<R: Receiver>(
        &self,
        receiver: &Arc<R>,
        method: fn(&R, &Object, &T),
        lock: &SharedLock,
    ) {
        self.connect_multi_with_lock(receiver, method, Some(Arc::clone(lock)));
    }

    fn connect_multi_with_lock<R: Receiver>(
        &self,
        receiver: &Arc<R>,
        method: fn(&R, &Object, &T),
        lock: Option<SharedLock>,
    ) {
        let Some(owner) = self.inner.owner.upgrade() else {
            tracing::warn!("connection failed: signal owner is gone");
            return;
        };
        let sender = Object::from_inner(owner);
        let robj = receiver.object().clone();
        self.inner.notify_connection(&robj.inner);
        let weak = Arc::downgrade(receiver);
        let call = move |arg: &T| {
            if let Some(r) = weak.upgrade() {
                method(&r, &sender, arg);
            }
        };
        self.push(Connection {
            kind: ConnKind::Multi,
            receiver: Some(Arc::downgrade(&robj.inner)),
            receiver_id: robj.id(),
            method_key: method as usize,
            lock,
            call: Arc::new(call),
        });
    }

    /// Connect a free function. Static slots are not auto-disconnected.
    pub fn connect_static(&self, function: fn(&T)) {
        self.connect_static_with_lock(function, None);
    }

    pub fn connect_static_synchronized(&self, function: fn(&T), lock: &SharedLock) {
        self.connect_static_with_lock(function, Some(Arc::clone(lock)));
    }

    fn connect_static_with_lock(&self, function: fn(&T), lock: Option<SharedLock>) {
        let call = move |arg: &T| function(arg);
        self.push(Connection {
            kind: ConnKind::Static,
            receiver: None,
            receiver_id: 0,
            method_key: function as usize,
            lock,
            call: Arc::new(call),
        });
    }

    /// Connect a free multi function; it receives the sender object first.
    pub fn connect_static_multi(&self, function: fn(&Object, &T)) {
        self.connect_static_multi_with_lock(function, None);
    }

    pub fn connect_static_multi_synchronized(
        &self,
        function: fn(&Object, &T),
        lock: &SharedLock,
    ) {
        self.connect_static_multi_with_lock(function, Some(Arc::clone(lock)));
    }

    fn connect_static_multi_with_lock(
        &self,
        function: fn(&Object, &T),
        lock: Option<SharedLock>,
    ) {
        let Some(owner) = self.inner.owner.upgrade() else {
            tracing::warn!("connection failed: signal owner is gone");
            return;
        };
        let sender = Object::from_inner(owner);
        let call = move |arg: &T| function(&sender, arg);
        self.push(Connection {
            kind: ConnKind::StaticMulti,
            receiver: None,
            receiver_id: 0,
            method_key: function as usize,
            lock,
            call: Arc::new(call),
        });
    }

    /// Forward this signal to `target`: emitting `self` emits `target` with
    /// the same argument.
    pub fn forward(&self, target: &Signal<T>) {
        let target_owner = target.inner.owner.upgrade();
        let (receiver, receiver_id) = match &target_owner {
            Some(owner) => {
                self.inner.notify_connection(owner);
                (Some(Arc::downgrade(owner)), owner.id())
            }
            None => (None, 0),
        };
        let target_weak = Arc::downgrade(&target.inner);
        let call = move |arg: &T| {
            if let Some(inner) = target_weak.upgrade() {
                Signal { inner }.emit(arg.clone());
            }
        };
        self.push(Connection {
            kind: ConnKind::Forward,
            receiver,
            receiver_id,
            method_key: target.inner.id as usize,
            lock: None,
            call: Arc::new(call),
        });
    }

    /// Internal slots used by the runtime itself (closures are not
    /// disconnectable by identity).
    pub(crate) fn connect_closure(&self, call: impl Fn(&T) + Send + Sync + 'static) {
        self.push(Connection {
            kind: ConnKind::Static,
            receiver: None,
            receiver_id: 0,
            method_key: 0,
            lock: None,
            call: Arc::new(call),
        });
    }

    fn push(&self, conn: Connection<T>) {
        self.inner.connections.lock().push(conn);
    }

    /// Remove the first connection of `method` on `receiver`. Connecting the
    /// same pair twice requires two disconnects.
    pub fn disconnect<R: Receiver>(&self, receiver: &Arc<R>, method: fn(&R, &T)) {
        self.disconnect_first(ConnKind::Method, receiver.object().id(), method as usize, None);
    }

    pub fn disconnect_synchronized<R: Receiver>(
        &self,
        receiver: &Arc<R>,
        method: fn(&R, &T),
        lock: &SharedLock,
    ) {
        self.disconnect_first(
            ConnKind::Method,
            receiver.object().id(),
            method as usize,
            Some(lock),
        );
    }

    pub fn disconnect_multi<R: Receiver>(&self, receiver: &Arc<R>, method: fn(&R, &Object, &T)) {
        self.disconnect_first(ConnKind::Multi, receiver.object().id(), method as usize, None);
    }

    pub fn disconnect_multi_synchronized<R: Receiver>(
        &self,
        receiver: &Arc<R>,
        method: fn(&R, &Object, &T),
        lock: &SharedLock,
    ) {
        self.disconnect_first(
            ConnKind::Multi,
            receiver.object().id(),
            method as usize,
            Some(lock),
        );
    }

    pub fn disconnect_static(&self, function: fn(&T)) {
        self.disconnect_first(ConnKind::Static, 0, function as usize, None);
    }

    pub fn disconnect_static_multi(&self, function: fn(&Object, &T)) {
        self.disconnect_first(ConnKind::StaticMulti, 0, function as usize, None);
    }

    /// Remove the first forward of this signal to `target`.
    pub fn disconnect_forward(&self, target: &Signal<T>) {
        self.disconnect_first(
            ConnKind::Forward,
            target.inner.owner_id,
            target.inner.id as usize,
            None,
        );
    }

    /// Remove every connection whose receiver is `receiver`.
    pub fn disconnect_object(&self, receiver: &Object) {
        SignalEdge::disconnect_object(&*self.inner, receiver.id());
    }

    fn disconnect_first(
        &self,
        kind: ConnKind,
        receiver_id: u64,
        method_key: usize,
        lock: Option<&SharedLock>,
    ) {
        let removed = {
            let mut conns = self.inner.connections.lock();
            match conns.iter().position(|c| c.matches(kind, receiver_id, method_key, lock)) {
                Some(pos) => Some(conns.remove(pos)),
                None => None,
            }
        };
        match removed {
            Some(conn) => self.inner.notify_disconnection(&conn),
            None => tracing::debug!("no slot disconnected; no previous connection found"),
        }
    }

    /// Emit the signal. Callbacks run on the calling thread, in connection
    /// order, against a snapshot of the connection list.
    pub fn emit(&self, arg: T) {
        if let Some(owner) = self.inner.owner.upgrade() {
            if !self.inner.is_destroyed_signal && (owner.emit_blocked() || owner.is_destroyed()) {
                return;
            }
        }
        self.inner.emitting.fetch_add(1, Ordering::SeqCst);
        let snapshot: Vec<Connection<T>> = self.inner.connections.lock().clone();
        for conn in &snapshot {
            conn.invoke(&arg);
            if tombstones::take(self.inner.id) {
                // owner destroyed inside the callback; abort this pass
                self.inner.emitting.fetch_sub(1, Ordering::SeqCst);
                return;
            }
        }
        self.inner.emitting.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of live connections (diagnostics and tests).
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().len()
    }
}

impl Signal<()> {
    pub(crate) fn new_destroyed(owner: &Object) -> Signal<()> {
        Signal::create(owner, true)
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
