// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-owned object tree
//!
//! Every runtime object is a node in a forest whose roots are Applications.
//! Parents own their children; destroying an object emits its `destroyed`
//! signal, severs every connection it takes part in, and (by default)
//! destroys its children. Destruction is a protocol, not deallocation:
//! handles may outlive it, and a destroyed object is observable through its
//! tombstone flag at callback time.

use crate::application::AppInner;
use crate::signal::{Signal, SignalEdge};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ObjectInner {
    id: u64,
    app: Weak<AppInner>,
    parent: Mutex<Weak<ObjectInner>>,
    children: Mutex<Vec<Object>>,
    delete_children: AtomicBool,
    signals_blocked: AtomicBool,
    emit_blocked: AtomicBool,
    destroyed: AtomicBool,
    signals: Mutex<Vec<Weak<dyn SignalEdge>>>,
    /// Objects whose signals this object is connected to, one entry per
    /// connection. Used for auto-disconnect on destruction.
    peers: Mutex<Vec<Weak<ObjectInner>>>,
    destroyed_signal: OnceLock<Signal<()>>,
}

impl ObjectInner {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn app(&self) -> Weak<AppInner> {
        self.app.clone()
    }

    pub(crate) fn signals_blocked(&self) -> bool {
        self.signals_blocked.load(Ordering::SeqCst)
    }

    pub(crate) fn emit_blocked(&self) -> bool {
        self.emit_blocked.load(Ordering::SeqCst)
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn register_signal(&self, edge: Weak<dyn SignalEdge>) {
        self.signals.lock().push(edge);
    }

    /// Record that this object got connected to a signal owned by `sender`.
    pub(crate) fn add_peer(&self, sender: Weak<ObjectInner>) {
        self.peers.lock().push(sender);
    }

    /// Drop one recorded connection to a signal owned by `sender_id`.
    pub(crate) fn remove_peer(&self, sender_id: u64) {
        let mut peers = self.peers.lock();
        if let Some(pos) = peers
            .iter()
            .position(|w| w.upgrade().is_some_and(|p| p.id == sender_id))
        {
            peers.remove(pos);
        }
    }

    pub(crate) fn live_signals(&self) -> Vec<Arc<dyn SignalEdge>> {
        let mut signals = self.signals.lock();
        signals.retain(|w| w.strong_count() > 0);
        signals.iter().filter_map(Weak::upgrade).collect()
    }

    fn add_child(&self, child: Object) {
        self.children.lock().push(child);
    }

    fn remove_child(&self, id: u64) {
        let mut children = self.children.lock();
        if let Some(pos) = children.iter().position(|c| c.inner.id == id) {
            children.remove(pos);
        }
    }

    /// Sever every connection where this object is the receiver: walk the
    /// recorded peers and ask each of their signals (except those this
    /// object owns itself) to drop us.
    fn clean_connections(&self) {
        let peers: Vec<Weak<ObjectInner>> = {
            let mut list = self.peers.lock();
            std::mem::take(&mut *list)
        };
        for weak in peers {
            let Some(peer) = weak.upgrade() else { continue };
            for edge in peer.live_signals() {
                if edge.owner_id() != self.id {
                    edge.disconnect_object(self.id);
                }
            }
        }
    }
}

/// A cloneable handle to a node in the object tree.
///
/// `Object` is the building block of the runtime: it anchors signals, takes
/// part in connections as a receiver, and is destroyed either explicitly
/// (`delete_now`), deferred (`delete_later`, drained by the main loop), or
/// by cascade when its parent is destroyed.
#[derive(Clone)]
pub struct Object {
    pub(crate) inner: Arc<ObjectInner>,
}

impl Object {
    /// Create an object under `parent`. The object joins the parent's
    /// application and is owned by the parent until destroyed or reparented.
    pub fn new(parent: &Object) -> Object {
        let object = Object::build(parent.inner.app.clone(), Arc::downgrade(&parent.inner));
        parent.inner.add_child(object.clone());
        object
    }

    /// The root object of an application tree.
    pub(crate) fn root(app: &Arc<AppInner>) -> Object {
        Object::build(Arc::downgrade(app), Weak::new())
    }

    fn build(app: Weak<AppInner>, parent: Weak<ObjectInner>) -> Object {
        let inner = Arc::new(ObjectInner {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            app,
            parent: Mutex::new(parent),
            children: Mutex::new(Vec::new()),
            delete_children: AtomicBool::new(true),
            signals_blocked: AtomicBool::new(false),
            emit_blocked: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            signals: Mutex::new(Vec::new()),
            peers: Mutex::new(Vec::new()),
            destroyed_signal: OnceLock::new(),
        });
        let object = Object { inner };
        let destroyed = Signal::new_destroyed(&object);
        let _ = object.inner.destroyed_signal.set(destroyed);
        object
    }

    pub(crate) fn from_inner(inner: Arc<ObjectInner>) -> Object {
        Object { inner }
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn app_inner(&self) -> Weak<AppInner> {
        self.inner.app()
    }

    /// The implicit `destroyed` signal. It fires exactly once, first thing
    /// during destruction, and is exempt from `set_emit_blocked`.
    pub fn destroyed(&self) -> &Signal<()> {
        match self.inner.destroyed_signal.get() {
            Some(signal) => signal,
            None => unreachable!("destroyed signal is created with the object"),
        }
    }

    pub fn parent(&self) -> Option<Object> {
        self.inner.parent.lock().upgrade().map(Object::from_inner)
    }

    /// A snapshot of the current children.
    pub fn children(&self) -> Vec<Object> {
        self.inner.children.lock().clone()
    }

    /// Move this object under `parent`. Fails (with a warning) when the new
    /// parent belongs to a different application.
    pub fn reparent(&self, parent: &Object) {
        if let Some(current) = self.parent() {
            if Arc::ptr_eq(&current.inner, &parent.inner) {
                return;
            }
        }
        if !Weak::ptr_eq(&self.inner.app, &parent.inner.app) {
            tracing::warn!(
                "could not reparent: new parent belongs to a different application"
            );
            return;
        }
        if let Some(current) = self.parent() {
            current.inner.remove_child(self.inner.id);
        }
        *self.inner.parent.lock() = Arc::downgrade(&parent.inner);
        parent.inner.add_child(self.clone());
    }

    /// Whether children are destroyed together with this object. On by
    /// default.
    pub fn set_delete_children_recursively(&self, delete: bool) {
        self.inner.delete_children.store(delete, Ordering::SeqCst);
    }

    pub fn delete_children_recursively(&self) -> bool {
        self.inner.delete_children.load(Ordering::SeqCst)
    }

    /// Block this object from receiving signal callbacks.
    pub fn set_signals_blocked(&self, blocked: bool) {
        self.inner.signals_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn signals_blocked(&self) -> bool {
        self.inner.signals_blocked()
    }

    /// Block this object's signals from emitting. The `destroyed` signal is
    /// exempt.
    pub fn set_emit_blocked(&self, blocked: bool) {
        self.inner.emit_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn emit_blocked(&self) -> bool {
        self.inner.emit_blocked()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Destroy this object now: emit `destroyed`, sever all connections,
    /// detach from the parent, then destroy children if the recursive flag
    /// is set. Idempotent.
    pub fn delete_now(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.destroyed().emit(());
        self.inner.clean_connections();
        for edge in self.inner.live_signals() {
            edge.owner_destroyed();
        }
        if let Some(parent) = self.parent() {
            parent.inner.remove_child(self.inner.id);
        }
        *self.inner.parent.lock() = Weak::new();
        if self.inner.delete_children.load(Ordering::SeqCst) {
            let children: Vec<Object> = {
                let mut list = self.inner.children.lock();
                std::mem::take(&mut *list)
            };
            for child in children {
                child.delete_now();
            }
        }
    }

    /// Queue this object for destruction on the next main-loop pass.
    /// Queueing twice is a no-op.
    pub fn delete_later(&self) {
        let Some(app) = self.inner.app.upgrade() else {
            tracing::warn!("delete_later on an object without an application");
            return;
        };
        let mut marked = app.marked_for_deletion.lock();
        if marked.iter().any(|o| o.inner.id == self.inner.id) {
            return;
        }
        marked.push(self.clone());
    }

    /// Clear every outgoing connection of `sender`'s signals.
    pub fn disconnect_sender(sender: &Object) {
        for edge in sender.inner.live_signals() {
            edge.clear_connections();
        }
    }

    /// Disconnect `receiver` from every signal it is connected to.
    pub fn disconnect_receiver(receiver: &Object) {
        let peers: Vec<Weak<ObjectInner>> = receiver.inner.peers.lock().clone();
        for weak in peers {
            let Some(peer) = weak.upgrade() else { continue };
            for edge in peer.live_signals() {
                edge.disconnect_object(receiver.inner.id);
            }
        }
    }

    /// `disconnect_sender` and `disconnect_receiver` in one call.
    pub fn fully_disconnect(object: &Object) {
        Object::disconnect_sender(object);
        Object::disconnect_receiver(object);
    }
}

/// Two handles are equal when they refer to the same object. This is what
/// multi slots use to route on the sender.
impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Object {}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.inner.id)
            .field("destroyed", &self.inner.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
