// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal dispatch through the public API.

use relay_runtime::{Application, Object, Receiver, Signal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn app() -> Application {
    Application::new(vec!["specs".to_string()], "specs")
}

struct Counter {
    object: Object,
    hits: AtomicUsize,
}

impl Counter {
    fn new(parent: &Object) -> Arc<Counter> {
        Arc::new(Counter { object: Object::new(parent), hits: AtomicUsize::new(0) })
    }

    fn on_fire(&self, _arg: &()) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Receiver for Counter {
    fn object(&self) -> &Object {
        &self.object
    }
}

#[test]
fn forwarded_signal_fires_the_final_slot_exactly_once() {
    let app = app();
    let a = Object::new(app.object());
    let b = Object::new(app.object());
    let sig_a: Signal<()> = Signal::new(&a);
    let sig_b: Signal<()> = Signal::new(&b);
    let counter = Counter::new(app.object());

    sig_a.forward(&sig_b);
    sig_b.connect(&counter, Counter::on_fire);
    sig_a.emit(());
    assert_eq!(counter.count(), 1);
}

#[test]
fn destroying_the_receiver_severs_the_connection() {
    let app = app();
    let sender = Object::new(app.object());
    let signal: Signal<()> = Signal::new(&sender);
    let counter = Counter::new(app.object());
    signal.connect(&counter, Counter::on_fire);

    signal.emit(());
    assert_eq!(counter.count(), 1);

    counter.object().delete_now();
    signal.emit(());
    assert_eq!(counter.count(), 1);
}

#[test]
fn emit_blocked_spares_only_destroyed() {
    let app = app();
    let sender = Object::new(app.object());
    let signal: Signal<()> = Signal::new(&sender);
    let regular = Counter::new(app.object());
    let last_rites = Counter::new(app.object());
    signal.connect(&regular, Counter::on_fire);
    sender.destroyed().connect(&last_rites, Counter::on_fire);

    sender.set_emit_blocked(true);
    signal.emit(());
    assert_eq!(regular.count(), 0);

    sender.delete_now();
    assert_eq!(last_rites.count(), 1);
}

#[test]
fn typed_payloads_arrive_intact() {
    struct Sink {
        object: Object,
        total: AtomicUsize,
    }
    impl Receiver for Sink {
        fn object(&self) -> &Object {
            &self.object
        }
    }
    impl Sink {
        fn on_value(&self, value: &usize) {
            self.total.fetch_add(*value, Ordering::SeqCst);
        }
    }

    let app = app();
    let sender = Object::new(app.object());
    let signal: Signal<usize> = Signal::new(&sender);
    let sink = Arc::new(Sink { object: Object::new(app.object()), total: AtomicUsize::new(0) });
    signal.connect(&sink, Sink::on_value);

    signal.emit(40);
    signal.emit(2);
    assert_eq!(sink.total.load(Ordering::SeqCst), 42);
}

#[test]
fn multi_slots_can_route_by_sender() {
    struct Player {
        object: Object,
        play_button: Object,
        stop_button: Object,
        play_clicks: AtomicUsize,
        stop_clicks: AtomicUsize,
    }
    impl Receiver for Player {
        fn object(&self) -> &Object {
            &self.object
        }
    }
    impl Player {
        fn on_click(&self, sender: &Object, _arg: &()) {
            if *sender == self.play_button {
                self.play_clicks.fetch_add(1, Ordering::SeqCst);
            } else if *sender == self.stop_button {
                self.stop_clicks.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let app = app();
    let object = Object::new(app.object());
    let play_button = Object::new(&object);
    let stop_button = Object::new(&object);
    let play_clicked: Signal<()> = Signal::new(&play_button);
    let stop_clicked: Signal<()> = Signal::new(&stop_button);
    let player = Arc::new(Player {
        object,
        play_button,
        stop_button,
        play_clicks: AtomicUsize::new(0),
        stop_clicks: AtomicUsize::new(0),
    });
    play_clicked.connect_multi(&player, Player::on_click);
    stop_clicked.connect_multi(&player, Player::on_click);

    play_clicked.emit(());
    stop_clicked.emit(());
    stop_clicked.emit(());
    assert_eq!(player.play_clicks.load(Ordering::SeqCst), 1);
    assert_eq!(player.stop_clicks.load(Ordering::SeqCst), 2);
}
