// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::wait_until;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn joinable_thread_runs_to_completion() {
    let ran = Arc::new(AtomicUsize::new(0));
    let ran_job = Arc::clone(&ran);
    let worker = Thread::new(ThreadMode::Joinable, move || {
        ran_job.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(worker.mode(), ThreadMode::Joinable);
    worker.exec();
    worker.join();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn detached_thread_runs_on_its_own() {
    let ran = Arc::new(AtomicUsize::new(0));
    let ran_job = Arc::clone(&ran);
    let worker = Thread::new(ThreadMode::Detached, move || {
        ran_job.fetch_add(1, Ordering::SeqCst);
    });
    worker.exec();
    assert!(wait_until(Duration::from_secs(2), || ran.load(Ordering::SeqCst) == 1));
}

#[test]
fn exec_twice_runs_once() {
    let ran = Arc::new(AtomicUsize::new(0));
    let ran_job = Arc::clone(&ran);
    let worker = Thread::new(ThreadMode::Joinable, move || {
        ran_job.fetch_add(1, Ordering::SeqCst);
    });
    worker.exec();
    worker.exec();
    worker.join();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn join_is_safe_to_misuse() {
    let worker = Thread::new(ThreadMode::Joinable, || {});
    // join before exec is a logged no-op
    worker.join();
    worker.exec();
    worker.join();
    // second join is a logged no-op
    worker.join();

    let detached = Thread::new(ThreadMode::Detached, || {});
    detached.exec();
    detached.join();
}
