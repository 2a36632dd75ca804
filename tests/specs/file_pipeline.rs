// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end file requests against the builtin local handler.

use parking_lot::Mutex;
use relay_core::{ErrorCode, Permissions, StatResult, Uri};
use relay_runtime::{Application, File, Object, Receiver, ThreadMode, NO_MAX_BYTES};
use std::io::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn app() -> Application {
    Application::new(vec!["specs".to_string()], "specs")
}

fn tempdir() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    }
}

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) {
    let path = dir.path().join(name);
    let mut file = match std::fs::File::create(&path) {
        Ok(file) => file,
        Err(err) => panic!("create {name}: {err}"),
    };
    if let Err(err) = file.write_all(contents) {
        panic!("write {name}: {err}");
    }
}

fn file_uri(dir: &tempfile::TempDir, name: &str) -> Uri {
    Uri::parse(&format!("file://{}/{}", dir.path().display(), name))
}

/// Collects everything a file request can emit.
struct Probe {
    object: Object,
    stat: Mutex<Option<StatResult>>,
    data: Mutex<Vec<u8>>,
    listings: Mutex<Vec<Vec<Uri>>>,
    errors: Mutex<Vec<ErrorCode>>,
    chunks: AtomicUsize,
}

impl Probe {
    fn new(parent: &Object) -> Arc<Probe> {
        Arc::new(Probe {
            object: Object::new(parent),
            stat: Mutex::new(None),
            data: Mutex::new(Vec::new()),
            listings: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            chunks: AtomicUsize::new(0),
        })
    }

    fn attach(self: &Arc<Probe>, file: &File) {
        file.stat_result.connect(self, Probe::on_stat);
        file.data_read.connect(self, Probe::on_data);
        file.dir_read.connect(self, Probe::on_dir);
        file.error.connect(self, Probe::on_error);
    }

    fn on_stat(&self, result: &StatResult) {
        *self.stat.lock() = Some(result.clone());
    }

    fn on_data(&self, chunk: &relay_core::ByteStream) {
        self.chunks.fetch_add(1, Ordering::SeqCst);
        self.data.lock().extend_from_slice(chunk.as_bytes());
    }

    fn on_dir(&self, entries: &Vec<Uri>) {
        self.listings.lock().push(entries.clone());
    }

    fn on_error(&self, code: &ErrorCode) {
        self.errors.lock().push(*code);
    }
}

impl Receiver for Probe {
    fn object(&self) -> &Object {
        &self.object
    }
}

fn run(job: relay_runtime::Thread) {
    job.exec();
    job.join();
}

#[test]
fn stat_round_trip() {
    let app = app();
    let dir = tempdir();
    write_file(&dir, "hello.txt", b"hello world");

    let file = File::new(file_uri(&dir, "hello.txt"), app.object());
    let probe = Probe::new(app.object());
    probe.attach(&file);

    run(file.stat(ThreadMode::Joinable));

    let stat = probe.stat.lock().clone();
    let stat = match stat {
        Some(stat) => stat,
        None => panic!("no stat result"),
    };
    assert_eq!(stat.error_code, ErrorCode::NoError);
    assert!(stat.exists);
    assert_eq!(stat.size, 11);
    assert!(probe.errors.lock().is_empty());
}

#[test]
fn get_round_trip() {
    let app = app();
    let dir = tempdir();
    write_file(&dir, "payload.bin", b"0123456789");

    let file = File::new(file_uri(&dir, "payload.bin"), app.object());
    let probe = Probe::new(app.object());
    probe.attach(&file);

    run(file.get(NO_MAX_BYTES, ThreadMode::Joinable));
    assert_eq!(probe.data.lock().as_slice(), b"0123456789");
    assert!(probe.errors.lock().is_empty());
}

#[test]
fn get_missing_file_reports_through_error() {
    let app = app();
    let dir = tempdir();

    let file = File::new(file_uri(&dir, "nope.bin"), app.object());
    let probe = Probe::new(app.object());
    probe.attach(&file);

    run(file.get(NO_MAX_BYTES, ThreadMode::Joinable));
    assert_eq!(probe.errors.lock().as_slice(), [ErrorCode::FileNotFound]);
    assert_eq!(probe.chunks.load(Ordering::SeqCst), 0);
}

#[test]
fn get_directory_lists_once() {
    let app = app();
    let dir = tempdir();
    write_file(&dir, "a", b"1");
    write_file(&dir, "b", b"2");

    let root = Uri::parse(&format!("file://{}", dir.path().display()));
    let file = File::new(root, app.object());
    let probe = Probe::new(app.object());
    probe.attach(&file);

    run(file.get(NO_MAX_BYTES, ThreadMode::Joinable));
    let listings = probe.listings.lock();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].len(), 2);
}

#[test]
fn mkdir_round_trip() {
    let app = app();
    let dir = tempdir();

    let file = File::new(file_uri(&dir, "made"), app.object());
    let probe = Probe::new(app.object());
    probe.attach(&file);

    run(file.mkdir(Permissions::SYSTEM_DEFAULT, ThreadMode::Joinable));
    assert!(dir.path().join("made").is_dir());
    assert!(probe.errors.lock().is_empty());
}

#[test]
fn bounded_get_stops_after_crossing_the_limit() {
    let app = app();
    let dir = tempdir();
    let payload = vec![42u8; 80 * 1024];
    write_file(&dir, "big.bin", &payload);

    let file = File::new(file_uri(&dir, "big.bin"), app.object());
    let probe = Probe::new(app.object());
    probe.attach(&file);

    run(file.get(10 * 1024, ThreadMode::Joinable));
    let received = probe.data.lock().len();
    assert!(received >= 10 * 1024);
    assert!(received < payload.len());
    assert_eq!(probe.chunks.load(Ordering::SeqCst), 1);
}

#[test]
fn many_requests_share_the_handler_pool() {
    let app = app();
    let dir = tempdir();
    for index in 0..4 {
        write_file(&dir, &format!("f{index}"), b"data");
    }

    for index in 0..4 {
        let file = File::new(file_uri(&dir, &format!("f{index}")), app.object());
        let probe = Probe::new(app.object());
        probe.attach(&file);
        run(file.stat(ThreadMode::Joinable));
        assert!(probe.stat.lock().is_some());
    }
}
