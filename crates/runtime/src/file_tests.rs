// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{test_app, MemModule};
use parking_lot::Mutex;
use relay_core::{ErrorCode, FileType, Permissions};
use std::io::Write as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

struct FileFixture {
    app: crate::application::Application,
    dir: tempfile::TempDir,
}

fn fixture() -> FileFixture {
    FileFixture {
        app: test_app(),
        dir: match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => panic!("tempdir: {err}"),
        },
    }
}

impl FileFixture {
    fn write_file(&self, name: &str, contents: &[u8]) -> String {
        let path = self.dir.path().join(name);
        let mut file = match std::fs::File::create(&path) {
            Ok(file) => file,
            Err(err) => panic!("create {name}: {err}"),
        };
        if let Err(err) = file.write_all(contents) {
            panic!("write {name}: {err}");
        }
        path.display().to_string()
    }

    fn uri(&self, name: &str) -> relay_core::Uri {
        relay_core::Uri::parse(&format!("file://{}/{}", self.dir.path().display(), name))
    }
}

#[test]
fn stat_reports_inside_the_result() {
    let fx = fixture();
    fx.write_file("present.txt", b"hello");

    let file = File::new(fx.uri("present.txt"), fx.app.object());
    let seen = Arc::new(Mutex::new(None));
    let seen_slot = Arc::clone(&seen);
    file.stat_result.connect_closure(move |result| {
        *seen_slot.lock() = Some(result.clone());
    });
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_slot = Arc::clone(&errors);
    file.error.connect_closure(move |_| {
        errors_slot.fetch_add(1, Ordering::SeqCst);
    });

    let job = file.stat(ThreadMode::Joinable);
    job.exec();
    job.join();

    let result = match seen.lock().take() {
        Some(result) => result,
        None => panic!("stat_result did not fire"),
    };
    assert_eq!(result.error_code, ErrorCode::NoError);
    assert!(result.exists);
    assert!(result.kind.contains(FileType::REGULAR));
    assert_eq!(result.size, 5);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[test]
fn stat_of_a_missing_file_never_uses_the_error_signal() {
    let fx = fixture();
    let file = File::new(fx.uri("missing.txt"), fx.app.object());
    let seen = Arc::new(Mutex::new(None));
    let seen_slot = Arc::clone(&seen);
    file.stat_result.connect_closure(move |result| {
        *seen_slot.lock() = Some(result.clone());
    });
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_slot = Arc::clone(&errors);
    file.error.connect_closure(move |_| {
        errors_slot.fetch_add(1, Ordering::SeqCst);
    });

    let job = file.stat(ThreadMode::Joinable);
    job.exec();
    job.join();

    let result = match seen.lock().take() {
        Some(result) => result,
        None => panic!("stat_result did not fire"),
    };
    assert_eq!(result.error_code, ErrorCode::FileNotFound);
    assert!(!result.exists);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[test]
fn get_streams_the_file_contents_in_order() {
    let fx = fixture();
    fx.write_file("data.bin", b"abcdefghij");

    let file = File::new(fx.uri("data.bin"), fx.app.object());
    let collected = Arc::new(Mutex::new(Vec::new()));
    let collected_slot = Arc::clone(&collected);
    file.data_read.connect_closure(move |chunk| {
        collected_slot.lock().extend_from_slice(chunk.as_bytes());
    });

    let job = file.get(NO_MAX_BYTES, ThreadMode::Joinable);
    job.exec();
    job.join();
    assert_eq!(collected.lock().as_slice(), b"abcdefghij");
}

#[test]
fn get_of_a_missing_file_emits_error() {
    let fx = fixture();
    let file = File::new(fx.uri("missing.bin"), fx.app.object());
    let seen = Arc::new(Mutex::new(None));
    let seen_slot = Arc::clone(&seen);
    file.error.connect_closure(move |code| {
        *seen_slot.lock() = Some(*code);
    });
    let chunks = Arc::new(AtomicUsize::new(0));
    let chunks_slot = Arc::clone(&chunks);
    file.data_read.connect_closure(move |_| {
        chunks_slot.fetch_add(1, Ordering::SeqCst);
    });

    let job = file.get(NO_MAX_BYTES, ThreadMode::Joinable);
    job.exec();
    job.join();
    assert_eq!(*seen.lock(), Some(ErrorCode::FileNotFound));
    assert_eq!(chunks.load(Ordering::SeqCst), 0);
}

#[test]
fn get_of_a_directory_emits_dir_read_once() {
    let fx = fixture();
    fx.write_file("a.txt", b"a");
    fx.write_file("b.txt", b"b");

    let root = relay_core::Uri::parse(&format!("file://{}", fx.dir.path().display()));
    let file = File::new(root, fx.app.object());
    let listings = Arc::new(Mutex::new(Vec::new()));
    let listings_slot = Arc::clone(&listings);
    file.dir_read.connect_closure(move |entries| {
        listings_slot.lock().push(entries.clone());
    });

    let job = file.get(NO_MAX_BYTES, ThreadMode::Joinable);
    job.exec();
    job.join();

    let listings = listings.lock();
    assert_eq!(listings.len(), 1);
    let mut names: Vec<String> =
        listings[0].iter().map(|u| u.filename().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
}

#[test]
fn max_bytes_stops_at_the_first_crossing_chunk() {
    let fx = fixture();
    // three 32 KiB read buffers worth of data
    let payload = vec![7u8; 96 * 1024];
    fx.write_file("big.bin", &payload);

    let file = File::new(fx.uri("big.bin"), fx.app.object());
    let total = Arc::new(AtomicU64::new(0));
    let total_slot = Arc::clone(&total);
    file.data_read.connect_closure(move |chunk| {
        total_slot.fetch_add(chunk.len() as u64, Ordering::SeqCst);
    });

    let max_bytes = 40 * 1024;
    let job = file.get(max_bytes, ThreadMode::Joinable);
    job.exec();
    job.join();

    let read = total.load(Ordering::SeqCst);
    // the transfer crosses the limit and then stops: 64 KiB here
    assert!(read >= max_bytes);
    assert!(read < payload.len() as u64);
}

#[test]
fn mkdir_creates_the_directory() {
    let fx = fixture();
    let file = File::new(fx.uri("newdir"), fx.app.object());
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_slot = Arc::clone(&errors);
    file.error.connect_closure(move |_| {
        errors_slot.fetch_add(1, Ordering::SeqCst);
    });

    let job = file.mkdir(Permissions::SYSTEM_DEFAULT, ThreadMode::Joinable);
    job.exec();
    job.join();
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert!(fx.dir.path().join("newdir").is_dir());
}

#[test]
fn mkdir_on_an_existing_path_emits_error() {
    let fx = fixture();
    fx.write_file("taken", b"");

    let file = File::new(fx.uri("taken"), fx.app.object());
    let seen = Arc::new(Mutex::new(None));
    let seen_slot = Arc::clone(&seen);
    file.error.connect_closure(move |code| {
        *seen_slot.lock() = Some(*code);
    });

    let job = file.mkdir(Permissions::SYSTEM_DEFAULT, ThreadMode::Joinable);
    job.exec();
    job.join();
    assert_eq!(*seen.lock(), Some(ErrorCode::FileAlreadyExists));
}

#[test]
fn unknown_scheme_emits_nothing() {
    let fx = fixture();
    let file = File::new(relay_core::Uri::parse("gopher://host/x"), fx.app.object());
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_slot = Arc::clone(&fired);
    file.error.connect_closure(move |_| {
        fired_slot.fetch_add(1, Ordering::SeqCst);
    });
    let fired_slot = Arc::clone(&fired);
    file.stat_result.connect_closure(move |_| {
        fired_slot.fetch_add(1, Ordering::SeqCst);
    });

    let job = file.stat(ThreadMode::Joinable);
    job.exec();
    job.join();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn successive_requests_reuse_one_extension_load() {
    let app = test_app();
    let (module, created) = MemModule::new("mem", b"remote data");
    app.registry().register("test/mem", Box::new(module));

    for path in ["mem://host/a", "mem://host/b"] {
        let file = File::new(relay_core::Uri::parse(path), app.object());
        let job = file.stat(ThreadMode::Joinable);
        job.exec();
        job.join();
    }

    // one extension load served both requests through the cache
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(app.inner().cache_weights(), vec![1]);
}
