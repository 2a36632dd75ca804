// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_stream() {
    let s = ByteStream::empty();
    assert_eq!(s.len(), 0);
    assert!(s.is_empty());
    assert_eq!(s.as_bytes(), b"");
}

#[test]
fn clones_share_contents() {
    let a = ByteStream::new(b"hello");
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(b.as_bytes(), b"hello");
}

#[test]
fn from_str_keeps_utf8_octets() {
    // "Tést" is 4 code points but 5 bytes of UTF-8
    let s = ByteStream::from("T\u{e9}st");
    assert_eq!(s.len(), 5);
    assert_eq!(s.to_utf8_lossy().chars().count(), 4);
}

#[test]
fn deref_as_slice() {
    let s = ByteStream::from_vec(vec![1, 2, 3]);
    assert_eq!(&s[..2], &[1, 2]);
}
