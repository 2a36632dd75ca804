// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol-handler capability contract
//!
//! A protocol handler implements the URI-scheme capability set (open, read,
//! write, list, mkdir, rm, stat) for one family of schemes. Concrete
//! backends live in extension modules; the runtime only sees this trait.

use crate::byte_stream::ByteStream;
use crate::uri::Uri;
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign};
use thiserror::Error;

/// Outcome of a protocol-handler operation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Error,
)]
pub enum ErrorCode {
    /// The operation finished successfully.
    #[default]
    #[error("no error")]
    NoError,
    #[error("file not found")]
    FileNotFound,
    #[error("insufficient permissions")]
    InsufficientPermissions,
    #[error("could not resolve host")]
    CouldNotResolveHost,
    #[error("could not connect")]
    CouldNotConnect,
    #[error("login failed")]
    LoginFailed,
    #[error("file already exists")]
    FileAlreadyExists,
    #[error("invalid URI")]
    InvalidUri,
    #[error("unknown error")]
    Unknown,
}

impl ErrorCode {
    pub fn is_error(self) -> bool {
        self != ErrorCode::NoError
    }
}

/// Mode used when opening a URI on a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// File kind bitfield reported by `stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileType(pub u32);

impl FileType {
    pub const UNKNOWN: FileType = FileType(0);
    pub const REGULAR: FileType = FileType(1);
    pub const DIRECTORY: FileType = FileType(2);
    pub const CHARACTER_DEVICE: FileType = FileType(4);
    pub const BLOCK_DEVICE: FileType = FileType(8);
    pub const SYMBOLIC_LINK: FileType = FileType(16);
    pub const SOCKET: FileType = FileType(32);
    pub const PIPE: FileType = FileType(64);

    pub fn contains(self, other: FileType) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_dir(self) -> bool {
        self.contains(FileType::DIRECTORY)
    }
}

impl BitOr for FileType {
    type Output = FileType;

    fn bitor(self, rhs: FileType) -> FileType {
        FileType(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileType {
    fn bitor_assign(&mut self, rhs: FileType) {
        self.0 |= rhs.0;
    }
}

/// Posix-layout permission bitfield (owner/group/others x read/write/execute)
/// plus an unknown sentinel and a system-default marker for mkdir.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions(pub u16);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const OWNER_READ: Permissions = Permissions(1);
    pub const OWNER_WRITE: Permissions = Permissions(2);
    pub const OWNER_EXECUTE: Permissions = Permissions(4);
    pub const GROUP_READ: Permissions = Permissions(8);
    pub const GROUP_WRITE: Permissions = Permissions(16);
    pub const GROUP_EXECUTE: Permissions = Permissions(32);
    pub const OTHERS_READ: Permissions = Permissions(64);
    pub const OTHERS_WRITE: Permissions = Permissions(128);
    pub const OTHERS_EXECUTE: Permissions = Permissions(256);
    pub const UNKNOWN: Permissions = Permissions(512);
    /// Let the backend pick its platform default (umask on posix).
    pub const SYSTEM_DEFAULT: Permissions = Permissions(1024);

    pub fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Translate to a posix mode word (the low nine bits).
    pub fn to_unix_mode(self) -> u32 {
        let mut mode = 0;
        let table: [(Permissions, u32); 9] = [
            (Permissions::OWNER_READ, 0o400),
            (Permissions::OWNER_WRITE, 0o200),
            (Permissions::OWNER_EXECUTE, 0o100),
            (Permissions::GROUP_READ, 0o040),
            (Permissions::GROUP_WRITE, 0o020),
            (Permissions::GROUP_EXECUTE, 0o010),
            (Permissions::OTHERS_READ, 0o004),
            (Permissions::OTHERS_WRITE, 0o002),
            (Permissions::OTHERS_EXECUTE, 0o001),
        ];
        for (perm, bit) in table {
            if self.contains(perm) {
                mode |= bit;
            }
        }
        mode
    }

    /// Translate from a posix mode word.
    pub fn from_unix_mode(mode: u32) -> Permissions {
        let table: [(u32, Permissions); 9] = [
            (0o400, Permissions::OWNER_READ),
            (0o200, Permissions::OWNER_WRITE),
            (0o100, Permissions::OWNER_EXECUTE),
            (0o040, Permissions::GROUP_READ),
            (0o020, Permissions::GROUP_WRITE),
            (0o010, Permissions::GROUP_EXECUTE),
            (0o004, Permissions::OTHERS_READ),
            (0o002, Permissions::OTHERS_WRITE),
            (0o001, Permissions::OTHERS_EXECUTE),
        ];
        let mut perms = Permissions::NONE;
        for (bit, perm) in table {
            if mode & bit != 0 {
                perms |= perm;
            }
        }
        perms
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Permissions) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Permissions;

    fn bitand(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 & rhs.0)
    }
}

/// Result of a `stat` call.
///
/// Errors are encoded in `error_code`; a stat of a nonexistent path is a
/// successful stat with `exists == false` and `error_code == FileNotFound`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatResult {
    pub error_code: ErrorCode,
    pub exists: bool,
    pub kind: FileType,
    pub owner_user: String,
    pub owner_group: String,
    pub permissions: Permissions,
    pub size: u64,
    /// Last access time, seconds since the unix epoch.
    pub last_accessed: i64,
    /// Last modification time, seconds since the unix epoch.
    pub last_modified: i64,
    pub content_type: String,
    pub uri: Uri,
}

/// The URI-scheme capability set implemented by protocol backends.
///
/// Handlers are stateful: `open`/`read`/`write`/`close` operate on one
/// stream at a time. A handler reports through `can_be_reused_with` whether
/// an already-constructed instance can serve another URI (same scheme, and
/// for connection-oriented protocols usually the same host), which is what
/// the per-application handler cache keys on.
pub trait ProtocolHandler: Send {
    fn open(&mut self, uri: &Uri, mode: OpenMode) -> Result<(), ErrorCode>;

    /// Read up to `max_bytes` from the open stream. An empty stream means
    /// end of file.
    fn read(&mut self, max_bytes: usize) -> Result<ByteStream, ErrorCode>;

    /// Write the buffer to the open stream, returning the bytes written.
    fn write(&mut self, data: &ByteStream) -> Result<u64, ErrorCode>;

    fn close(&mut self);

    fn list_dir(&mut self, uri: &Uri) -> Result<Vec<Uri>, ErrorCode>;

    fn mkdir(&mut self, uri: &Uri, permissions: Permissions) -> Result<(), ErrorCode>;

    fn rm(&mut self, uri: &Uri) -> Result<(), ErrorCode>;

    fn stat(&mut self, uri: &Uri) -> StatResult;

    fn can_be_reused_with(&self, uri: &Uri) -> bool;
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
