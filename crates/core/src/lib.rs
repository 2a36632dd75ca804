// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-core: value types and protocol contracts for the relay runtime

pub mod byte_stream;
pub mod protocol;
pub mod uri;

pub use byte_stream::ByteStream;
pub use protocol::{
    ErrorCode, FileType, OpenMode, Permissions, ProtocolHandler, StatResult,
};
pub use uri::Uri;
