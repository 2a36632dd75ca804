// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin local-filesystem protocol handler
//!
//! Handles the empty scheme (bare paths) and "file" URIs through std::fs.
//! Registered with every application as the builtin module, so local file
//! requests work without any extension setup.

use crate::module::{
    AdditionalInfo, ExtensionInfo, ExtensionType, ModuleFactory, COMPONENT_OWNER,
};
use relay_core::{
    ByteStream, ErrorCode, FileType, OpenMode, Permissions, ProtocolHandler, StatResult, Uri,
};
use std::fs;
use std::io::{Read, Write};

/// Local filesystem backend.
pub struct LocalHandler {
    stream: Option<fs::File>,
}

impl LocalHandler {
    pub fn new() -> LocalHandler {
        LocalHandler { stream: None }
    }
}

impl Default for LocalHandler {
    fn default() -> LocalHandler {
        LocalHandler::new()
    }
}

fn map_io_error(err: &std::io::Error) -> ErrorCode {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
        std::io::ErrorKind::PermissionDenied => ErrorCode::InsufficientPermissions,
        std::io::ErrorKind::AlreadyExists => ErrorCode::FileAlreadyExists,
        _ => {
            tracing::warn!(%err, "unexpected local filesystem error");
            ErrorCode::Unknown
        }
    }
}

fn file_kind(md: &fs::Metadata) -> FileType {
    let ft = md.file_type();
    let mut kind = FileType::UNKNOWN;
    if ft.is_file() {
        kind |= FileType::REGULAR;
    } else if ft.is_dir() {
        kind |= FileType::DIRECTORY;
    } else if ft.is_symlink() {
        kind |= FileType::SYMBOLIC_LINK;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if ft.is_char_device() {
            kind |= FileType::CHARACTER_DEVICE;
        } else if ft.is_block_device() {
            kind |= FileType::BLOCK_DEVICE;
        } else if ft.is_socket() {
            kind |= FileType::SOCKET;
        } else if ft.is_fifo() {
            kind |= FileType::PIPE;
        }
    }
    kind
}

impl ProtocolHandler for LocalHandler {
    fn open(&mut self, uri: &Uri, mode: OpenMode) -> Result<(), ErrorCode> {
        let result = match mode {
            OpenMode::Read => fs::File::open(uri.path()),
            OpenMode::Write => fs::File::create(uri.path()),
        };
        match result {
            Ok(file) => {
                self.stream = Some(file);
                Ok(())
            }
            Err(err) => Err(map_io_error(&err)),
        }
    }

    fn read(&mut self, max_bytes: usize) -> Result<ByteStream, ErrorCode> {
        let Some(stream) = self.stream.as_mut() else {
            tracing::warn!("read without a previous open");
            return Err(ErrorCode::Unknown);
        };
        let mut buf = vec![0u8; max_bytes];
        match stream.read(&mut buf) {
            Ok(count) => {
                buf.truncate(count);
                Ok(ByteStream::from_vec(buf))
            }
            Err(err) => Err(map_io_error(&err)),
        }
    }

    fn write(&mut self, data: &ByteStream) -> Result<u64, ErrorCode> {
        let Some(stream) = self.stream.as_mut() else {
            tracing::warn!("write without a previous open");
            return Err(ErrorCode::Unknown);
        };
        match stream.write_all(data.as_bytes()) {
            Ok(()) => Ok(data.len() as u64),
            Err(err) => Err(map_io_error(&err)),
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn list_dir(&mut self, uri: &Uri) -> Result<Vec<Uri>, ErrorCode> {
        let mut entries = Vec::new();
        let dir = fs::read_dir(uri.path()).map_err(|e| map_io_error(&e))?;
        for entry in dir {
            let entry = entry.map_err(|e| map_io_error(&e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(Uri::with_filename(uri.uri(), &name));
        }
        Ok(entries)
    }

    fn mkdir(&mut self, uri: &Uri, permissions: Permissions) -> Result<(), ErrorCode> {
        fs::create_dir(uri.path()).map_err(|e| map_io_error(&e))?;
        #[cfg(unix)]
        if permissions != Permissions::SYSTEM_DEFAULT {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::Permissions::from_mode(permissions.to_unix_mode());
            fs::set_permissions(uri.path(), mode).map_err(|e| map_io_error(&e))?;
        }
        #[cfg(not(unix))]
        let _ = permissions;
        Ok(())
    }

    fn rm(&mut self, uri: &Uri) -> Result<(), ErrorCode> {
        fs::remove_file(uri.path()).map_err(|e| map_io_error(&e))
    }

    fn stat(&mut self, uri: &Uri) -> StatResult {
        let mut result = StatResult { uri: uri.clone(), ..StatResult::default() };
        match fs::metadata(uri.path()) {
            Ok(md) => {
                result.exists = true;
                result.kind = file_kind(&md);
                result.size = md.len();
                #[cfg(unix)]
                {
                    use std::os::unix::fs::MetadataExt;
                    result.owner_user = md.uid().to_string();
                    result.owner_group = md.gid().to_string();
                    result.permissions = Permissions::from_unix_mode(md.mode());
                    result.last_accessed = md.atime();
                    result.last_modified = md.mtime();
                }
                #[cfg(not(unix))]
                {
                    result.permissions = Permissions::UNKNOWN;
                }
            }
            Err(err) => {
                result.error_code = match err.kind() {
                    std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
                    _ => map_io_error(&err),
                };
            }
        }
        result
    }

    fn can_be_reused_with(&self, uri: &Uri) -> bool {
        uri.scheme().is_empty() || uri.scheme() == "file"
    }
}

/// The builtin module advertising [`LocalHandler`].
pub struct LocalModule;

impl ModuleFactory for LocalModule {
    fn extension_info_list(&self) -> Vec<ExtensionInfo> {
        vec![ExtensionInfo {
            entry_point: "local".to_string(),
            extension_type: ExtensionType::ProtocolHandler,
            additional_info: AdditionalInfo::ProtocolHandler {
                handles_protocols: vec![String::new(), "file".to_string()],
            },
            component_owner: COMPONENT_OWNER.to_string(),
            name: "Local filesystem".to_string(),
            description: "Protocol handler for files on the local filesystem".to_string(),
            author: "relay contributors".to_string(),
            version: "1.0.0".to_string(),
        }]
    }

    fn create_protocol_handler(&self, entry_point: &str) -> Option<Box<dyn ProtocolHandler>> {
        (entry_point == "local").then(|| Box::new(LocalHandler::new()) as Box<dyn ProtocolHandler>)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
