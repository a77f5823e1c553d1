//! Filesystem-backed source accessors.
//!
//! Every accessor here is bound to one open descriptor and never follows a
//! symlink while resolving a sub-path beneath it, so consumers can trust
//! that no operation escapes the bound root.

mod bind;
mod dir;
mod file;
mod mtime;
mod platform;

pub use bind::{bind, root_accessor};

use sourcefs_core::{SfsError, SfsErrorKind, SfsResult};

pub(crate) fn map_io_error(message: impl Into<String>, err: std::io::Error) -> SfsError {
    let kind = io_error_kind(&err);
    SfsError::with_source(kind, message, err)
}

pub(crate) fn io_result<T>(
    message: impl Into<String>,
    result: std::io::Result<T>,
) -> SfsResult<T> {
    result.map_err(|err| map_io_error(message, err))
}

fn io_error_kind(err: &std::io::Error) -> SfsErrorKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => SfsErrorKind::FileNotFound,
        std::io::ErrorKind::Interrupted => SfsErrorKind::Interrupted,
        _ => SfsErrorKind::Io,
    }
}
