//! Error taxonomy shared by all accessor backends.

use std::io;

use crate::path::CanonPath;

pub type SfsResult<T> = Result<T, SfsError>;

/// Machine-readable classification of an accessor failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SfsErrorKind {
    NotADirectory,
    NotASymlink,
    NotARegularFile,
    FileNotFound,
    /// A symlink was encountered in a non-final component while resolving
    /// a multi-segment path. The offending sub-path travels with the error.
    SymlinkNotAllowed,
    Interrupted,
    Io,
}

/// An accessor failure: a kind, a rendered message, and optionally the
/// underlying OS error and the path the failure is about.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SfsError {
    kind: SfsErrorKind,
    message: String,
    #[source]
    source: Option<io::Error>,
    path: Option<CanonPath>,
}

impl SfsError {
    pub fn new(kind: SfsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            path: None,
        }
    }

    pub fn with_source(kind: SfsErrorKind, message: impl Into<String>, source: io::Error) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source),
            path: None,
        }
    }

    /// A symlink-interior violation naming the offending sub-path.
    pub fn symlink_not_allowed(path: CanonPath, message: impl Into<String>) -> Self {
        Self {
            kind: SfsErrorKind::SymlinkNotAllowed,
            message: message.into(),
            source: None,
            path: Some(path),
        }
    }

    pub fn kind(&self) -> SfsErrorKind {
        self.kind
    }

    /// The sub-path a `SymlinkNotAllowed` failure is about, when known.
    pub fn offending_path(&self) -> Option<&CanonPath> {
        self.path.as_ref()
    }

    /// The OS error code underlying this failure, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.as_ref().and_then(io::Error::raw_os_error)
    }
}
