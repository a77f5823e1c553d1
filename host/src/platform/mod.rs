//! OS-facing primitives.

use sourcefs_core::{CanonPath, SfsFileType, SfsStat};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;

#[cfg(not(unix))]
compile_error!("sourcefs-host requires a Unix platform");

/// Raw stat translation, kept richer than the public model because the
/// accessors also need the modification time for tracking.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Stat {
    pub file_type: SfsFileType,
    pub size: u64,
    pub mtime: i64,
    pub executable: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct DirEntryInfo {
    pub name: String,
    pub file_type: Option<SfsFileType>,
}

/// Failure of a symlink-safe open beneath a root descriptor.
#[derive(Debug)]
pub(crate) enum BeneathError {
    /// A non-final component was a symlink (or otherwise not a directory);
    /// carries the offending sub-path relative to the root descriptor.
    SymlinkInterior(CanonPath),
    /// The final component failed to open; the caller interprets the errno.
    Io(std::io::Error),
}

pub(crate) fn public_stat(st: &Stat) -> SfsStat {
    let regular = st.file_type == SfsFileType::Regular;
    SfsStat {
        file_type: st.file_type,
        file_size: regular.then_some(st.size),
        executable: regular && st.executable,
    }
}
