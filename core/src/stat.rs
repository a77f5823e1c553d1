//! Stat results and the directory-entry model.

use std::collections::BTreeMap;

/// Entry kind as reported by a no-follow stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SfsFileType {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Unknown,
}

/// Translation of an OS-level stat into the accessor model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SfsStat {
    pub file_type: SfsFileType,
    /// Present for regular files.
    pub file_size: Option<u64>,
    pub executable: bool,
}

/// Directory listing: entry name to optional kind, excluding the `.`/`..`
/// pseudo-entries. `None` means the directory stream did not resolve the
/// kind inline; it is reported unresolved rather than re-stat'd.
pub type SfsDirEntries = BTreeMap<String, Option<SfsFileType>>;
