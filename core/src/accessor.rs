//! The source-accessor capability.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{SfsError, SfsErrorKind, SfsResult};
use crate::path::CanonPath;
use crate::stat::{SfsDirEntries, SfsStat};

/// Consumer of streamed file bytes.
pub trait ByteSink {
    fn write(&mut self, data: &[u8]) -> SfsResult<()>;
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> SfsResult<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// A bound, read-only, path-addressed view over a tree.
///
/// Paths are interpreted relative to the accessor's root; symlinks are never
/// followed at the final component, and filesystem-backed implementations
/// refuse to follow them in interior components as well. A single accessor
/// may be invoked concurrently from independent threads.
pub trait SourceAccessor: Send + Sync {
    /// Stat `path` without following a final symlink. Absence is `Ok(None)`,
    /// not an error.
    fn maybe_stat(&self, path: &CanonPath) -> SfsResult<Option<SfsStat>>;

    /// Like [`maybe_stat`](Self::maybe_stat), but absence is a
    /// [`SfsErrorKind::FileNotFound`] failure.
    fn stat(&self, path: &CanonPath) -> SfsResult<SfsStat> {
        self.maybe_stat(path)?.ok_or_else(|| {
            SfsError::new(
                SfsErrorKind::FileNotFound,
                format!("path '{}' does not exist", self.display_path(path)),
            )
        })
    }

    /// Stream the contents of the regular file at `path` into `sink`.
    ///
    /// `size_callback` is invoked exactly once, with the total size, before
    /// any byte reaches the sink.
    fn read_file(
        &self,
        path: &CanonPath,
        sink: &mut dyn ByteSink,
        size_callback: &mut dyn FnMut(u64),
    ) -> SfsResult<()>;

    /// Read a whole file into memory.
    fn read_to_vec(&self, path: &CanonPath) -> SfsResult<Vec<u8>> {
        let mut out = Vec::new();
        self.read_file(path, &mut out, &mut |_size| {})?;
        Ok(out)
    }

    fn read_directory(&self, path: &CanonPath) -> SfsResult<SfsDirEntries>;

    /// The target of the symlink at `path`, uninterpreted.
    fn read_link(&self, path: &CanonPath) -> SfsResult<OsString>;

    fn path_exists(&self, path: &CanonPath) -> SfsResult<bool> {
        Ok(self.maybe_stat(path)?.is_some())
    }

    /// The real filesystem path backing `path`, for accessors that have one.
    fn physical_path(&self, _path: &CanonPath) -> Option<PathBuf> {
        None
    }

    /// Prefix prepended when rendering paths for humans.
    fn display_prefix(&self) -> &str {
        ""
    }

    /// Render `path` in this accessor's display convention.
    fn display_path(&self, path: &CanonPath) -> String {
        format!("{}{}", self.display_prefix(), path.abs())
    }

    /// Best-effort maximum modification time (unix seconds) observed across
    /// all accesses so far, when tracking is enabled.
    fn last_modified(&self) -> Option<i64> {
        None
    }
}
