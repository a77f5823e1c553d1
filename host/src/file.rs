use std::ffi::OsString;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use sourcefs_core::{
    ByteSink, CanonPath, SfsDirEntries, SfsError, SfsErrorKind, SfsResult, SourceAccessor,
    SfsStat, check_interrupt,
};

use crate::mtime::MtimeTracker;
use crate::platform;

const READ_CHUNK: usize = 64 * 1024;

/// A view over exactly one regular file, addressable at the root path only.
pub struct HostFileAccessor {
    file: File,
    root_path: CanonPath,
    tracker: MtimeTracker,
    stat: OnceCell<platform::Stat>,
}

impl HostFileAccessor {
    pub(crate) fn new(file: File, root_path: CanonPath, track_last_modified: bool) -> Self {
        Self {
            file,
            root_path,
            tracker: MtimeTracker::new(track_last_modified),
            stat: OnceCell::new(),
        }
    }

    /// Construct with an already-obtained stat, saving the factory a second
    /// syscall on the classification path.
    pub(crate) fn with_stat(
        file: File,
        root_path: CanonPath,
        track_last_modified: bool,
        stat: platform::Stat,
    ) -> Self {
        let accessor = Self::new(file, root_path, track_last_modified);
        accessor.tracker.update(stat.mtime);
        let _ = accessor.stat.set(stat);
        accessor
    }

    /// The stat of the bound descriptor, computed at most once. Concurrent
    /// first callers race to a single syscall; a failure is propagated and
    /// not cached.
    fn cached_stat(&self) -> SfsResult<&platform::Stat> {
        self.stat.get_or_try_init(|| {
            let st = crate::io_result(
                format!("statting file '{}'", self.display_prefix()),
                platform::stat_file(&self.file),
            )?;
            self.tracker.update(st.mtime);
            Ok(st)
        })
    }
}

impl SourceAccessor for HostFileAccessor {
    fn maybe_stat(&self, path: &CanonPath) -> SfsResult<Option<SfsStat>> {
        if !path.is_root() {
            return Ok(None);
        }
        Ok(Some(platform::public_stat(self.cached_stat()?)))
    }

    fn read_file(
        &self,
        path: &CanonPath,
        sink: &mut dyn ByteSink,
        size_callback: &mut dyn FnMut(u64),
    ) -> SfsResult<()> {
        if !path.is_root() {
            return Err(SfsError::new(
                SfsErrorKind::FileNotFound,
                format!("path '{}' does not exist", self.display_path(path)),
            ));
        }

        let total = self.cached_stat()?.size;
        size_callback(total);

        // Offset reads keep concurrent callers off a shared file position.
        let mut buf = [0u8; READ_CHUNK];
        let mut left = total;
        let mut offset = 0u64;
        while left > 0 {
            check_interrupt()?;
            let want = READ_CHUNK.min(left as usize);
            match self.file.read_at(&mut buf[..want], offset) {
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(crate::map_io_error(
                        format!("reading from file '{}'", self.display_path(path)),
                        err,
                    ));
                }
                Ok(0) => {
                    return Err(SfsError::new(
                        SfsErrorKind::Io,
                        format!("unexpected end-of-file reading '{}'", self.display_path(path)),
                    ));
                }
                Ok(read) => {
                    sink.write(&buf[..read])?;
                    left -= read as u64;
                    offset += read as u64;
                }
            }
        }
        Ok(())
    }

    fn read_directory(&self, path: &CanonPath) -> SfsResult<SfsDirEntries> {
        Err(SfsError::new(
            SfsErrorKind::NotADirectory,
            format!("'{}' is not a directory", self.display_path(path)),
        ))
    }

    fn read_link(&self, path: &CanonPath) -> SfsResult<OsString> {
        Err(SfsError::new(
            SfsErrorKind::NotASymlink,
            format!("file '{}' is not a symlink", self.display_path(path)),
        ))
    }

    fn path_exists(&self, path: &CanonPath) -> SfsResult<bool> {
        // The accessor models a single regular file, nothing beneath it.
        Ok(path.is_root())
    }

    fn physical_path(&self, path: &CanonPath) -> Option<PathBuf> {
        path.is_root().then(|| PathBuf::from(self.root_path.abs()))
    }

    fn display_prefix(&self) -> &str {
        self.root_path.abs()
    }

    fn display_path(&self, path: &CanonPath) -> String {
        // The file itself renders without a trailing path.
        if path.is_root() {
            self.display_prefix().to_string()
        } else {
            format!("{}{}", self.display_prefix(), path.abs())
        }
    }

    fn last_modified(&self) -> Option<i64> {
        self.tracker.get()
    }
}
