use std::ffi::OsString;
use std::path::PathBuf;

use sourcefs_core::{
    ByteSink, CanonPath, SfsDirEntries, SfsError, SfsErrorKind, SfsResult, SourceAccessor,
    SfsStat,
};

use crate::file::HostFileAccessor;
use crate::mtime::MtimeTracker;
use crate::platform::{self, BeneathError};

/// A view over a directory subtree, bound to one descriptor.
///
/// Every sub-path operation resolves through per-call, no-follow descriptor
/// opens beneath the bound root; a symlink in any interior component is a
/// distinguished failure, never silently resolved. The root path itself was
/// classified by the binding factory and is not re-validated here.
pub struct HostDirAccessor {
    dir: platform::DirHandle,
    root_path: CanonPath,
    display_prefix: String,
    tracker: MtimeTracker,
}

/// Parent directory of a sub-path: the root's own descriptor is borrowed,
/// anything deeper is a freshly opened descriptor owned by the caller and
/// closed on drop.
enum Parent<'a> {
    Root(&'a platform::DirHandle),
    Owned(platform::DirHandle),
}

impl Parent<'_> {
    fn handle(&self) -> &platform::DirHandle {
        match self {
            Parent::Root(handle) => handle,
            Parent::Owned(handle) => handle,
        }
    }
}

impl HostDirAccessor {
    pub(crate) fn new(
        dir: platform::DirHandle,
        root_path: CanonPath,
        track_last_modified: bool,
    ) -> Self {
        let display_prefix = root_path.abs().to_string();
        Self {
            dir,
            root_path,
            display_prefix,
            tracker: MtimeTracker::new(track_last_modified),
        }
    }

    pub(crate) fn clear_display_prefix(&mut self) {
        self.display_prefix.clear();
    }

    fn symlink_not_allowed(&self, path: CanonPath) -> SfsError {
        let message = format!("path '{}' is a symlink", self.display_path(&path));
        SfsError::symlink_not_allowed(path, message)
    }

    /// Open the parent directory of `path` beneath the root. `Ok(None)`
    /// means the parent could not be opened (absent, permission, ...);
    /// interior symlinks are a `SymlinkNotAllowed` failure.
    fn open_parent(&self, path: &CanonPath) -> SfsResult<Option<Parent<'_>>> {
        let parent = path.parent().expect("open_parent requires a non-root path");
        if parent.is_root() {
            return Ok(Some(Parent::Root(&self.dir)));
        }
        match platform::open_dir_beneath(&self.dir, &parent) {
            Ok(handle) => Ok(Some(Parent::Owned(handle))),
            Err(BeneathError::SymlinkInterior(offending)) => {
                Err(self.symlink_not_allowed(offending))
            }
            Err(BeneathError::Io(err))
                if matches!(err.raw_os_error(), Some(libc::ELOOP) | Some(libc::ENOTDIR)) =>
            {
                Err(self.symlink_not_allowed(parent))
            }
            Err(BeneathError::Io(_)) => Ok(None),
        }
    }
}

impl SourceAccessor for HostDirAccessor {
    fn maybe_stat(&self, path: &CanonPath) -> SfsResult<Option<SfsStat>> {
        let st = if path.is_root() {
            match platform::stat_dir(&self.dir) {
                Ok(st) => st,
                Err(_) => return Ok(None),
            }
        } else {
            let Some(parent) = self.open_parent(path)? else {
                return Ok(None);
            };
            let name = path.base_name().expect("non-root path has a base name");
            match platform::stat_at(parent.handle(), name) {
                Ok(st) => st,
                Err(_) => return Ok(None),
            }
        };
        self.tracker.update(st.mtime);
        Ok(Some(platform::public_stat(&st)))
    }

    fn read_file(
        &self,
        path: &CanonPath,
        sink: &mut dyn ByteSink,
        size_callback: &mut dyn FnMut(u64),
    ) -> SfsResult<()> {
        if path.is_root() {
            return Err(SfsError::new(
                SfsErrorKind::NotARegularFile,
                format!("'{}' is not a regular file", self.display_path(path)),
            ));
        }

        let file = match platform::open_file_beneath(&self.dir, path) {
            Ok(file) => file,
            Err(BeneathError::SymlinkInterior(offending)) => {
                return Err(self.symlink_not_allowed(offending));
            }
            Err(BeneathError::Io(err)) => {
                return Err(match err.raw_os_error() {
                    Some(libc::ELOOP) => SfsError::new(
                        SfsErrorKind::NotARegularFile,
                        format!(
                            "'{}' is a symlink, not a regular file",
                            self.display_path(path)
                        ),
                    ),
                    Some(libc::ENOENT) | Some(libc::ENOTDIR) => SfsError::new(
                        SfsErrorKind::FileNotFound,
                        format!("file '{}' does not exist", self.display_path(path)),
                    ),
                    _ => crate::map_io_error(
                        format!("opening '{}'", self.display_path(path)),
                        err,
                    ),
                });
            }
        };

        // Delegate the streaming to a transient single-file accessor bound
        // to the descriptor we just opened, then fold its observed mtime
        // into ours.
        let file_accessor = HostFileAccessor::new(
            file,
            self.root_path.join(path),
            self.tracker.enabled(),
        );
        file_accessor.read_file(&CanonPath::root(), sink, size_callback)?;
        if let Some(mtime) = file_accessor.last_modified() {
            self.tracker.update(mtime);
        }
        Ok(())
    }

    fn read_directory(&self, path: &CanonPath) -> SfsResult<SfsDirEntries> {
        let handle = if path.is_root() {
            // Fresh descriptor even for the root, so concurrent listings
            // never share a read cursor.
            crate::io_result(
                format!("opening directory '{}'", self.display_path(path)),
                platform::reopen_dir(&self.dir),
            )?
        } else {
            match platform::open_dir_beneath(&self.dir, path) {
                Ok(handle) => handle,
                Err(BeneathError::SymlinkInterior(offending)) => {
                    return Err(self.symlink_not_allowed(offending));
                }
                Err(BeneathError::Io(err)) => {
                    return Err(match err.raw_os_error() {
                        Some(libc::ENOTDIR) => SfsError::new(
                            SfsErrorKind::NotADirectory,
                            format!("'{}' is not a directory", self.display_path(path)),
                        ),
                        _ => crate::map_io_error(
                            format!("opening directory '{}'", self.display_path(path)),
                            err,
                        ),
                    });
                }
            }
        };

        let entries = crate::io_result(
            format!("reading directory '{}'", self.display_path(path)),
            platform::read_dir(handle),
        )?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.name, entry.file_type))
            .collect())
    }

    fn read_link(&self, path: &CanonPath) -> SfsResult<OsString> {
        if path.is_root() {
            return Err(SfsError::new(
                SfsErrorKind::NotASymlink,
                format!("file '{}' is not a symlink", self.display_path(path)),
            ));
        }

        let Some(parent) = self.open_parent(path)? else {
            return Err(SfsError::new(
                SfsErrorKind::FileNotFound,
                format!("file '{}' does not exist", self.display_path(path)),
            ));
        };
        let name = path.base_name().expect("non-root path has a base name");
        match platform::readlink_at(parent.handle(), name) {
            Ok(target) => Ok(target),
            Err(err) if err.raw_os_error() == Some(libc::EINVAL) => Err(SfsError::new(
                SfsErrorKind::NotASymlink,
                format!("file '{}' is not a symlink", self.display_path(path)),
            )),
            Err(err) => Err(crate::map_io_error(
                format!("reading symlink '{}'", self.display_path(path)),
                err,
            )),
        }
    }

    fn physical_path(&self, path: &CanonPath) -> Option<PathBuf> {
        if path.is_root() {
            Some(PathBuf::from(self.root_path.abs()))
        } else {
            Some(PathBuf::from(self.root_path.join(path).abs()))
        }
    }

    fn display_prefix(&self) -> &str {
        &self.display_prefix
    }

    fn last_modified(&self) -> Option<i64> {
        self.tracker.get()
    }
}
