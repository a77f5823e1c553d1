//! Binding entry points: classify a real path and construct the matching
//! accessor.

use std::ffi::OsString;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use sourcefs_core::{
    ByteSink, CanonPath, SfsDirEntries, SfsFileType, SfsResult, SfsStat, SourceAccessor,
};
use sourcefs_mem::{MemAccessor, MemSink};

use crate::dir::HostDirAccessor;
use crate::file::HostFileAccessor;
use crate::platform;

static ROOT_ACCESSOR: Lazy<Arc<HostDirAccessor>> = Lazy::new(|| {
    let dir = platform::open_root_dir(Path::new("/")).expect("opening the filesystem root");
    let mut accessor = HostDirAccessor::new(dir, CanonPath::root(), false);
    // Paths render exactly as given, without a root prefix.
    accessor.clear_display_prefix();
    Arc::new(accessor)
});

/// The process-wide accessor for the whole filesystem: lazily constructed,
/// immutable, mtime tracking disabled, empty display prefix.
pub fn root_accessor() -> Arc<dyn SourceAccessor> {
    ROOT_ACCESSOR.clone()
}

/// Bind an accessor to an absolute filesystem path.
///
/// Binding is cheap and best-effort: entries that cannot be safely or
/// successfully opened (absent paths, permission failures, devices,
/// sockets) yield an in-memory stand-in that defers the failure to first
/// use. A path that is itself a symlink yields an accessor exposing exactly
/// that symlink at its root. The only construction-time failure is a
/// descriptor that opens but cannot be stat'd.
pub fn bind(root: &Path, track_last_modified: bool) -> SfsResult<Arc<dyn SourceAccessor>> {
    if root.as_os_str().is_empty() {
        return Ok(root_accessor());
    }
    assert!(root.is_absolute(), "bind requires an absolute path");

    let Some(raw) = root.to_str() else {
        debug!(path = ?root, "binding root is not valid UTF-8, serving an empty accessor");
        return Ok(empty_accessor(&CanonPath::new(&root.to_string_lossy())));
    };
    let root_path = CanonPath::new(raw);
    if root_path.is_root() {
        return Ok(root_accessor());
    }

    let fd = match platform::open_path_nofollow(Path::new(root_path.abs())) {
        Ok(fd) => fd,
        Err(err) if err.raw_os_error() == Some(libc::ELOOP) => {
            // The path itself is a symlink; read it straight into memory.
            return Ok(symlink_accessor(root_path, track_last_modified));
        }
        Err(err) => {
            debug!(path = %root_path, error = %err, "cannot open binding root, serving an empty accessor");
            return Ok(empty_accessor(&root_path));
        }
    };

    let st = crate::io_result(
        format!("statting '{}'", root_path.abs()),
        platform::stat_fd(fd.as_raw_fd()),
    )?;

    Ok(match st.file_type {
        SfsFileType::Directory => Arc::new(HostDirAccessor::new(
            platform::DirHandle::from_fd(fd),
            root_path,
            track_last_modified,
        )),
        SfsFileType::Regular => Arc::new(HostFileAccessor::with_stat(
            File::from(fd),
            root_path,
            track_last_modified,
            st,
        )),
        file_type => {
            // Devices, sockets and fifos are not representable by this
            // model.
            debug!(path = %root_path, ?file_type, "entry kind is not representable, serving an empty accessor");
            empty_accessor(&root_path)
        }
    })
}

fn empty_accessor(root_path: &CanonPath) -> Arc<dyn SourceAccessor> {
    let mut accessor = MemAccessor::new();
    accessor.set_display_prefix(root_path.abs());
    Arc::new(accessor)
}

fn symlink_accessor(root_path: CanonPath, track_last_modified: bool) -> Arc<dyn SourceAccessor> {
    let parent = root_path.parent().expect("a non-root path has a parent");
    let name = root_path
        .base_name()
        .expect("a non-root path has a base name")
        .to_string();

    let parent_dir = match platform::open_root_dir(Path::new(parent.abs())) {
        Ok(handle) => handle,
        Err(err) => {
            debug!(path = %root_path, error = %err, "cannot open symlink parent, serving an empty accessor");
            return empty_accessor(&root_path);
        }
    };
    // The link may be gone again by now; degrade rather than fail.
    let st = match platform::stat_at(&parent_dir, &name) {
        Ok(st) => st,
        Err(_) => return empty_accessor(&root_path),
    };
    let target = match platform::readlink_at(&parent_dir, &name) {
        Ok(target) => target,
        Err(_) => return empty_accessor(&root_path),
    };

    Arc::new(SymlinkAccessor::new(
        target,
        root_path,
        track_last_modified,
        st.mtime,
    ))
}

/// In-memory accessor exposing exactly one entry at its root: the symlink
/// the binding path turned out to be.
struct SymlinkAccessor {
    mem: MemAccessor,
    track_last_modified: bool,
    mtime: i64,
}

impl SymlinkAccessor {
    fn new(
        target: OsString,
        root_path: CanonPath,
        track_last_modified: bool,
        mtime: i64,
    ) -> Self {
        let mut mem = MemAccessor::new();
        let mut sink = MemSink::new(&mut mem);
        sink.create_symlink(&CanonPath::root(), target)
            .expect("a symlink at the root of an empty tree");
        mem.set_display_prefix(root_path.abs());
        Self {
            mem,
            track_last_modified,
            mtime,
        }
    }
}

impl SourceAccessor for SymlinkAccessor {
    fn maybe_stat(&self, path: &CanonPath) -> SfsResult<Option<SfsStat>> {
        self.mem.maybe_stat(path)
    }

    fn read_file(
        &self,
        path: &CanonPath,
        sink: &mut dyn ByteSink,
        size_callback: &mut dyn FnMut(u64),
    ) -> SfsResult<()> {
        self.mem.read_file(path, sink, size_callback)
    }

    fn read_directory(&self, path: &CanonPath) -> SfsResult<SfsDirEntries> {
        self.mem.read_directory(path)
    }

    fn read_link(&self, path: &CanonPath) -> SfsResult<OsString> {
        self.mem.read_link(path)
    }

    fn display_prefix(&self) -> &str {
        self.mem.display_prefix()
    }

    fn display_path(&self, path: &CanonPath) -> String {
        // The link itself renders without a trailing path.
        if path.is_root() {
            self.display_prefix().to_string()
        } else {
            format!("{}{}", self.display_prefix(), path.abs())
        }
    }

    fn last_modified(&self) -> Option<i64> {
        self.track_last_modified.then_some(self.mtime)
    }
}
