use std::ffi::{CStr, CString, OsString};
use std::fs::File;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;

use sourcefs_core::{CanonPath, SfsFileType};

use super::{BeneathError, DirEntryInfo, Stat};

/// An open directory descriptor, closed on drop.
#[derive(Debug)]
pub(crate) struct DirHandle {
    fd: OwnedFd,
}

impl DirHandle {
    pub fn from_fd(fd: OwnedFd) -> Self {
        Self { fd }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

fn cstring(bytes: &[u8]) -> io::Result<CString> {
    CString::new(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))
}

/// Open a directory by absolute path, following symlinks.
pub(crate) fn open_root_dir(path: &Path) -> io::Result<DirHandle> {
    let cstr = cstring(path.as_os_str().as_bytes())?;
    let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC;
    let fd = unsafe { libc::open(cstr.as_ptr(), flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(DirHandle {
        fd: unsafe { OwnedFd::from_raw_fd(fd) },
    })
}

/// Classification open used by the binding factory: read-only, refusing to
/// follow a symlink at the final component.
pub(crate) fn open_path_nofollow(path: &Path) -> io::Result<OwnedFd> {
    let cstr = cstring(path.as_os_str().as_bytes())?;
    let flags = libc::O_RDONLY | libc::O_CLOEXEC | libc::O_NOFOLLOW;
    let fd = unsafe { libc::open(cstr.as_ptr(), flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Fresh, independent descriptor for the same directory, so concurrent
/// listings never share a read cursor.
pub(crate) fn reopen_dir(dir: &DirHandle) -> io::Result<DirHandle> {
    let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC;
    let fd = unsafe { libc::openat(dir.as_raw_fd(), c".".as_ptr(), flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(DirHandle {
        fd: unsafe { OwnedFd::from_raw_fd(fd) },
    })
}

pub(crate) fn stat_fd(fd: RawFd) -> io::Result<Stat> {
    let mut st = unsafe { mem::zeroed::<libc::stat>() };
    let res = unsafe { libc::fstat(fd, &mut st) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(stat_from_libc(&st))
}

pub(crate) fn stat_dir(dir: &DirHandle) -> io::Result<Stat> {
    stat_fd(dir.as_raw_fd())
}

pub(crate) fn stat_file(file: &File) -> io::Result<Stat> {
    stat_fd(file.as_raw_fd())
}

/// Stat an entry within `parent`, never following a final symlink.
pub(crate) fn stat_at(parent: &DirHandle, name: &str) -> io::Result<Stat> {
    let cstr = cstring(name.as_bytes())?;
    let mut st = unsafe { mem::zeroed::<libc::stat>() };
    let flags = libc::AT_SYMLINK_NOFOLLOW;
    let res = unsafe { libc::fstatat(parent.as_raw_fd(), cstr.as_ptr(), &mut st, flags) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(stat_from_libc(&st))
}

pub(crate) fn readlink_at(parent: &DirHandle, name: &str) -> io::Result<OsString> {
    let cstr = cstring(name.as_bytes())?;
    let mut buf = vec![0u8; 1024];
    loop {
        let res = unsafe {
            libc::readlinkat(
                parent.as_raw_fd(),
                cstr.as_ptr(),
                buf.as_mut_ptr() as *mut _,
                buf.len(),
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        let len = res as usize;
        if len < buf.len() {
            buf.truncate(len);
            return Ok(OsString::from_vec(buf));
        }
        buf.resize(buf.len() * 2, 0);
    }
}

/// List a directory, consuming its descriptor. Skips the `.`/`..`
/// pseudo-entries; kinds the stream does not resolve inline come back as
/// `None`.
pub(crate) fn read_dir(dir: DirHandle) -> io::Result<Vec<DirEntryInfo>> {
    let raw = dir.fd.into_raw_fd();
    let dirp = unsafe { libc::fdopendir(raw) };
    if dirp.is_null() {
        let err = io::Error::last_os_error();
        unsafe { libc::close(raw) };
        return Err(err);
    }

    let mut entries = Vec::new();
    let mut result = Ok(());
    loop {
        set_errno(0);
        let ent = unsafe { libc::readdir(dirp) };
        if ent.is_null() {
            let err = errno();
            if err != 0 {
                result = Err(io::Error::from_raw_os_error(err));
            }
            break;
        }
        let name = unsafe { CStr::from_ptr((*ent).d_name.as_ptr()) }.to_bytes();
        if name == b"." || name == b".." {
            continue;
        }
        let file_type = match unsafe { (*ent).d_type } {
            libc::DT_REG => Some(SfsFileType::Regular),
            libc::DT_DIR => Some(SfsFileType::Directory),
            libc::DT_LNK => Some(SfsFileType::Symlink),
            libc::DT_CHR => Some(SfsFileType::CharDevice),
            libc::DT_BLK => Some(SfsFileType::BlockDevice),
            libc::DT_FIFO => Some(SfsFileType::Fifo),
            libc::DT_SOCK => Some(SfsFileType::Socket),
            _ => None,
        };
        entries.push(DirEntryInfo {
            name: String::from_utf8_lossy(name).into_owned(),
            file_type,
        });
    }
    unsafe { libc::closedir(dirp) };
    result.map(|_| entries)
}

/// Open `path` beneath `root` without following any symlink: interior
/// components are opened one at a time with `O_DIRECTORY | O_NOFOLLOW`, the
/// final component with `leaf_flags`.
pub(crate) fn open_beneath_no_symlinks(
    root: &DirHandle,
    path: &CanonPath,
    leaf_flags: libc::c_int,
) -> Result<OwnedFd, BeneathError> {
    debug_assert!(!path.is_root(), "the root needs no resolution");
    let interior_flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_NOFOLLOW | libc::O_CLOEXEC;

    let mut walked = CanonPath::root();
    let mut current: Option<OwnedFd> = None;
    let mut components = path.components().peekable();
    while let Some(component) = components.next() {
        let dirfd = current
            .as_ref()
            .map(OwnedFd::as_raw_fd)
            .unwrap_or_else(|| root.as_raw_fd());
        walked.push(component);
        let cstr = cstring(component.as_bytes()).map_err(BeneathError::Io)?;
        let is_leaf = components.peek().is_none();
        let flags = if is_leaf { leaf_flags } else { interior_flags };
        let fd = unsafe { libc::openat(dirfd, cstr.as_ptr(), flags) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if !is_leaf
                && matches!(err.raw_os_error(), Some(libc::ELOOP) | Some(libc::ENOTDIR))
            {
                return Err(BeneathError::SymlinkInterior(walked));
            }
            return Err(BeneathError::Io(err));
        }
        current = Some(unsafe { OwnedFd::from_raw_fd(fd) });
    }
    Ok(current.expect("a non-root path has at least one component"))
}

pub(crate) fn open_dir_beneath(
    root: &DirHandle,
    path: &CanonPath,
) -> Result<DirHandle, BeneathError> {
    let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_NOFOLLOW | libc::O_CLOEXEC;
    open_beneath_no_symlinks(root, path, flags).map(DirHandle::from_fd)
}

pub(crate) fn open_file_beneath(root: &DirHandle, path: &CanonPath) -> Result<File, BeneathError> {
    let flags = libc::O_RDONLY | libc::O_NOFOLLOW | libc::O_CLOEXEC;
    open_beneath_no_symlinks(root, path, flags).map(File::from)
}

fn stat_from_libc(st: &libc::stat) -> Stat {
    let file_type = match st.st_mode & libc::S_IFMT {
        libc::S_IFREG => SfsFileType::Regular,
        libc::S_IFDIR => SfsFileType::Directory,
        libc::S_IFLNK => SfsFileType::Symlink,
        libc::S_IFCHR => SfsFileType::CharDevice,
        libc::S_IFBLK => SfsFileType::BlockDevice,
        libc::S_IFIFO => SfsFileType::Fifo,
        libc::S_IFSOCK => SfsFileType::Socket,
        _ => SfsFileType::Unknown,
    };
    Stat {
        file_type,
        size: st.st_size as u64,
        mtime: stat_mtime(st),
        executable: st.st_mode & libc::S_IXUSR != 0,
    }
}

#[cfg(target_os = "macos")]
fn stat_mtime(st: &libc::stat) -> i64 {
    st.st_mtimespec.tv_sec
}

#[cfg(not(target_os = "macos"))]
fn stat_mtime(st: &libc::stat) -> i64 {
    st.st_mtime as i64
}

#[cfg(target_os = "linux")]
fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

#[cfg(target_os = "macos")]
fn errno() -> i32 {
    unsafe { *libc::__error() }
}

#[cfg(target_os = "linux")]
fn set_errno(val: i32) {
    unsafe {
        *libc::__errno_location() = val;
    }
}

#[cfg(target_os = "macos")]
fn set_errno(val: i32) {
    unsafe {
        *libc::__error() = val;
    }
}
