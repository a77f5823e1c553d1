use std::cell::Cell;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::time::{Duration, SystemTime};

use sourcefs_core::{ByteSink, CanonPath, SfsErrorKind, SfsFileType, SfsResult, SourceAccessor};
use sourcefs_host::{bind, root_accessor};
use tempfile::TempDir;

fn temp_tree() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

/// Sink that insists the size callback fired before the first byte.
struct CheckedSink<'a> {
    bytes: Vec<u8>,
    announced: &'a Cell<Option<u64>>,
}

impl ByteSink for CheckedSink<'_> {
    fn write(&mut self, data: &[u8]) -> SfsResult<()> {
        assert!(
            self.announced.get().is_some(),
            "size must be announced before any byte is delivered"
        );
        self.bytes.extend_from_slice(data);
        Ok(())
    }
}

#[test]
fn stat_read_and_list_mixed_root() {
    let temp = temp_tree();
    fs::write(temp.path().join("a"), b"hi").expect("write a");
    symlink("/etc", temp.path().join("b")).expect("symlink b");

    let accessor = bind(temp.path(), false).expect("bind");

    let st = accessor.stat(&CanonPath::new("/b")).expect("stat b");
    assert_eq!(st.file_type, SfsFileType::Symlink);
    assert_eq!(
        accessor.read_link(&CanonPath::new("/b")).expect("read link"),
        OsString::from("/etc")
    );

    let err = accessor
        .read_to_vec(&CanonPath::new("/b"))
        .expect_err("a symlink is not readable");
    assert_eq!(err.kind(), SfsErrorKind::NotARegularFile);

    let entries = accessor
        .read_directory(&CanonPath::root())
        .expect("list root");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.get("a"), Some(&Some(SfsFileType::Regular)));
    assert_eq!(entries.get("b"), Some(&Some(SfsFileType::Symlink)));

    let announced = Cell::new(None);
    let mut sink = CheckedSink {
        bytes: Vec::new(),
        announced: &announced,
    };
    accessor
        .read_file(&CanonPath::new("/a"), &mut sink, &mut |size| {
            announced.set(Some(size))
        })
        .expect("read a");
    assert_eq!(announced.get(), Some(2));
    assert_eq!(sink.bytes, b"hi");
}

#[test]
fn interior_symlink_is_rejected_everywhere() {
    let temp = temp_tree();
    fs::create_dir(temp.path().join("real")).expect("mkdir real");
    fs::write(temp.path().join("real/file"), b"x").expect("write file");
    symlink("real", temp.path().join("link")).expect("symlink link");

    let accessor = bind(temp.path(), false).expect("bind");

    // The honest route works.
    let st = accessor
        .stat(&CanonPath::new("/real/file"))
        .expect("stat through the real directory");
    assert_eq!(st.file_type, SfsFileType::Regular);
    assert_eq!(
        accessor
            .read_to_vec(&CanonPath::new("/real/file"))
            .expect("read through the real directory"),
        b"x"
    );

    // Every operation through the symlinked component fails, naming it.
    let offending = CanonPath::new("/link");

    let err = accessor
        .stat(&CanonPath::new("/link/file"))
        .expect_err("stat through a symlink");
    assert_eq!(err.kind(), SfsErrorKind::SymlinkNotAllowed);
    assert_eq!(err.offending_path(), Some(&offending));
    assert!(err.to_string().contains("/link"), "message names the path");

    let err = accessor
        .read_to_vec(&CanonPath::new("/link/file"))
        .expect_err("read through a symlink");
    assert_eq!(err.kind(), SfsErrorKind::SymlinkNotAllowed);
    assert_eq!(err.offending_path(), Some(&offending));

    let err = accessor
        .read_directory(&CanonPath::new("/link/sub"))
        .expect_err("list through a symlink");
    assert_eq!(err.kind(), SfsErrorKind::SymlinkNotAllowed);
    assert_eq!(err.offending_path(), Some(&offending));

    let err = accessor
        .read_link(&CanonPath::new("/link/file"))
        .expect_err("read link through a symlink");
    assert_eq!(err.kind(), SfsErrorKind::SymlinkNotAllowed);
    assert_eq!(err.offending_path(), Some(&offending));

    // Deeper interiors report the symlinked prefix, not the full path.
    let err = accessor
        .stat(&CanonPath::new("/link/sub/deep"))
        .expect_err("stat deep through a symlink");
    assert_eq!(err.kind(), SfsErrorKind::SymlinkNotAllowed);
    assert_eq!(err.offending_path(), Some(&offending));
}

#[test]
fn listings_have_no_pseudo_entries() {
    let temp = temp_tree();
    fs::create_dir(temp.path().join("sub")).expect("mkdir sub");
    fs::write(temp.path().join(".hidden"), b"").expect("write hidden");
    fs::write(temp.path().join("sub/inner"), b"").expect("write inner");

    let accessor = bind(temp.path(), false).expect("bind");

    let entries = accessor
        .read_directory(&CanonPath::root())
        .expect("list root");
    assert!(entries.contains_key(".hidden"));
    assert!(!entries.contains_key("."));
    assert!(!entries.contains_key(".."));

    let entries = accessor
        .read_directory(&CanonPath::new("/sub"))
        .expect("list sub");
    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key("inner"));
}

#[test]
fn concurrent_reads_do_not_interfere() {
    let temp = temp_tree();
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(temp.path().join("big"), &payload).expect("write big");

    let accessor = bind(&temp.path().join("big"), false).expect("bind");
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let accessor = &accessor;
                scope.spawn(move || accessor.read_to_vec(&CanonPath::root()).expect("read"))
            })
            .collect();
        for worker in workers {
            assert_eq!(worker.join().expect("join reader"), payload);
        }
    });
}

#[test]
fn binding_a_symlink_exposes_the_link_itself() {
    let temp = temp_tree();
    symlink("/nowhere/special", temp.path().join("lnk")).expect("symlink");

    let accessor = bind(&temp.path().join("lnk"), true).expect("bind");

    let st = accessor.stat(&CanonPath::root()).expect("stat root");
    assert_eq!(st.file_type, SfsFileType::Symlink);
    assert_eq!(
        accessor.read_link(&CanonPath::root()).expect("read link"),
        OsString::from("/nowhere/special")
    );
    assert!(
        accessor.last_modified().is_some(),
        "tracking was requested and the link was lstat'd"
    );

    // The link renders as the bound path itself, no trailing slash.
    let bound = temp.path().join("lnk");
    assert_eq!(
        accessor.display_path(&CanonPath::root()),
        bound.to_str().expect("utf-8 temp path")
    );
}

#[test]
fn binding_never_fails_for_missing_paths() {
    let temp = temp_tree();
    let accessor = bind(&temp.path().join("missing"), false).expect("bind");

    assert_eq!(
        accessor.maybe_stat(&CanonPath::root()).expect("maybe_stat"),
        None
    );
    let err = accessor
        .stat(&CanonPath::root())
        .expect_err("stat should surface the absence");
    assert_eq!(err.kind(), SfsErrorKind::FileNotFound);
    let err = accessor
        .read_to_vec(&CanonPath::root())
        .expect_err("read should surface the absence");
    assert_eq!(err.kind(), SfsErrorKind::FileNotFound);
}

#[test]
fn binding_a_device_serves_an_empty_accessor() {
    let accessor = bind(Path::new("/dev/null"), false).expect("bind");
    assert_eq!(
        accessor.maybe_stat(&CanonPath::root()).expect("maybe_stat"),
        None
    );
}

#[test]
fn file_accessor_models_a_single_file() {
    let temp = temp_tree();
    let path = temp.path().join("f");
    fs::write(&path, b"content").expect("write f");

    let accessor = bind(&path, false).expect("bind");

    let st = accessor.stat(&CanonPath::root()).expect("stat root");
    assert_eq!(st.file_type, SfsFileType::Regular);
    assert_eq!(st.file_size, Some(7));
    assert_eq!(
        accessor.read_to_vec(&CanonPath::root()).expect("read"),
        b"content"
    );

    assert!(!accessor
        .path_exists(&CanonPath::new("/sub"))
        .expect("exists"));
    assert_eq!(
        accessor
            .maybe_stat(&CanonPath::new("/sub"))
            .expect("maybe_stat"),
        None
    );
    let err = accessor
        .read_to_vec(&CanonPath::new("/sub"))
        .expect_err("nothing exists beneath a file");
    assert_eq!(err.kind(), SfsErrorKind::FileNotFound);

    let err = accessor
        .read_directory(&CanonPath::root())
        .expect_err("a file is not a container");
    assert_eq!(err.kind(), SfsErrorKind::NotADirectory);
    let err = accessor
        .read_link(&CanonPath::root())
        .expect_err("a file is not a symlink");
    assert_eq!(err.kind(), SfsErrorKind::NotASymlink);

    assert_eq!(
        accessor.physical_path(&CanonPath::root()),
        Some(path.clone())
    );
    assert_eq!(accessor.physical_path(&CanonPath::new("/sub")), None);
}

#[test]
fn tracked_mtime_is_the_max_of_touched_paths() {
    let temp = temp_tree();
    fs::write(temp.path().join("older"), b"1").expect("write older");
    fs::write(temp.path().join("newer"), b"22").expect("write newer");

    let older_time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    let newer_time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
    for (name, mtime) in [("older", older_time), ("newer", newer_time)] {
        fs::File::options()
            .write(true)
            .open(temp.path().join(name))
            .expect("open for utime")
            .set_modified(mtime)
            .expect("set mtime");
    }

    let accessor = bind(temp.path(), true).expect("bind");

    accessor.stat(&CanonPath::new("/older")).expect("stat older");
    assert_eq!(accessor.last_modified(), Some(1_000_000_000));

    accessor
        .read_to_vec(&CanonPath::new("/newer"))
        .expect("read newer");
    assert_eq!(accessor.last_modified(), Some(1_500_000_000));

    // Touching the older entry again never decreases the fold.
    accessor.stat(&CanonPath::new("/older")).expect("stat older");
    assert_eq!(accessor.last_modified(), Some(1_500_000_000));
}

#[test]
fn root_accessor_renders_paths_bare() {
    let accessor = root_accessor();
    assert_eq!(accessor.display_path(&CanonPath::new("/etc")), "/etc");
    assert!(accessor.path_exists(&CanonPath::root()).expect("exists"));
    assert_eq!(accessor.last_modified(), None);

    // Binding the filesystem root delegates to the shared instance, and
    // tracking stays off.
    let bound = bind(Path::new("/"), true).expect("bind /");
    assert_eq!(bound.last_modified(), None);
    assert_eq!(bound.display_path(&CanonPath::new("/etc")), "/etc");
}

#[test]
fn leaf_symlink_is_not_a_regular_file() {
    let temp = temp_tree();
    fs::write(temp.path().join("target"), b"hi").expect("write target");
    symlink("target", temp.path().join("s")).expect("symlink");

    let accessor = bind(temp.path(), false).expect("bind");

    let err = accessor
        .read_to_vec(&CanonPath::new("/s"))
        .expect_err("reading a symlink leaf");
    assert_eq!(err.kind(), SfsErrorKind::NotARegularFile);
    assert_eq!(
        accessor.read_link(&CanonPath::new("/s")).expect("read link"),
        OsString::from("target")
    );
    let err = accessor
        .read_link(&CanonPath::new("/target"))
        .expect_err("a regular file is not a symlink");
    assert_eq!(err.kind(), SfsErrorKind::NotASymlink);
}
