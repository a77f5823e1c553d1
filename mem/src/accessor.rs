use std::ffi::OsString;

use sourcefs_core::{
    ByteSink, CanonPath, SfsDirEntries, SfsError, SfsErrorKind, SfsResult, SfsStat, SourceAccessor,
};

use crate::node::MemNode;

/// An accessor over an in-memory tree.
///
/// A freshly constructed accessor holds no tree at all: every path reports
/// absent and every read fails with `FileNotFound`. This is the "degraded
/// accessor" the binding factory falls back to — binding stays cheap and
/// best-effort while the real failure surfaces on first use.
#[derive(Debug, Default)]
pub struct MemAccessor {
    pub(crate) root: Option<MemNode>,
    display_prefix: String,
}

impl MemAccessor {
    /// An accessor with no entries at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_display_prefix(&mut self, prefix: impl Into<String>) {
        self.display_prefix = prefix.into();
    }

    fn lookup(&self, path: &CanonPath) -> Option<&MemNode> {
        let mut node = self.root.as_ref()?;
        for component in path.components() {
            match node {
                MemNode::Dir(entries) => node = entries.get(component)?,
                _ => return None,
            }
        }
        Some(node)
    }

    fn not_found(&self, path: &CanonPath) -> SfsError {
        SfsError::new(
            SfsErrorKind::FileNotFound,
            format!("path '{}' does not exist", self.display_path(path)),
        )
    }
}

impl SourceAccessor for MemAccessor {
    fn maybe_stat(&self, path: &CanonPath) -> SfsResult<Option<SfsStat>> {
        Ok(self.lookup(path).map(|node| match node {
            MemNode::File {
                contents,
                executable,
            } => SfsStat {
                file_type: node.file_type(),
                file_size: Some(contents.len() as u64),
                executable: *executable,
            },
            _ => SfsStat {
                file_type: node.file_type(),
                file_size: None,
                executable: false,
            },
        }))
    }

    fn read_file(
        &self,
        path: &CanonPath,
        sink: &mut dyn ByteSink,
        size_callback: &mut dyn FnMut(u64),
    ) -> SfsResult<()> {
        match self.lookup(path) {
            Some(MemNode::File { contents, .. }) => {
                size_callback(contents.len() as u64);
                sink.write(contents)
            }
            Some(_) => Err(SfsError::new(
                SfsErrorKind::NotARegularFile,
                format!("'{}' is not a regular file", self.display_path(path)),
            )),
            None => Err(self.not_found(path)),
        }
    }

    fn read_directory(&self, path: &CanonPath) -> SfsResult<SfsDirEntries> {
        match self.lookup(path) {
            Some(MemNode::Dir(entries)) => Ok(entries
                .iter()
                .map(|(name, node)| (name.clone(), Some(node.file_type())))
                .collect()),
            Some(_) => Err(SfsError::new(
                SfsErrorKind::NotADirectory,
                format!("'{}' is not a directory", self.display_path(path)),
            )),
            None => Err(self.not_found(path)),
        }
    }

    fn read_link(&self, path: &CanonPath) -> SfsResult<OsString> {
        match self.lookup(path) {
            Some(MemNode::Symlink { target }) => Ok(target.clone()),
            Some(_) => Err(SfsError::new(
                SfsErrorKind::NotASymlink,
                format!("file '{}' is not a symlink", self.display_path(path)),
            )),
            None => Err(self.not_found(path)),
        }
    }

    fn display_prefix(&self) -> &str {
        &self.display_prefix
    }
}
