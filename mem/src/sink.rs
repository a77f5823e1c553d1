use std::collections::BTreeMap;
use std::ffi::OsString;

use sourcefs_core::{CanonPath, SfsError, SfsErrorKind, SfsResult};

use crate::accessor::MemAccessor;
use crate::node::MemNode;

/// Write side of a [`MemAccessor`]: materializes entries into its tree.
///
/// Creating an entry creates missing parent directories along the way;
/// targeting the root replaces the whole tree.
pub struct MemSink<'a> {
    accessor: &'a mut MemAccessor,
}

impl<'a> MemSink<'a> {
    pub fn new(accessor: &'a mut MemAccessor) -> Self {
        Self { accessor }
    }

    pub fn create_dir(&mut self, path: &CanonPath) -> SfsResult<()> {
        self.insert(path, MemNode::Dir(BTreeMap::new()))
    }

    pub fn create_file(
        &mut self,
        path: &CanonPath,
        contents: Vec<u8>,
        executable: bool,
    ) -> SfsResult<()> {
        self.insert(
            path,
            MemNode::File {
                contents,
                executable,
            },
        )
    }

    pub fn create_symlink(&mut self, path: &CanonPath, target: OsString) -> SfsResult<()> {
        self.insert(path, MemNode::Symlink { target })
    }

    fn insert(&mut self, path: &CanonPath, node: MemNode) -> SfsResult<()> {
        if path.is_root() {
            self.accessor.root = Some(node);
            return Ok(());
        }

        let mut current = self
            .accessor
            .root
            .get_or_insert_with(|| MemNode::Dir(BTreeMap::new()));

        let mut components = path.components().peekable();
        while let Some(component) = components.next() {
            let MemNode::Dir(entries) = current else {
                return Err(SfsError::new(
                    SfsErrorKind::NotADirectory,
                    format!("'{path}' has a non-directory ancestor"),
                ));
            };
            if components.peek().is_none() {
                entries.insert(component.to_string(), node);
                return Ok(());
            }
            current = entries
                .entry(component.to_string())
                .or_insert_with(|| MemNode::Dir(BTreeMap::new()));
        }
        unreachable!("non-root path has at least one component");
    }
}
