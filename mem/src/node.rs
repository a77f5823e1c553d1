use std::collections::BTreeMap;
use std::ffi::OsString;

use sourcefs_core::SfsFileType;

#[derive(Clone, Debug)]
pub(crate) enum MemNode {
    File { contents: Vec<u8>, executable: bool },
    Dir(BTreeMap<String, MemNode>),
    Symlink { target: OsString },
}

impl MemNode {
    pub(crate) fn file_type(&self) -> SfsFileType {
        match self {
            MemNode::File { .. } => SfsFileType::Regular,
            MemNode::Dir(_) => SfsFileType::Directory,
            MemNode::Symlink { .. } => SfsFileType::Symlink,
        }
    }
}
