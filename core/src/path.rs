//! Canonical, always-absolute paths.

use std::fmt;

/// A normalized absolute path: always starts with `/`, contains no `.` or
/// `..` components and no duplicate or trailing slashes. The root itself
/// renders as `/`.
///
/// Accessors address everything beneath their root with these, so the
/// invariant keeps every sub-path comparison and decomposition a plain
/// string operation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonPath(String);

impl CanonPath {
    /// The root path, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Canonicalize `raw` lexically: collapse `.` and duplicate slashes,
    /// resolve `..` against the root (never above it). The input is treated
    /// as absolute whether or not it starts with `/`.
    pub fn new(raw: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for component in raw.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name),
            }
        }
        if segments.is_empty() {
            Self::root()
        } else {
            Self(format!("/{}", segments.join("/")))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The absolute rendering, starting with `/`.
    pub fn abs(&self) -> &str {
        &self.0
    }

    /// The rendering relative to the root: no leading slash, empty for the
    /// root itself.
    pub fn rel(&self) -> &str {
        &self.0[1..]
    }

    pub fn parent(&self) -> Option<CanonPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// The final component; `None` for the root.
    pub fn base_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rfind('/').map(|idx| &self.0[idx + 1..])
    }

    /// Append one component. The component must be a plain name: non-empty,
    /// no slashes, not `.` or `..`.
    pub fn push(&mut self, component: &str) {
        debug_assert!(
            !component.is_empty()
                && !component.contains('/')
                && component != "."
                && component != "..",
            "push requires a plain component, got {component:?}"
        );
        if !self.is_root() {
            self.0.push('/');
        }
        self.0.push_str(component);
    }

    /// Interpret `other` as relative to `self` and concatenate.
    pub fn join(&self, other: &CanonPath) -> CanonPath {
        if other.is_root() {
            self.clone()
        } else if self.is_root() {
            other.clone()
        } else {
            CanonPath(format!("{}{}", self.0, other.0))
        }
    }

    /// The plain-name components, in order; empty for the root.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|component| !component.is_empty())
    }
}

impl fmt::Display for CanonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
