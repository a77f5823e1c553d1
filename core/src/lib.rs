//! Core capability surface for sourcefs.
//!
//! A [`SourceAccessor`] is a read-only, path-addressed view over some
//! concrete or virtual filesystem-like tree. Backends live in sibling
//! crates; this crate only defines the contract they implement and the
//! types that cross it.

mod accessor;
mod error;
mod interrupt;
mod path;
mod stat;

pub use accessor::{ByteSink, SourceAccessor};
pub use error::{SfsError, SfsErrorKind, SfsResult};
pub use interrupt::{check_interrupt, clear_interrupt, request_interrupt};
pub use path::CanonPath;
pub use stat::{SfsDirEntries, SfsFileType, SfsStat};
