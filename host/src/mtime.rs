use std::sync::atomic::{AtomicI64, Ordering};

/// Folds every observed modification time into a running maximum, when
/// enabled.
///
/// The contract is that tracking is only meaningful while the owning
/// accessor is driven from a single logical caller sequence; the fold itself
/// is an atomic maximum, so concurrent use cannot tear the value, it can
/// only interleave observations.
#[derive(Debug)]
pub(crate) struct MtimeTracker {
    enabled: bool,
    mtime: AtomicI64,
}

impl MtimeTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            mtime: AtomicI64::new(0),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn update(&self, observed: i64) {
        if self.enabled {
            self.mtime.fetch_max(observed, Ordering::Relaxed);
        }
    }

    pub fn get(&self) -> Option<i64> {
        self.enabled.then(|| self.mtime.load(Ordering::Relaxed))
    }
}
