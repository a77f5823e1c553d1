//! Cooperative interruption of long-running reads.
//!
//! Read loops poll [`check_interrupt`] between fixed-size chunks. A system
//! call that has already been issued always completes before the next
//! checkpoint, so cancellation latency is bounded by one chunk.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{SfsError, SfsErrorKind, SfsResult};

static INTERRUPT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Ask in-flight operations to stop at their next checkpoint.
pub fn request_interrupt() {
    INTERRUPT_REQUESTED.store(true, Ordering::Relaxed);
}

/// Re-arm after a handled interruption.
pub fn clear_interrupt() {
    INTERRUPT_REQUESTED.store(false, Ordering::Relaxed);
}

/// Fails with [`SfsErrorKind::Interrupted`] if an interrupt was requested.
pub fn check_interrupt() -> SfsResult<()> {
    if INTERRUPT_REQUESTED.load(Ordering::Relaxed) {
        return Err(SfsError::new(
            SfsErrorKind::Interrupted,
            "operation interrupted",
        ));
    }
    Ok(())
}
