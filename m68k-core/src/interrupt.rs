// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-thread interrupt request latch.
//!
//! [`IrqLine`] is the only state that ever crosses threads. It is kept disjoint from [`Core`]
//! (never a field read or written through `&Core`/`&mut Core` from more than one thread) so the
//! type system enforces the invariant instead of a comment: the only safe way to reach it from
//! another thread is through a cloned [`IrqHandle`].
//!
//! [`Core`]: crate::cpu::Core

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct IrqLine {
    level: AtomicU8,
    pending: AtomicBool,
}

/// A cloneable, `Send + Sync` handle used to request an interrupt from any thread.
///
/// Requests are level-sensed, not queued: calling [`IrqHandle::request`] twice before the core
/// observes the first one is equivalent to calling it once with the later level, matching real
/// IPL wiring (the 68000 samples the current level on its interrupt pins, it does not see
/// individual edges below level 7).
#[derive(Clone, Debug, Default)]
pub struct IrqHandle(Arc<IrqLine>);

impl IrqHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publishes `level` and marks the latch pending. May be called from any thread.
    pub fn request(&self, level: u8) {
        self.0.level.store(level, Ordering::Relaxed);
        self.0.pending.store(true, Ordering::Release);
    }

    /// Atomically consumes the latch. Returns `Some(level)` if a request was pending.
    ///
    /// Must only be called from the thread that owns the associated `Core`.
    pub(crate) fn take(&self) -> Option<u8> {
        if self.0.pending.swap(false, Ordering::Acquire) {
            Some(self.0.level.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_consuming() {
        let handle = IrqHandle::new();
        assert_eq!(handle.take(), None);
        handle.request(5);
        assert_eq!(handle.take(), Some(5));
        assert_eq!(handle.take(), None);
    }

    #[test]
    fn later_request_overwrites_earlier_one() {
        let handle = IrqHandle::new();
        handle.request(2);
        handle.request(6);
        assert_eq!(handle.take(), Some(6));
    }

    #[test]
    fn handle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IrqHandle>();
    }
}
