//! Auto-reset event used for frame latency waits.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Set by the GPU when submitted work completes; consumed by the
/// presentation thread before it starts the next frame.
#[derive(Debug, Default)]
pub struct FrameSignal {
    ready: Mutex<bool>,
    cond: Condvar,
}

impl FrameSignal {
    pub fn new(initially_ready: bool) -> Self {
        Self {
            ready: Mutex::new(initially_ready),
            cond: Condvar::new(),
        }
    }

    pub fn signal(&self) {
        *self.ready.lock() = true;
        self.cond.notify_one();
    }

    /// Consume the signal if it is set, without blocking.
    pub fn try_take(&self) -> bool {
        std::mem::take(&mut *self.ready.lock())
    }

    /// Wait up to `timeout` for the signal and consume it.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut ready = self.ready.lock();
        if !*ready {
            // Spurious wakeups and timeouts both fall through to the check.
            let _ = self.cond.wait_while_for(&mut ready, |r| !*r, timeout);
        }
        std::mem::take(&mut *ready)
    }
}
