//! services/client/src/engine/refresh.rs
//!
//! The process-wide "something changed" pulse. Emitters bump a counter;
//! every subscriber sees a strictly increasing sequence of values.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone)]
pub struct RefreshSignal {
    counter: Arc<watch::Sender<u64>>,
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (counter, _) = watch::channel(0);
        Self {
            counter: Arc::new(counter),
        }
    }

    /// Emits one pulse.
    pub fn trigger(&self) {
        self.counter.send_modify(|count| *count += 1);
        debug!(count = *self.counter.borrow(), "Refresh pulse emitted");
    }

    /// The number of pulses emitted so far.
    pub fn current(&self) -> u64 {
        *self.counter.borrow()
    }

    /// A receiver that is notified on every pulse emitted after this call.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.counter.subscribe()
    }
}
