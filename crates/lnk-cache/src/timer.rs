use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};

/// A pending countdown for one generation of one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Timer {
    pub deadline: Instant,
    pub generation: u64,
    pub key: String,
}

/// Min-heap of countdowns ordered by deadline.
///
/// Superseded countdowns stay queued; the cache recognises them by their
/// generation when they come due and drops them.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    heap: Mutex<BinaryHeap<Reverse<Timer>>>,
    wake: Notify,
}

impl TimerQueue {
    pub fn schedule(&self, timer: Timer) {
        self.heap.lock().push(Reverse(timer));
        self.wake.notify_one();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.lock().peek().map(|Reverse(t)| t.deadline)
    }

    /// Pop the earliest countdown if it is due at `now`.
    pub fn pop_due(&self, now: Instant) -> Option<Timer> {
        let mut heap = self.heap.lock();
        match heap.peek() {
            Some(Reverse(t)) if t.deadline <= now => heap.pop().map(|Reverse(t)| t),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    /// Wait until the earliest countdown is due.
    ///
    /// Returns `false` once shutdown has been signalled.
    pub async fn wait_due(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            if *shutdown.borrow() {
                return false;
            }
            let next = self.next_deadline();
            tokio::select! {
                _ = sleep_until(next) => return true,
                _ = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending::<()>().await,
    }
}
