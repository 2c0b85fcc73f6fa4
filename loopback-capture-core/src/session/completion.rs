use std::mem;

use parking_lot::{Condvar, Mutex};

enum Slot<T> {
    Pending,
    Ready(T),
    Taken,
}

/// Single-shot result slot bridging an asynchronous platform callback to a
/// blocking waiter.
///
/// The producer stores its value and signals under one lock; the waiter cannot
/// observe the value before that signal. Only the first completion is kept.
pub struct CompletionSlot<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> CompletionSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
        }
    }

    /// Store `value` and wake the waiter. Returns false if already completed.
    pub fn complete(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Ready(value);
        self.ready.notify_all();
        true
    }

    /// Block until completed, with no timeout, and take the value.
    ///
    /// Returns `None` if the value was already taken.
    pub fn wait(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.ready.wait(&mut slot);
        }
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for CompletionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
