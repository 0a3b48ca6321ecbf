//! Thread-safe FIFO ring with a non-destructive scan cursor.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A synchronized FIFO queue. No operation blocks: an empty queue answers
/// `None` and the caller decides whether to retry, back off, or leave.
///
/// Besides head/tail access the ring keeps one scan cursor so a single
/// consumer can walk the elements (`peek` + `advance`) without removing them.
pub struct RingQueue<T> {
    inner: Mutex<RingState<T>>,
}

struct RingState<T> {
    items: VecDeque<T>,
    cursor: usize,
}

impl<T> RingState<T> {
    // Keep the cursor on a valid slot after a removal at `index`.
    fn fix_cursor_after_remove(&mut self, index: usize) {
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.items.len() {
            self.cursor = 0;
        }
    }
}

impl<T> Default for RingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RingQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RingState {
                items: VecDeque::new(),
                cursor: 0,
            }),
        }
    }

    /// Insert at the logical tail.
    pub fn enqueue(&self, item: T) {
        let mut guard = self.inner.lock().expect("ring queue mutex poisoned");
        guard.items.push_back(item);
    }

    /// Remove and return the logical head.
    pub fn dequeue(&self) -> Option<T> {
        let mut guard = self.inner.lock().expect("ring queue mutex poisoned");
        let item = guard.items.pop_front()?;
        guard.fix_cursor_after_remove(0);
        Some(item)
    }

    /// Move the scan cursor one element forward, wrapping at the tail.
    pub fn advance(&self) {
        let mut guard = self.inner.lock().expect("ring queue mutex poisoned");
        let len = guard.items.len();
        if len > 0 {
            guard.cursor = (guard.cursor + 1) % len;
        }
    }

    /// Remove the element under the scan cursor. The cursor then rests on
    /// the element that followed it.
    pub fn take_current(&self) -> Option<T> {
        let mut guard = self.inner.lock().expect("ring queue mutex poisoned");
        let index = guard.cursor;
        let item = guard.items.remove(index)?;
        guard.fix_cursor_after_remove(index);
        Some(item)
    }

    /// Remove the first element (head to tail) matching `pred`.
    pub fn take_where<F>(&self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut guard = self.inner.lock().expect("ring queue mutex poisoned");
        let index = guard.items.iter().position(|item| pred(item))?;
        let item = guard.items.remove(index)?;
        guard.fix_cursor_after_remove(index);
        Some(item)
    }

    /// Drop every element; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut guard = self.inner.lock().expect("ring queue mutex poisoned");
        let removed = guard.items.len();
        guard.items.clear();
        guard.cursor = 0;
        removed
    }

    /// Current number of queued elements.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("ring queue mutex poisoned");
        guard.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> RingQueue<T> {
    /// Copy of the element under the scan cursor (the head unless the cursor
    /// was advanced).
    pub fn peek(&self) -> Option<T> {
        let guard = self.inner.lock().expect("ring queue mutex poisoned");
        guard.items.get(guard.cursor).cloned()
    }
}
