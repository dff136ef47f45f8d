//! Voice queue
//!
//! FIFO of pending clip keys for the voice engine. Keys are appended by queued
//! play requests, popped from the front as they are dispatched, and dropped
//! wholesale on stop.

use std::collections::VecDeque;

/// Pending voice keys, front = next to play
#[derive(Debug, Default)]
pub struct VoiceQueue {
    pending: VecDeque<String>,

    /// Keys dispatched since the queue was last cleared or drained
    dispatched: usize,
}

impl VoiceQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append keys to the back, preserving their order
    pub fn enqueue_all<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(keys.into_iter().map(Into::into));
    }

    /// Take the next key to play
    pub fn pop_front(&mut self) -> Option<String> {
        let key = self.pending.pop_front()?;
        self.dispatched += 1;
        Some(key)
    }

    /// Peek at the next key without dispatching it
    pub fn front(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    /// Drop every pending key; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.dispatched = 0;
        dropped
    }

    /// Reset the dispatch counter, returning its value
    pub fn take_dispatched(&mut self) -> usize {
        std::mem::take(&mut self.dispatched)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending keys in play order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_creation() {
        let queue = VoiceQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.front().is_none());
    }

    #[test]
    fn test_fifo_order_across_appends() {
        let mut queue = VoiceQueue::new();
        queue.enqueue_all(["a", "b", "c"]);
        assert_eq!(queue.pop_front().as_deref(), Some("a"));

        // Keys appended mid-run go behind the existing ones
        queue.enqueue_all(vec!["d".to_string()]);
        let rest: Vec<&str> = queue.keys().collect();
        assert_eq!(rest, vec!["b", "c", "d"]);

        assert_eq!(queue.pop_front().as_deref(), Some("b"));
        assert_eq!(queue.pop_front().as_deref(), Some("c"));
        assert_eq!(queue.pop_front().as_deref(), Some("d"));
        assert!(queue.pop_front().is_none());
        assert_eq!(queue.take_dispatched(), 4);
        assert_eq!(queue.take_dispatched(), 0);
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut queue = VoiceQueue::new();
        queue.enqueue_all(["x", "y", "z"]);
        queue.pop_front();

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.take_dispatched(), 0);

        // Clearing an empty queue is fine
        assert_eq!(queue.clear(), 0);
    }
}
