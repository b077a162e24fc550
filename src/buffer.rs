use crate::error::{PipelineError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A fixed-capacity buffer that evicts its oldest element on overflow.
///
/// Clones share the same storage. `push` and `drain` take the same lock,
/// so a drain observes either all or none of a concurrent push.
#[derive(Debug)]
pub struct RingBuffer<T: Send> {
    items: Arc<Mutex<VecDeque<T>>>,
    capacity: usize,
    evicted_count: Arc<AtomicU64>,
}

impl<T: Send> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            capacity: self.capacity,
            evicted_count: Arc::clone(&self.evicted_count),
        }
    }
}

impl<T: Send> RingBuffer<T> {
    /// Create a new ring buffer holding at most `capacity` items
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity(capacity));
        }

        Ok(Self {
            items: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            evicted_count: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Append an item, evicting and returning the oldest one if the buffer is full
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self.items.lock();
        let evicted = if items.len() >= self.capacity {
            self.evicted_count.fetch_add(1, Ordering::Relaxed);
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        evicted
    }

    /// Take every buffered item in insertion order, leaving the buffer empty
    pub fn drain(&self) -> Vec<T> {
        let mut items = self.items.lock();
        items.drain(..).collect()
    }

    /// Get the current number of buffered items
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Get the capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of items evicted since creation
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count.load(Ordering::Relaxed)
    }
}
