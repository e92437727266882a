//! Signal history: fixed-capacity FIFO of readings per session
//!
//! Backed by a ring buffer: once full, each append overwrites the oldest
//! slot in O(1). Capacity is enforced by the storage itself.

use crate::types::Reading;
use crate::HISTORY_CAPACITY;

/// Fixed-capacity circular buffer, iterated oldest first
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// Index of the oldest element once the buffer is full
    head: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append, returning the evicted element if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
            None
        } else {
            let evicted = std::mem::replace(&mut self.slots[self.head], item);
            self.head = (self.head + 1) % self.capacity;
            Some(evicted)
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// The most recent `n` elements, oldest first
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        self.iter().skip(self.len().saturating_sub(n))
    }

    /// Newest element
    pub fn last(&self) -> Option<&T> {
        self.iter().next_back()
    }
}

/// Per-session reading history
#[derive(Debug, Clone)]
pub struct SignalHistory {
    readings: RingBuffer<Reading>,
}

impl Default for SignalHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHistory {
    /// Create history with the default capacity (1000)
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            readings: RingBuffer::new(capacity),
        }
    }

    /// Append a reading, evicting the oldest when full
    pub fn append(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    /// The most recent `n` readings (fewer if history is shorter), oldest first
    pub fn window(&self, n: usize) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.latest(n)
    }

    /// All retained readings, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.readings.capacity()
    }
}

// =============================================================================
// TESTS
// =============================================================================
