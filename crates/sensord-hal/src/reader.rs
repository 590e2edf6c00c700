//! Buffered input-record reader
//!
//! A fixed ring of `capacity` records fed from an [`EventSource`]. The
//! backing store is twice the capacity: a read always lands contiguously at
//! the head, and whatever spills past the ring is folded back to the front.

use crate::device::EventSource;
use crate::error::SensorError;
use crate::event::InputEvent;

#[derive(Debug)]
pub struct InputEventReader {
    buffer: Box<[InputEvent]>,
    capacity: usize,
    head: usize,
    current: usize,
    free_space: usize,
}

impl InputEventReader {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "reader capacity must be non-zero");
        Self {
            buffer: vec![InputEvent::default(); capacity * 2].into_boxed_slice(),
            capacity,
            head: 0,
            current: 0,
            free_space: capacity,
        }
    }

    /// Number of records buffered and not yet consumed
    pub fn available(&self) -> usize {
        self.capacity - self.free_space
    }

    /// Single read from `source` into the free space.
    ///
    /// Returns the number of records now buffered. No retry on short reads;
    /// the caller comes back on the next readiness.
    pub fn fill<S: EventSource + ?Sized>(&mut self, source: &mut S) -> Result<usize, SensorError> {
        if self.free_space == 0 {
            return Ok(self.available());
        }

        let end = self.head + self.free_space;
        let count = source
            .read_events(&mut self.buffer[self.head..end])
            .map_err(SensorError::Read)?
            .min(self.free_space);

        self.free_space -= count;
        self.head += count;
        if self.head >= self.capacity {
            let overflow = self.head - self.capacity;
            self.buffer.copy_within(self.capacity..self.capacity + overflow, 0);
            self.head -= self.capacity;
        }

        Ok(self.available())
    }

    /// Next buffered record, without consuming it
    pub fn read_event(&self) -> Option<&InputEvent> {
        if self.available() == 0 {
            return None;
        }
        Some(&self.buffer[self.current])
    }

    /// Consume the record last returned by [`read_event`](Self::read_event)
    pub fn next(&mut self) {
        if self.available() == 0 {
            return;
        }
        self.current += 1;
        self.free_space += 1;
        if self.current >= self.capacity {
            self.current -= self.capacity;
        }
    }
}
