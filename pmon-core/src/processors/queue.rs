use crate::events::ProcessingEvent;
use crate::processors::error::PipelineError;
use std::collections::VecDeque;

/// Bounded FIFO of pending events.
///
/// Never grows past its capacity: a push into a full queue fails and
/// leaves the queue untouched.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<ProcessingEvent>,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an event, returning the new length.
    pub fn push(&mut self, event: ProcessingEvent) -> Result<usize, PipelineError> {
        if self.events.len() >= self.capacity {
            return Err(PipelineError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.events.push_back(event);
        Ok(self.events.len())
    }

    pub fn pop(&mut self) -> Option<ProcessingEvent> {
        self.events.pop_front()
    }

    pub fn peek(&self) -> Option<&ProcessingEvent> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove every event, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        dropped
    }

    /// Take up to `max` of the oldest events, oldest first.
    pub fn drain_batch(&mut self, max: usize) -> Vec<ProcessingEvent> {
        let take = max.min(self.events.len());
        self.events.drain(..take).collect()
    }

    /// Fill level in percent.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 100.0;
        }
        self.events.len() as f64 / self.capacity as f64 * 100.0
    }
}
