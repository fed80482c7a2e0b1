use std::collections::VecDeque;

use tracing::debug;

use pulse_core::activity::ActivityEvent;
use pulse_core::request::{AnalysisRequest, TriggerReason};

pub const DEFAULT_BUFFER_CAPACITY: usize = 200;

/// Events collected between analyses, oldest first. Overflow drops the oldest.
///
/// For streaming sources. A caller that already holds a complete batch
/// builds an [`AnalysisRequest`] directly so every event is counted.
#[derive(Debug)]
pub struct ActivityBuffer {
    events: VecDeque<ActivityEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for ActivityBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl ActivityBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: ActivityEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events discarded due to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Drain everything into a request, leaving the buffer empty.
    pub fn take_request(&mut self, objectives: Vec<String>, reason: TriggerReason) -> AnalysisRequest {
        let events: Vec<ActivityEvent> = self.events.drain(..).collect();
        debug!(events = events.len(), %reason, "activity buffer drained");
        AnalysisRequest::new(events, reason).with_objectives(objectives)
    }
}
