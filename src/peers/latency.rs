//! Bounded round-trip history

use std::collections::VecDeque;
use std::time::Duration;

/// Number of latency samples kept per peer
pub const LATENCY_HISTORY_LEN: usize = 5;

/// Ring buffer of the most recent latency samples, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyHistory {
    samples: VecDeque<Duration>,
}

impl LatencyHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(LATENCY_HISTORY_LEN),
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == LATENCY_HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recent sample
    #[must_use]
    pub fn latest(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// Mean of the held samples
    #[must_use]
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        #[allow(clippy::cast_possible_truncation, reason = "at most five samples")]
        Some(total / self.samples.len() as u32)
    }

    /// Samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.samples.iter().copied()
    }

    /// Number of samples held
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no sample was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
