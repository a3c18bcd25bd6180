//! Tumbling-window smoothing of raw sensor samples.
//!
//! Samples are kept as whole rows, so every channel sequence has the same
//! length by construction. The window never holds more than its configured
//! size; once full it must be flushed before the next observation.

use crate::error::{AgentError, Result};
use crate::telemetry::data::{Channel, SensorSample, SmoothedRecord};

/// Fixed-size, non-overlapping accumulation buffer.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    size: usize,
    samples: Vec<SensorSample>,
}

impl SmoothingWindow {
    /// Create an empty window holding `size` samples.
    ///
    /// A zero size is clamped to one so the window can always fill.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            samples: Vec::with_capacity(size),
        }
    }

    /// Configured window size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of samples collected since the last flush.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append one sample to every channel.
    pub fn observe(&mut self, sample: SensorSample) -> Result<()> {
        if self.is_window_full() {
            return Err(AgentError::WindowOverflow(self.size));
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn is_window_full(&self) -> bool {
        self.samples.len() == self.size
    }

    /// Samples still needed before the next flush.
    pub fn remaining(&self) -> usize {
        self.size - self.samples.len()
    }

    /// Values collected so far for one channel, oldest first.
    pub fn channel_values(&self, channel: Channel) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(move |s| s.get(channel))
    }

    /// Collapse a full window into per-channel means and start over empty.
    ///
    /// Returns `None`, leaving the window untouched, when it is not full.
    pub fn flush(&mut self) -> Option<SmoothedRecord> {
        if !self.is_window_full() {
            return None;
        }

        let record = SmoothedRecord {
            pm1_0: self.mean(Channel::Pm1_0),
            pm2_5: self.mean(Channel::Pm2_5),
            pm10: self.mean(Channel::Pm10),
        };
        self.samples.clear();
        Some(record)
    }

    fn mean(&self, channel: Channel) -> f64 {
        self.channel_values(channel).sum::<f64>() / self.samples.len() as f64
    }
}
