// Per-surface collection of channel buffers on a shared time axis
//
// `BufferSet` is a plain value: one writer appends whole samples, readers
// take `BufferSnapshot`s. `SharedBufferSet` wraps it in a lock so an append
// is atomic with respect to snapshot takers and no reader ever sees channels
// of unequal length.

use crate::buffer::ChannelRingBuffer;
use crate::message::Sample;
use crate::surface::SurfaceLayout;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How appended samples are placed on the time axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeAxis {
    /// Relative to the first sample after the last reset
    SessionRelative,
    /// The sample timestamp is used as-is
    SourceProvided,
}

#[derive(Debug, Clone)]
pub struct BufferSet {
    channels: Vec<(String, ChannelRingBuffer)>,
    timestamps: ChannelRingBuffer,
    session_start: Option<f64>,
    time_axis: TimeAxis,
    total_appended: u64,
}

impl BufferSet {
    pub fn new<I, S>(keys: I, capacity: usize, time_axis: TimeAxis) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: keys
                .into_iter()
                .map(|key| (key.into(), ChannelRingBuffer::new(capacity)))
                .collect(),
            timestamps: ChannelRingBuffer::new(capacity),
            session_start: None,
            time_axis,
            total_appended: 0,
        }
    }

    pub fn from_layout(layout: &SurfaceLayout) -> Self {
        Self::new(layout.keys(), layout.capacity, layout.time_axis)
    }

    /// Append one sample across every channel in a single step
    ///
    /// Channels missing from the sample get 0.0. Returns the time the
    /// sample was placed at.
    pub fn append_sample(&mut self, sample: &Sample) -> f64 {
        let time = match self.time_axis {
            TimeAxis::SessionRelative => {
                let start = *self.session_start.get_or_insert(sample.timestamp);
                sample.timestamp - start
            }
            TimeAxis::SourceProvided => {
                self.session_start.get_or_insert(sample.timestamp);
                sample.timestamp
            }
        };

        self.timestamps.append(time);
        for (key, buffer) in &mut self.channels {
            buffer.append(sample.value(key));
        }
        self.total_appended += 1;

        debug_assert!(
            self.channels
                .iter()
                .all(|(_, b)| b.len() == self.timestamps.len()),
            "channel buffers out of step with the time axis"
        );

        time
    }

    /// Clear every buffer and forget the session start. Idempotent.
    pub fn reset(&mut self) {
        self.timestamps.clear();
        for (_, buffer) in &mut self.channels {
            buffer.clear();
        }
        self.session_start = None;
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            times: self.timestamps.snapshot(),
            channels: self
                .channels
                .iter()
                .map(|(key, buffer)| ChannelSnapshot {
                    key: key.clone(),
                    values: buffer.snapshot(),
                    min: buffer.min(),
                    max: buffer.max(),
                })
                .collect(),
        }
    }

    pub fn channel(&self, key: &str) -> Option<&ChannelRingBuffer> {
        self.channels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, buffer)| buffer)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&str, &ChannelRingBuffer)> {
        self.channels.iter().map(|(k, b)| (k.as_str(), b))
    }

    pub fn timestamps(&self) -> &ChannelRingBuffer {
        &self.timestamps
    }

    pub fn session_start(&self) -> Option<f64> {
        self.session_start
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.timestamps.capacity()
    }

    pub fn metrics(&self) -> BufferSetMetrics {
        BufferSetMetrics {
            len: self.len(),
            capacity: self.capacity(),
            total_appended: self.total_appended,
            total_evicted: self.timestamps.total_evicted(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BufferSetMetrics {
    pub len: usize,
    pub capacity: usize,
    pub total_appended: u64,
    pub total_evicted: u64,
}

/// Immutable point-in-time copy of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub key: String,
    pub values: Vec<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ChannelSnapshot {
    pub fn from_values(key: impl Into<String>, values: Vec<f64>) -> Self {
        let min = values.iter().copied().reduce(f64::min);
        let max = values.iter().copied().reduce(f64::max);
        Self {
            key: key.into(),
            values,
            min,
            max,
        }
    }

    pub fn amplitude(&self) -> f64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => max - min,
            _ => 0.0,
        }
    }
}

/// Immutable point-in-time copy of a whole buffer set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferSnapshot {
    pub times: Vec<f64>,
    /// Display order
    pub channels: Vec<ChannelSnapshot>,
}

impl BufferSnapshot {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn channel(&self, key: &str) -> Option<&ChannelSnapshot> {
        self.channels.iter().find(|c| c.key == key)
    }
}

/// Single-writer, multi-reader handle to a buffer set
#[derive(Debug, Clone)]
pub struct SharedBufferSet {
    inner: Arc<RwLock<BufferSet>>,
}

impl SharedBufferSet {
    pub fn new(buffer_set: BufferSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer_set)),
        }
    }

    pub fn append_sample(&self, sample: &Sample) -> f64 {
        self.inner.write().append_sample(sample)
    }

    pub fn reset(&self) {
        self.inner.write().reset();
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        self.inner.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn metrics(&self) -> BufferSetMetrics {
        self.inner.read().metrics()
    }

    /// Run `f` against the current contents under the read lock
    pub fn with<R>(&self, f: impl FnOnce(&BufferSet) -> R) -> R {
        f(&self.inner.read())
    }
}
