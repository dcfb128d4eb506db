//! Rolling (drop-oldest) window over the most recent frames.

use super::frame::AudioFrame;
use crate::lock_or_recover;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Fixed-capacity FIFO of frames; pushing into a full buffer evicts the oldest.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    frames: VecDeque<AudioFrame>,
    capacity: usize,
}

impl RollingBuffer {
    /// A capacity of zero is valid and keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: AudioFrame) {
        if self.capacity == 0 {
            return;
        }
        while self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Frames in arrival order, oldest first.
    pub fn snapshot(&self) -> Vec<AudioFrame> {
        self.frames.iter().cloned().collect()
    }

    /// Empty the buffer and return its frames, oldest first.
    pub fn drain(&mut self) -> Vec<AudioFrame> {
        self.frames.drain(..).collect()
    }

    /// The newest `max_samples` samples (or fewer), flattened in order.
    pub fn tail_samples(&self, max_samples: usize) -> Vec<i16> {
        let mut taken = 0usize;
        let mut start = self.frames.len();
        while start > 0 && taken < max_samples {
            start -= 1;
            taken += self.frames[start].len();
        }
        let mut out: Vec<i16> = Vec::with_capacity(taken);
        for frame in self.frames.range(start..) {
            out.extend_from_slice(frame.samples());
        }
        let excess = out.len().saturating_sub(max_samples);
        out.drain(..excess);
        out
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Mutex-guarded [`RollingBuffer`] shared between the frame-pull loop (writer)
/// and snapshot readers such as the wake snippet writer.
///
/// Reads always copy under the lock, so a reader never observes a half-applied push.
#[derive(Debug, Clone)]
pub struct SharedRollingBuffer {
    inner: Arc<Mutex<RollingBuffer>>,
}

impl SharedRollingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RollingBuffer::new(capacity))),
        }
    }

    pub fn push(&self, frame: AudioFrame) {
        lock_or_recover(&self.inner, "rolling buffer push").push(frame);
    }

    pub fn snapshot(&self) -> Vec<AudioFrame> {
        lock_or_recover(&self.inner, "rolling buffer snapshot").snapshot()
    }

    /// Snapshot flattened to little-endian 16-bit PCM bytes.
    pub fn snapshot_bytes(&self) -> Vec<u8> {
        let frames = self.snapshot();
        let mut out = Vec::new();
        for frame in &frames {
            out.extend(frame.to_le_bytes());
        }
        out
    }

    pub fn tail_samples(&self, max_samples: usize) -> Vec<i16> {
        lock_or_recover(&self.inner, "rolling buffer tail").tail_samples(max_samples)
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.inner, "rolling buffer len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        lock_or_recover(&self.inner, "rolling buffer capacity").capacity()
    }

    pub fn clear(&self) {
        lock_or_recover(&self.inner, "rolling buffer clear").clear();
    }
}
