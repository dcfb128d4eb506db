//! Fixed-length PCM frames and the duration arithmetic built on them.

use std::sync::Arc;

/// One immutable frame of mono 16-bit PCM.
///
/// Cloning is cheap: the samples are shared, never copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Arc<[i16]>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Little-endian byte view, the layout a RIFF/WAVE data chunk expects.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 2);
        for sample in self.samples.iter() {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }
}

impl From<Vec<i16>> for AudioFrame {
    fn from(samples: Vec<i16>) -> Self {
        Self::new(samples)
    }
}

/// Sample rate and frame length shared by every stage of one pipeline.
///
/// All "seconds" thresholds are compared through [`FrameFormat::frames_to_secs`],
/// so timing is exact frame accounting rather than wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub sample_rate: u32,
    pub frame_length: usize,
}

impl FrameFormat {
    pub fn new(sample_rate: u32, frame_length: usize) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frame_length: frame_length.max(1),
        }
    }

    pub fn frame_duration_secs(&self) -> f64 {
        self.frames_to_secs(1)
    }

    /// `count * frame_length / sample_rate`, multiplied before dividing so
    /// round durations (e.g. 1600 / 16000) come out exact.
    pub fn frames_to_secs(&self, count: usize) -> f64 {
        (count as f64 * self.frame_length as f64) / f64::from(self.sample_rate)
    }

    /// Whole frames that fit in `secs` without exceeding it.
    pub fn frames_within(&self, secs: f64) -> usize {
        if secs.is_nan() || secs <= 0.0 {
            return 0;
        }
        let samples = secs * f64::from(self.sample_rate);
        (samples / self.frame_length as f64).floor() as usize
    }
}

/// Re-cuts a stream of arbitrary-length PCM blocks into fixed-size chunks.
///
/// Samples are emitted strictly in arrival order; a partial tail is held until
/// the next push completes it.
#[derive(Debug)]
pub struct FrameRechunker {
    chunk_len: usize,
    pending: Vec<i16>,
}

impl FrameRechunker {
    pub fn new(chunk_len: usize) -> Self {
        let chunk_len = chunk_len.max(1);
        Self {
            chunk_len,
            pending: Vec::with_capacity(chunk_len * 2),
        }
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append `samples` and hand every completed chunk to `emit`, oldest first.
    /// Stops at the first error and keeps the remaining samples buffered.
    pub fn push<E>(
        &mut self,
        samples: &[i16],
        mut emit: impl FnMut(&[i16]) -> Result<(), E>,
    ) -> Result<usize, E> {
        self.pending.extend_from_slice(samples);
        let mut emitted = 0usize;
        let mut offset = 0usize;
        while self.pending.len() - offset >= self.chunk_len {
            let chunk = &self.pending[offset..offset + self.chunk_len];
            if let Err(err) = emit(chunk) {
                self.pending.drain(..offset);
                return Err(err);
            }
            offset += self.chunk_len;
            emitted += 1;
        }
        self.pending.drain(..offset);
        Ok(emitted)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
