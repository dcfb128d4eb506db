//! Streaming sample-rate conversion for devices that cannot run at the
//! configured capture rate.
//!
//! Unlike whole-buffer resampling, these keep state between cpal callbacks so
//! block boundaries never introduce clicks or drift.

use anyhow::{anyhow, Result};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};

// Practical ratio bounds (~0.01x .. 8x) around common speech rates.
pub(super) const MIN_DEVICE_RATE: u32 = 2_000;
pub(super) const MAX_DEVICE_RATE: u32 = 1_600_000;

#[cfg(feature = "high-quality-audio")]
const SINC_CHUNK: usize = 256;

/// Converts a mono f32 stream from `device_rate` to `target_rate`.
pub(super) enum StreamResampler {
    Passthrough,
    Linear(LinearResampler),
    #[cfg(feature = "high-quality-audio")]
    Sinc(Box<SincStream>),
}

impl StreamResampler {
    /// Pick the best available converter; equal rates pass samples through untouched.
    pub(super) fn new(device_rate: u32, target_rate: u32) -> Result<Self> {
        if device_rate == target_rate {
            return Ok(StreamResampler::Passthrough);
        }
        if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) || target_rate == 0 {
            return Err(anyhow!(
                "unsupported device sample rate {device_rate}Hz for resampling to {target_rate}Hz"
            ));
        }

        #[cfg(feature = "high-quality-audio")]
        {
            match SincStream::new(device_rate, target_rate) {
                Ok(stream) => return Ok(StreamResampler::Sinc(Box::new(stream))),
                Err(err) => {
                    tracing::warn!(error = %err, "sinc resampler unavailable; using linear path");
                }
            }
        }

        Ok(StreamResampler::Linear(LinearResampler::new(
            device_rate,
            target_rate,
        )))
    }

    pub(super) fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        #[cfg(feature = "high-quality-audio")]
        let mut fallback: Option<LinearResampler> = None;
        match self {
            StreamResampler::Passthrough => out.extend_from_slice(input),
            StreamResampler::Linear(linear) => linear.process(input, out),
            #[cfg(feature = "high-quality-audio")]
            StreamResampler::Sinc(sinc) => {
                if let Err(err) = sinc.process(input, out) {
                    tracing::warn!(error = %err, "sinc resampler failed; switching to linear path");
                    let mut linear = LinearResampler::new(sinc.device_rate, sinc.target_rate);
                    linear.process(input, out);
                    fallback = Some(linear);
                }
            }
        }
        #[cfg(feature = "high-quality-audio")]
        if let Some(linear) = fallback {
            *self = StreamResampler::Linear(linear);
        }
    }

    pub(super) fn label(&self) -> &'static str {
        match self {
            StreamResampler::Passthrough => "passthrough",
            StreamResampler::Linear(_) => "linear",
            #[cfg(feature = "high-quality-audio")]
            StreamResampler::Sinc(_) => "sinc",
        }
    }
}

/// Linear interpolation that carries its fractional read position and the last
/// input sample across blocks.
pub(super) struct LinearResampler {
    step: f64,
    pos: f64,
    prev: Option<f32>,
}

impl LinearResampler {
    pub(super) fn new(device_rate: u32, target_rate: u32) -> Self {
        Self {
            step: f64::from(device_rate) / f64::from(target_rate.max(1)),
            pos: 0.0,
            prev: None,
        }
    }

    pub(super) fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if input.is_empty() {
            return;
        }
        let mut buf = Vec::with_capacity(input.len() + 1);
        if let Some(prev) = self.prev {
            buf.push(prev);
        }
        buf.extend_from_slice(input);

        let last_index = (buf.len() - 1) as f64;
        while self.pos < last_index {
            let idx = self.pos.floor() as usize;
            let frac = (self.pos - idx as f64) as f32;
            out.push(buf[idx] * (1.0 - frac) + buf[idx + 1] * frac);
            self.pos += self.step;
        }
        // Re-base so index 0 of the next block is this block's last sample.
        self.pos -= last_index;
        self.prev = buf.last().copied();
    }
}

#[cfg(feature = "high-quality-audio")]
pub(super) struct SincStream {
    resampler: SincFixedIn<f32>,
    pending: Vec<f32>,
    device_rate: u32,
    target_rate: u32,
}

#[cfg(feature = "high-quality-audio")]
impl SincStream {
    fn new(device_rate: u32, target_rate: u32) -> Result<Self> {
        let ratio = f64::from(target_rate) / f64::from(device_rate);
        let params = InterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.90,
            interpolation: InterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, SINC_CHUNK, 1)
            .map_err(|e| anyhow!("failed to construct sinc resampler: {e:?}"))?;
        Ok(Self {
            resampler,
            pending: Vec::with_capacity(SINC_CHUNK * 2),
            device_rate,
            target_rate,
        })
    }

    /// Feeds whole chunks only; a partial chunk waits for the next callback.
    fn process(&mut self, input: &[f32], out: &mut Vec<f32>) -> Result<()> {
        self.pending.extend_from_slice(input);
        let mut consumed = 0usize;
        while self.pending.len() - consumed >= SINC_CHUNK {
            let chunk = &self.pending[consumed..consumed + SINC_CHUNK];
            let produced = self
                .resampler
                .process(&[chunk], None)
                .map_err(|e| anyhow!("resampler process failed: {e:?}"))?;
            if let Some(channel) = produced.first() {
                out.extend_from_slice(channel);
            }
            consumed += SINC_CHUNK;
        }
        self.pending.drain(..consumed);
        Ok(())
    }
}
