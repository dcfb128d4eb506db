//! Voice Activity Detection (VAD) for speech/silence classification.
//!
//! The gate wraps an opaque engine that scores one fixed-size frame of PCM
//! and turns its probability into the boolean the recorder consumes.

use super::frame::{AudioFrame, FrameFormat, FrameRechunker};
use crate::error::CaptureError;
use anyhow::Result;
use std::collections::VecDeque;

/// Voice Activity Detection engine that scores audio frames.
///
/// # Frame Size Contract
/// Each engine consumes exactly `frame_length()` samples per call at
/// `sample_rate()`. Engines are stateful: they must see frames in strict
/// arrival order with no gaps. [`VoiceActivityGate`] takes care of re-cutting
/// device frames to this size.
pub trait VoiceActivityEngine {
    fn frame_length(&self) -> usize;
    fn sample_rate(&self) -> u32;

    /// Voice probability in `[0, 1]` for one frame.
    fn process(&mut self, samples: &[i16]) -> Result<f32>;

    fn reset(&mut self);

    fn name(&self) -> &'static str {
        "unknown_vad"
    }
}

/// Smooths VAD decisions using a sliding window majority vote.
///
/// Reduces false positives from brief noise spikes by requiring multiple
/// frames to agree before changing the speech/silence state. Ties keep the
/// newest decision.
pub(super) struct VadSmoother {
    window: VecDeque<bool>,
    window_size: usize,
}

impl VadSmoother {
    pub(super) fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::new(),
            window_size: window_size.max(1),
        }
    }

    pub(super) fn smooth(&mut self, is_voice: bool) -> bool {
        if self.window_size <= 1 {
            return is_voice;
        }
        self.window.push_back(is_voice);
        if self.window.len() > self.window_size {
            self.window.pop_front();
        }
        let voiced = self.window.iter().filter(|v| **v).count();
        let silent = self.window.len() - voiced;
        match voiced.cmp(&silent) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => is_voice,
        }
    }

    pub(super) fn reset(&mut self) {
        self.window.clear();
    }
}

/// Lightweight fallback VAD that operates on RMS energy. Used when Earshot is
/// disabled or unavailable. Scores are hard 0/1.
#[derive(Debug, Clone)]
pub struct EnergyVad {
    threshold_db: f32,
    format: FrameFormat,
}

impl EnergyVad {
    pub fn new(threshold_db: f32, format: FrameFormat) -> Self {
        Self {
            threshold_db,
            format,
        }
    }
}

impl VoiceActivityEngine for EnergyVad {
    fn frame_length(&self) -> usize {
        self.format.frame_length
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn process(&mut self, samples: &[i16]) -> Result<f32> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let energy: f32 = samples
            .iter()
            .map(|s| {
                let v = f32::from(*s) / 32_768.0;
                v * v
            })
            .sum::<f32>()
            / samples.len() as f32;
        let rms = energy.sqrt().max(1e-6);
        let db = 20.0 * rms.log10();
        Ok(if db >= self.threshold_db { 1.0 } else { 0.0 })
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "energy_vad"
    }
}

/// Thresholds a [`VoiceActivityEngine`] and adapts device frames to its frame length.
///
/// When one device frame completes several engine frames the gate reports the
/// highest probability among them; when it completes none (the engine frame is
/// longer than the device frame) the previous probability carries over.
pub struct VoiceActivityGate {
    engine: Box<dyn VoiceActivityEngine>,
    threshold: f32,
    rechunker: FrameRechunker,
    smoother: VadSmoother,
    last_probability: f32,
}

impl VoiceActivityGate {
    /// Fails with [`CaptureError::FormatMismatch`] when the engine wants a
    /// different sample rate than the capture format; frame lengths may differ.
    pub fn new(
        engine: Box<dyn VoiceActivityEngine>,
        threshold: f32,
        capture_format: FrameFormat,
        smoothing_frames: usize,
    ) -> Result<Self, CaptureError> {
        if engine.sample_rate() != capture_format.sample_rate {
            return Err(CaptureError::FormatMismatch {
                engine: engine.name(),
                expected: engine.sample_rate(),
                actual: capture_format.sample_rate,
            });
        }
        if engine.frame_length() != capture_format.frame_length {
            tracing::debug!(
                engine = engine.name(),
                engine_frame = engine.frame_length(),
                device_frame = capture_format.frame_length,
                "rechunking frames for vad engine"
            );
        }
        let rechunker = FrameRechunker::new(engine.frame_length());
        Ok(Self {
            engine,
            threshold,
            rechunker,
            smoother: VadSmoother::new(smoothing_frames),
            last_probability: 0.0,
        })
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Voice probability for `frame`, in `[0, 1]`.
    pub fn process(&mut self, frame: &AudioFrame) -> Result<f32, CaptureError> {
        let name = self.engine.name();
        let engine = &mut self.engine;
        let mut peak: Option<f32> = None;
        self.rechunker
            .push(frame.samples(), |chunk| {
                let raw = engine.process(chunk)?;
                let probability = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
                peak = Some(peak.map_or(probability, |p| p.max(probability)));
                Ok::<(), anyhow::Error>(())
            })
            .map_err(|err| CaptureError::engine(name, err))?;
        if let Some(probability) = peak {
            self.last_probability = probability;
        }
        Ok(self.last_probability)
    }

    /// `process(frame) > threshold`, passed through the smoothing window.
    pub fn is_voice(&mut self, frame: &AudioFrame) -> Result<bool, CaptureError> {
        let probability = self.process(frame)?;
        Ok(self.smoother.smooth(probability > self.threshold))
    }

    /// Forget engine state, partial chunks and smoothing history.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.rechunker.clear();
        self.smoother.reset();
        self.last_probability = 0.0;
    }
}
