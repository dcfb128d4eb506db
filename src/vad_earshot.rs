//! Earshot-powered Voice Activity Detector adapter implementing `VoiceActivityEngine`.

use crate::audio::VoiceActivityEngine;
use anyhow::{anyhow, bail, Result};
use earshot::{VoiceActivityDetector, VoiceActivityProfile};

/// Earshot only runs at 16 kHz.
pub const EARSHOT_SAMPLE_RATE: u32 = 16_000;

/// Thin wrapper that adapts `earshot` to the crate's `VoiceActivityEngine` trait.
pub struct EarshotVad {
    detector: VoiceActivityDetector,
    frame_samples: usize,
}

impl EarshotVad {
    /// `frame_ms` must be 10, 20 or 30. `aggressiveness` 0..=3 maps onto the
    /// earshot profiles from most permissive to most aggressive.
    pub fn new(frame_ms: u32, aggressiveness: u8) -> Result<Self> {
        if !matches!(frame_ms, 10 | 20 | 30) {
            bail!("earshot supports 10, 20 or 30 ms frames, got {frame_ms} ms");
        }
        let profile = match aggressiveness {
            0 => VoiceActivityProfile::QUALITY,
            1 => VoiceActivityProfile::LBR,
            2 => VoiceActivityProfile::AGGRESSIVE,
            _ => VoiceActivityProfile::VERY_AGGRESSIVE,
        };
        let frame_samples = (EARSHOT_SAMPLE_RATE * frame_ms / 1000) as usize;
        Ok(Self {
            detector: VoiceActivityDetector::new(profile),
            frame_samples,
        })
    }
}

impl VoiceActivityEngine for EarshotVad {
    fn frame_length(&self) -> usize {
        self.frame_samples
    }

    fn sample_rate(&self) -> u32 {
        EARSHOT_SAMPLE_RATE
    }

    fn process(&mut self, samples: &[i16]) -> Result<f32> {
        let voiced = self
            .detector
            .predict_16khz(samples)
            .map_err(|_| anyhow!("earshot rejected a {}-sample frame", samples.len()))?;
        Ok(if voiced { 1.0 } else { 0.0 })
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn name(&self) -> &'static str {
        "earshot_vad"
    }
}
