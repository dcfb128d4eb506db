use super::defaults::{
    ISO_639_1_CODES, LOG_LEVELS, MAX_FRAME_LENGTH, MAX_PRE_BUFFER_SECONDS,
    MAX_RECORDING_HARD_LIMIT_SECONDS, MAX_SAMPLE_RATE, MAX_SNIPPET_SECONDS, MIN_FRAME_LENGTH,
    MIN_SAMPLE_RATE,
};
use super::{AppConfig, CaptureConfig, VadEngineKind};
use crate::audio::Thresholds;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(MIN_FRAME_LENGTH..=MAX_FRAME_LENGTH).contains(&self.frame_length) {
            bail!(
                "--frame-length must be between {MIN_FRAME_LENGTH} and {MAX_FRAME_LENGTH} samples, got {}",
                self.frame_length
            );
        }
        if !(0.0..1.0).contains(&self.voice_threshold) {
            bail!(
                "--voice-threshold must be in [0.0, 1.0), got {}",
                self.voice_threshold
            );
        }
        ensure_positive(self.silence_limit_seconds, "--silence-limit")?;
        ensure_positive(self.inactivity_limit_seconds, "--inactivity-limit")?;
        if !self.min_recording_seconds.is_finite() || self.min_recording_seconds < 0.0 {
            bail!(
                "--min-recording must be zero or positive, got {}",
                self.min_recording_seconds
            );
        }
        if !(0.0..=MAX_PRE_BUFFER_SECONDS).contains(&self.pre_buffer_seconds) {
            bail!(
                "--pre-buffer must be between 0 and {MAX_PRE_BUFFER_SECONDS} seconds, got {}",
                self.pre_buffer_seconds
            );
        }
        ensure_positive(self.max_recording_seconds, "--max-recording")?;
        if self.max_recording_seconds > MAX_RECORDING_HARD_LIMIT_SECONDS {
            bail!(
                "--max-recording must not exceed {MAX_RECORDING_HARD_LIMIT_SECONDS} seconds, got {}",
                self.max_recording_seconds
            );
        }
        if self.max_recording_seconds < self.min_recording_seconds {
            bail!(
                "--max-recording ({}) cannot be shorter than --min-recording ({})",
                self.max_recording_seconds,
                self.min_recording_seconds
            );
        }

        match self.vad_engine {
            VadEngineKind::Earshot => {
                #[cfg(not(feature = "vad_earshot"))]
                bail!("--vad-engine earshot requires building with the 'vad_earshot' feature");
                #[cfg(feature = "vad_earshot")]
                {
                    if self.sample_rate != crate::vad_earshot::EARSHOT_SAMPLE_RATE {
                        bail!(
                            "--vad-engine earshot only supports 16000 Hz, got --sample-rate {}",
                            self.sample_rate
                        );
                    }
                    if !matches!(self.vad_frame_ms, 10 | 20 | 30) {
                        bail!(
                            "--vad-frame-ms must be 10, 20 or 30 for earshot, got {}",
                            self.vad_frame_ms
                        );
                    }
                    if self.vad_aggressiveness > 3 {
                        bail!(
                            "--vad-aggressiveness must be between 0 and 3, got {}",
                            self.vad_aggressiveness
                        );
                    }
                }
            }
            VadEngineKind::Energy => {
                if !(-120.0..=0.0).contains(&self.energy_threshold_db) {
                    bail!(
                        "--energy-threshold-db must be between -120.0 and 0.0 dB, got {}",
                        self.energy_threshold_db
                    );
                }
            }
        }
        if !(1..=10).contains(&self.vad_smoothing_frames) {
            bail!(
                "--vad-smoothing-frames must be between 1 and 10, got {}",
                self.vad_smoothing_frames
            );
        }
        if !(8..=1024).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between 8 and 1024, got {}",
                self.channel_capacity
            );
        }
        if self.file_prefix.trim().is_empty() {
            bail!("--file-prefix must not be empty");
        }

        self.validate_wake()?;
        self.validate_transcription()?;

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!(
                "--log-level must be one of {LOG_LEVELS:?}, got '{}'",
                self.log_level
            );
        }
        Ok(())
    }

    fn validate_wake(&mut self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.wake_threshold) {
            bail!(
                "--wake-threshold must be between 0.0 and 1.0, got {}",
                self.wake_threshold
            );
        }
        if !(self.wake_snippet_seconds > 0.0 && self.wake_snippet_seconds <= MAX_SNIPPET_SECONDS) {
            bail!(
                "--wake-snippet-seconds must be in (0, {MAX_SNIPPET_SECONDS}], got {}",
                self.wake_snippet_seconds
            );
        }
        if !self.wake_word {
            return Ok(());
        }
        #[cfg(not(feature = "wake-word"))]
        bail!("--wake-word requires building with the 'wake-word' feature");
        #[cfg(feature = "wake-word")]
        {
            if self.wake_models.is_empty() {
                bail!("--wake-word needs at least one --wake-model");
            }
            for model in self.wake_models.iter_mut() {
                *model = canonical_existing(model, "wake model")?;
            }
            Ok(())
        }
    }

    fn validate_transcription(&mut self) -> Result<()> {
        if self.whisper_beam_size > 10 {
            bail!(
                "--whisper-beam-size must be between 0 and 10, got {}",
                self.whisper_beam_size
            );
        }
        if !(0.0..=5.0).contains(&self.whisper_temperature) {
            bail!(
                "--whisper-temperature must be between 0.0 and 5.0, got {}",
                self.whisper_temperature
            );
        }
        validate_lang(&self.lang)?;
        if !self.transcribe {
            return Ok(());
        }
        #[cfg(not(feature = "whisper"))]
        bail!("--transcribe requires building with the 'whisper' feature");
        #[cfg(feature = "whisper")]
        {
            if self.sample_rate != crate::stt::WHISPER_SAMPLE_RATE {
                bail!(
                    "--transcribe needs --sample-rate {}, got {}",
                    crate::stt::WHISPER_SAMPLE_RATE,
                    self.sample_rate
                );
            }
            let Some(model) = self.whisper_model_path.as_ref() else {
                bail!("--transcribe needs --whisper-model-path");
            };
            self.whisper_model_path = Some(canonical_existing(model, "whisper model")?);
            Ok(())
        }
    }

    /// Snapshot the validated capture settings for the session.
    pub fn capture_config(&self) -> CaptureConfig {
        let snippet_seconds = if self.wake_snippet_dir.is_some() {
            self.wake_snippet_seconds
        } else {
            0.0
        };
        CaptureConfig {
            sample_rate: self.sample_rate,
            frame_length: self.frame_length,
            thresholds: Thresholds {
                voice_threshold: self.voice_threshold,
                silence_limit_seconds: self.silence_limit_seconds,
                inactivity_limit_seconds: self.inactivity_limit_seconds,
                min_recording_length_seconds: self.min_recording_seconds,
                pre_buffer_seconds: self.pre_buffer_seconds,
                max_recording_seconds: self.max_recording_seconds,
            },
            vad_smoothing_frames: self.vad_smoothing_frames,
            rolling_buffer_seconds: self.pre_buffer_seconds.max(snippet_seconds),
            channel_capacity: self.channel_capacity,
            output_dir: self.output_dir.clone(),
            file_prefix: self.file_prefix.trim().to_string(),
            use_wake_word: self.wake_word,
            wake_snippet_dir: self.wake_snippet_dir.clone(),
            wake_snippet_seconds: self.wake_snippet_seconds,
        }
    }
}

fn ensure_positive(value: f64, flag: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{flag} must be a positive number of seconds, got {value}");
    }
    Ok(())
}

pub(super) fn validate_lang(lang: &str) -> Result<()> {
    if lang.trim().is_empty() {
        bail!("--lang must not be empty");
    }
    if lang.eq_ignore_ascii_case("auto") {
        return Ok(());
    }
    if !lang
        .chars()
        .all(|ch| ch.is_ascii_alphabetic() || ch == '-' || ch == '_')
    {
        bail!("--lang must contain only alphabetic characters or '-'/'_' separators");
    }
    // Allow locale-style values but only check the leading ISO-639-1 code.
    let primary = lang
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if !ISO_639_1_CODES.contains(&primary.as_str()) {
        bail!("--lang must start with a valid ISO-639-1 code or be 'auto', got '{lang}'");
    }
    Ok(())
}

#[cfg_attr(not(any(feature = "wake-word", feature = "whisper")), allow(dead_code))]
pub(super) fn canonical_existing(path: &Path, what: &str) -> Result<PathBuf> {
    if !path.exists() {
        bail!("{what} path '{}' does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("failed to canonicalize {what} path '{}'", path.display()))
}
