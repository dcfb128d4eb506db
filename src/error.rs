//! Typed failures surfaced by the capture pipeline.
//!
//! Discard outcomes (too short, no voice, cancelled) are not errors and never
//! appear here; see [`crate::audio::DiscardReason`].

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by an [`crate::audio::AudioSource`].
#[derive(Debug, Error)]
pub enum AudioError {
    /// The OS refused to open (or lost) the input stream.
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),

    /// `next_frame` was called on a source that is closed.
    #[error("audio stream is closed")]
    StreamClosed,

    /// The consumer fell behind and the driver side had to drop frames.
    ///
    /// Recoverable: log it and keep reading.
    #[error("audio buffer overrun, {dropped} frame(s) dropped")]
    Overflow { dropped: usize },
}

impl AudioError {
    /// True when the caller may simply continue reading.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AudioError::Overflow { .. })
    }
}

/// Boxed engine failure so `anyhow` errors from engine adapters keep their chain.
pub type EngineFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Hard failures of a single `capture_utterance` attempt.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// The wake-word or VAD engine failed; its internal state can no longer be trusted.
    #[error("{engine} engine failed: {source}")]
    Engine {
        engine: &'static str,
        #[source]
        source: EngineFailure,
    },

    #[error("wake-word capture requested but no wake trigger is configured")]
    WakeTriggerMissing,

    /// An engine expects a different sample rate than the audio source delivers.
    #[error("{engine} expects {expected} Hz audio but the source delivers {actual} Hz")]
    FormatMismatch {
        engine: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("failed to write recording to {}: {source}", path.display())]
    WavWrite {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

impl CaptureError {
    pub(crate) fn engine(engine: &'static str, err: anyhow::Error) -> Self {
        CaptureError::Engine {
            engine,
            source: err.into(),
        }
    }
}
