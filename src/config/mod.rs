//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use crate::audio::{FrameFormat, Thresholds};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

pub use defaults::{
    default_vad_engine, DEFAULT_CHANNEL_CAPACITY, DEFAULT_ENERGY_THRESHOLD_DB,
    DEFAULT_FILE_PREFIX, DEFAULT_FRAME_LENGTH, DEFAULT_INACTIVITY_LIMIT_SECONDS,
    DEFAULT_LOG_LEVEL, DEFAULT_MAX_RECORDING_SECONDS, DEFAULT_MIN_RECORDING_SECONDS,
    DEFAULT_OUTPUT_DIR, DEFAULT_PRE_BUFFER_SECONDS, DEFAULT_SAMPLE_RATE,
    DEFAULT_SILENCE_LIMIT_SECONDS, DEFAULT_VAD_AGGRESSIVENESS, DEFAULT_VAD_FRAME_MS,
    DEFAULT_VAD_SMOOTHING_FRAMES, DEFAULT_VOICE_THRESHOLD, DEFAULT_WAKE_SNIPPET_SECONDS,
    DEFAULT_WAKE_THRESHOLD,
};

/// CLI options for hark. Validated values keep the capture loop's arithmetic sane.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "hark",
    about = "hark: wake-word triggered, VAD-gated utterance recorder",
    author,
    version
)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long, env = "HARK_INPUT_DEVICE")]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Capture sample rate (Hz)
    #[arg(long = "sample-rate", env = "HARK_SAMPLE_RATE", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Samples per captured frame
    #[arg(long = "frame-length", env = "HARK_FRAME_LENGTH", default_value_t = DEFAULT_FRAME_LENGTH)]
    pub frame_length: usize,

    /// Voice probability a frame must exceed to count as speech (0.0-1.0)
    #[arg(long = "voice-threshold", env = "HARK_VOICE_THRESHOLD", default_value_t = DEFAULT_VOICE_THRESHOLD)]
    pub voice_threshold: f32,

    /// Trailing silence that ends a recording (seconds)
    #[arg(long = "silence-limit", env = "HARK_SILENCE_LIMIT", default_value_t = DEFAULT_SILENCE_LIMIT_SECONDS)]
    pub silence_limit_seconds: f64,

    /// Silence tolerated before any voice is heard (seconds)
    #[arg(long = "inactivity-limit", env = "HARK_INACTIVITY_LIMIT", default_value_t = DEFAULT_INACTIVITY_LIMIT_SECONDS)]
    pub inactivity_limit_seconds: f64,

    /// Recordings shorter than this are discarded (seconds)
    #[arg(long = "min-recording", env = "HARK_MIN_RECORDING", default_value_t = DEFAULT_MIN_RECORDING_SECONDS)]
    pub min_recording_seconds: f64,

    /// Audio kept from before the voice onset (seconds)
    #[arg(long = "pre-buffer", env = "HARK_PRE_BUFFER", default_value_t = DEFAULT_PRE_BUFFER_SECONDS)]
    pub pre_buffer_seconds: f64,

    /// Hard stop for a recording that never falls silent (seconds)
    #[arg(long = "max-recording", env = "HARK_MAX_RECORDING", default_value_t = DEFAULT_MAX_RECORDING_SECONDS)]
    pub max_recording_seconds: f64,

    /// Voice activity detector implementation to use
    #[arg(long = "vad-engine", env = "HARK_VAD_ENGINE", value_enum, default_value_t = default_vad_engine())]
    pub vad_engine: VadEngineKind,

    /// Earshot frame size (10, 20 or 30 ms)
    #[arg(long = "vad-frame-ms", default_value_t = DEFAULT_VAD_FRAME_MS)]
    pub vad_frame_ms: u32,

    /// Earshot aggressiveness (0 = permissive .. 3 = aggressive)
    #[arg(long = "vad-aggressiveness", default_value_t = DEFAULT_VAD_AGGRESSIVENESS)]
    pub vad_aggressiveness: u8,

    /// Energy VAD threshold (decibels)
    #[arg(long = "energy-threshold-db", allow_negative_numbers = true, default_value_t = DEFAULT_ENERGY_THRESHOLD_DB)]
    pub energy_threshold_db: f32,

    /// Majority-vote window over VAD decisions (frames, 1 disables)
    #[arg(long = "vad-smoothing-frames", default_value_t = DEFAULT_VAD_SMOOTHING_FRAMES)]
    pub vad_smoothing_frames: usize,

    /// Blocks buffered between the audio callback and the capture loop
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Directory for saved recordings
    #[arg(long = "output-dir", env = "HARK_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// File name prefix for saved recordings
    #[arg(long = "file-prefix", default_value = DEFAULT_FILE_PREFIX)]
    pub file_prefix: String,

    /// Wait for a wake word before each recording
    #[arg(long = "wake-word", env = "HARK_WAKE_WORD", default_value_t = false)]
    pub wake_word: bool,

    /// Wake word model file (.rpw, repeatable)
    #[arg(long = "wake-model", env = "HARK_WAKE_MODEL", action = ArgAction::Append, value_name = "PATH")]
    pub wake_models: Vec<PathBuf>,

    /// Wake word detection threshold (0.0-1.0)
    #[arg(long = "wake-threshold", default_value_t = DEFAULT_WAKE_THRESHOLD)]
    pub wake_threshold: f32,

    /// Save the audio around each wake detection into this directory
    #[arg(long = "wake-snippet-dir", env = "HARK_WAKE_SNIPPET_DIR")]
    pub wake_snippet_dir: Option<PathBuf>,

    /// Length of saved wake snippets (seconds)
    #[arg(long = "wake-snippet-seconds", default_value_t = DEFAULT_WAKE_SNIPPET_SECONDS)]
    pub wake_snippet_seconds: f64,

    /// Ring the terminal bell when the wake word fires
    #[arg(long = "wake-sound", default_value_t = false)]
    pub wake_sound: bool,

    /// Transcribe each saved recording with whisper
    #[arg(long = "transcribe", default_value_t = false)]
    pub transcribe: bool,

    /// Whisper model path (required with --transcribe)
    #[arg(long = "whisper-model-path", env = "HARK_WHISPER_MODEL")]
    pub whisper_model_path: Option<PathBuf>,

    /// Whisper beam size (>1 enables beam search)
    #[arg(long = "whisper-beam-size", default_value_t = 0)]
    pub whisper_beam_size: u32,

    /// Whisper temperature
    #[arg(long = "whisper-temperature", default_value_t = 0.0)]
    pub whisper_temperature: f32,

    /// Language passed to Whisper
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Stop after one capture
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Print one JSON object per capture on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", env = "HARK_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Write JSON logs to this file instead of stderr
    #[arg(long = "log-file", env = "HARK_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable all logging (overrides --log-level and --log-file)
    #[arg(long = "no-logs", env = "HARK_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

/// Immutable settings for one capture session, derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub frame_length: usize,
    pub thresholds: Thresholds,
    pub vad_smoothing_frames: usize,
    /// Seconds kept by the source's rolling buffer (pre-roll or snippet, whichever is longer).
    pub rolling_buffer_seconds: f64,
    pub channel_capacity: usize,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub use_wake_word: bool,
    pub wake_snippet_dir: Option<PathBuf>,
    pub wake_snippet_seconds: f64,
}

impl CaptureConfig {
    pub fn format(&self) -> FrameFormat {
        FrameFormat::new(self.sample_rate, self.frame_length)
    }
}

/// Available runtime-selectable VAD implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VadEngineKind {
    Earshot,
    Energy,
}

impl VadEngineKind {
    pub fn label(self) -> &'static str {
        match self {
            VadEngineKind::Earshot => "earshot",
            VadEngineKind::Energy => "energy",
        }
    }
}
