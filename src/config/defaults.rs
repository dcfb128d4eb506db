use super::VadEngineKind;

pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
/// 20 ms at 16 kHz.
pub const DEFAULT_FRAME_LENGTH: usize = 320;
pub const DEFAULT_VOICE_THRESHOLD: f32 = 0.8;
pub const DEFAULT_SILENCE_LIMIT_SECONDS: f64 = 2.0;
pub const DEFAULT_INACTIVITY_LIMIT_SECONDS: f64 = 2.0;
pub const DEFAULT_MIN_RECORDING_SECONDS: f64 = 3.0;
pub const DEFAULT_PRE_BUFFER_SECONDS: f64 = 2.0;
pub const DEFAULT_MAX_RECORDING_SECONDS: f64 = 60.0;
pub const DEFAULT_VAD_FRAME_MS: u32 = 20;
pub const DEFAULT_VAD_AGGRESSIVENESS: u8 = 2;
pub const DEFAULT_ENERGY_THRESHOLD_DB: f32 = -55.0;
pub const DEFAULT_VAD_SMOOTHING_FRAMES: usize = 1;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_OUTPUT_DIR: &str = "recordings";
pub const DEFAULT_FILE_PREFIX: &str = "utterance";
pub const DEFAULT_WAKE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_WAKE_SNIPPET_SECONDS: f64 = 2.0;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub(super) const MIN_SAMPLE_RATE: u32 = 8_000;
pub(super) const MAX_SAMPLE_RATE: u32 = 48_000;
pub(super) const MIN_FRAME_LENGTH: usize = 64;
pub(super) const MAX_FRAME_LENGTH: usize = 4_096;
pub(super) const MAX_PRE_BUFFER_SECONDS: f64 = 30.0;
pub(super) const MAX_RECORDING_HARD_LIMIT_SECONDS: f64 = 600.0;
pub(super) const MAX_SNIPPET_SECONDS: f64 = 30.0;
pub(super) const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
pub(super) const ISO_639_1_CODES: &[&str] = &[
    "af", "am", "ar", "az", "be", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es",
    "et", "eu", "fa", "fi", "fil", "fr", "ga", "gl", "gu", "he", "hi", "hr", "hu", "hy", "id",
    "is", "it", "ja", "jv", "ka", "kk", "km", "kn", "ko", "lo", "lt", "lv", "mk", "ml", "mn", "mr",
    "ms", "my", "ne", "nl", "no", "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "sv",
    "sw", "ta", "te", "th", "tr", "uk", "ur", "vi", "zh",
];

pub const fn default_vad_engine() -> VadEngineKind {
    #[cfg(feature = "vad_earshot")]
    {
        VadEngineKind::Earshot
    }
    #[cfg(not(feature = "vad_earshot"))]
    {
        VadEngineKind::Energy
    }
}
