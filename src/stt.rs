//! Speech-to-text for finished recordings.
//!
//! Transcription sits downstream of capture: it receives the saved WAV file,
//! never live frames. The whisper backend loads its model once and reuses it
//! across captures.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Turns a saved recording into text.
pub trait Transcriber {
    fn transcribe(&mut self, wav_path: &Path) -> Result<String>;

    fn name(&self) -> &'static str {
        "unknown_stt"
    }
}

/// Strip non-speech markers (`[BLANK_AUDIO]`, `(silence)`, ...) and collapse whitespace.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background|wind blowing)\s*)\)",
        )
        .ok()
    });
    let without_markers = match re {
        Some(re) => re.replace_all(trimmed, " ").into_owned(),
        None => trimmed.to_string(),
    };
    without_markers.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Load a WAV file as mono f32 in `[-1, 1]`, returning the samples and the sample rate.
pub fn read_wav_f32(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("failed to decode integer samples")?
        }
    };
    if channels == 1 {
        return Ok((interleaved, spec.sample_rate));
    }
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Whisper only accepts 16 kHz mono input.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

pub fn ensure_whisper_rate(sample_rate: u32) -> Result<()> {
    if sample_rate != WHISPER_SAMPLE_RATE {
        bail!("whisper needs {WHISPER_SAMPLE_RATE} Hz audio, recording is {sample_rate} Hz");
    }
    Ok(())
}

#[cfg(feature = "whisper")]
mod whisper_backend {
    use super::{ensure_whisper_rate, read_wav_f32, Transcriber};
    use anyhow::{Context, Result};
    use std::os::raw::{c_char, c_uint, c_void};
    use std::path::Path;
    use std::sync::Once;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Whisper model context for speech-to-text transcription.
    ///
    /// Holds the loaded GGML model in memory. Create once at startup and reuse
    /// for all transcription requests to avoid repeated model loading.
    pub struct WhisperTranscriber {
        ctx: WhisperContext,
        language: String,
        beam_size: u32,
        temperature: f32,
    }

    impl WhisperTranscriber {
        pub fn new(model_path: &Path, language: &str, beam_size: u32, temperature: f32) -> Result<Self> {
            install_whisper_log_silencer();
            let path = model_path.to_string_lossy();
            let ctx = WhisperContext::new_with_params(&path, WhisperContextParameters::default())
                .with_context(|| format!("failed to load whisper model {path}"))?;
            tracing::info!(model = %path, "whisper model loaded");
            Ok(Self {
                ctx,
                language: language.to_string(),
                beam_size,
                temperature,
            })
        }
    }

    impl Transcriber for WhisperTranscriber {
        fn transcribe(&mut self, wav_path: &Path) -> Result<String> {
            let (samples, sample_rate) = read_wav_f32(wav_path)?;
            ensure_whisper_rate(sample_rate)?;

            let mut state = self
                .ctx
                .create_state()
                .context("failed to create whisper state")?;
            let mut params = if self.beam_size > 1 {
                FullParams::new(SamplingStrategy::BeamSearch {
                    beam_size: self.beam_size as i32,
                    patience: -1.0,
                })
            } else {
                FullParams::new(SamplingStrategy::Greedy { best_of: 1 })
            };
            if self.language.eq_ignore_ascii_case("auto") {
                params.set_language(None);
                params.set_detect_language(true);
            } else {
                params.set_language(Some(&self.language));
                params.set_detect_language(false);
            }
            params.set_temperature(self.temperature);
            // Leave cores for the capture thread.
            params.set_n_threads(num_cpus::get().min(8) as i32);
            params.set_print_progress(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_translate(false);
            params.set_token_timestamps(false);
            state
                .full(params, &samples)
                .context("whisper inference failed")?;

            let mut transcript = String::new();
            let num_segments = state
                .full_n_segments()
                .context("failed to read whisper segment count")?;
            for i in 0..num_segments {
                match state.full_get_segment_text_lossy(i) {
                    Ok(text) => transcript.push_str(&text),
                    Err(err) => tracing::debug!(segment = i, error = %err, "failed to read whisper segment"),
                }
            }
            Ok(transcript)
        }

        fn name(&self) -> &'static str {
            "whisper"
        }
    }

    fn install_whisper_log_silencer() {
        static INSTALL_LOG_CALLBACK: Once = Once::new();
        INSTALL_LOG_CALLBACK.call_once(|| unsafe {
            whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
        });
    }

    unsafe extern "C" fn whisper_log_callback(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
        // whisper.cpp logs straight to stderr otherwise, interleaving with our tracing output.
    }
}

#[cfg(feature = "whisper")]
pub use whisper_backend::WhisperTranscriber;
