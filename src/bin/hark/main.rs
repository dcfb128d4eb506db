//! hark entrypoint: wait for a wake word (optional), record one utterance
//! gated by voice activity, save it as WAV and optionally transcribe it.
//!
//! The capture loop runs on the main thread; Ctrl-C flips a cancel token the
//! loop checks between frames.

mod cli_utils;
mod engines;

use anyhow::{Context, Result};
use hark::audio::AudioSource;
use hark::config::AppConfig;
use hark::error::{AudioError, CaptureError};
use hark::session::{CancelToken, RecordingSession, SnippetOptions};
use hark::telemetry::init_tracing;
use hark::wav::WavSink;
use std::process::ExitCode;

use crate::cli_utils::{list_input_devices, print_capture};
use crate::engines::{build_transcriber, build_vad, build_wake_actions, build_wake_engine};

/// Consecutive failed WAV writes tolerated before giving up.
const MAX_WRITE_FAILURES: u32 = 3;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "hark exited with an error");
            eprintln!("hark: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        return list_input_devices();
    }
    init_tracing(&config);

    let capture = config.capture_config();
    let format = capture.format();
    let source = AudioSource::microphone(
        config.input_device.as_deref(),
        format,
        capture.channel_capacity,
        capture.rolling_buffer_seconds,
    );
    let sink = WavSink::new(&capture.output_dir, &capture.file_prefix, capture.sample_rate);
    let vad = build_vad(&config, format)?;

    let mut session = RecordingSession::new(
        source,
        vad,
        capture.thresholds,
        capture.vad_smoothing_frames,
        sink,
    )?;
    if let Some(engine) = build_wake_engine(&config)? {
        session = session.with_wake_trigger(engine)?;
        session = session.with_actions(build_wake_actions(&config));
    }
    if let Some(dir) = capture.wake_snippet_dir.clone() {
        session = session.with_snippets(SnippetOptions {
            dir,
            seconds: capture.wake_snippet_seconds,
        });
    }
    if let Some(transcriber) = build_transcriber(&config)? {
        session = session.with_transcriber(transcriber);
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl-C handler")?;

    tracing::info!(
        device = %session.source().device_name(),
        sample_rate = format.sample_rate,
        frame_length = format.frame_length,
        wake_word = capture.use_wake_word,
        output_dir = %capture.output_dir.display(),
        "hark ready"
    );

    let mut write_failures = 0u32;
    loop {
        let completed = match session.capture_utterance(capture.use_wake_word, &cancel) {
            Ok(completed) => {
                write_failures = 0;
                completed
            }
            Err(err @ CaptureError::WavWrite { .. }) => {
                write_failures += 1;
                if write_failures >= MAX_WRITE_FAILURES {
                    return Err(err.into());
                }
                tracing::warn!(error = %err, attempt = write_failures, "recording not saved; retrying");
                continue;
            }
            Err(CaptureError::Audio(AudioError::StreamClosed)) if cancel.is_cancelled() => break,
            Err(err) => return Err(err.into()),
        };

        let transcript = match session.transcribe(&completed) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "transcription failed");
                None
            }
        };
        print_capture(&completed, transcript.as_deref(), config.json)?;

        if config.once || cancel.is_cancelled() {
            break;
        }
    }

    let snippets = session.join_snippets();
    if !snippets.is_empty() {
        tracing::info!(count = snippets.len(), "wake snippets written");
    }
    session.close();
    Ok(())
}
