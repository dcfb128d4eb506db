use super::validation::{canonical_existing, validate_lang};
use super::{default_vad_engine, AppConfig, VadEngineKind};
use crate::audio::Thresholds;
use clap::Parser;
use std::path::Path;

fn energy_config(extra: &[&str]) -> AppConfig {
    let mut args = vec!["test-app", "--vad-engine", "energy"];
    args.extend_from_slice(extra);
    AppConfig::parse_from(args)
}

#[test]
fn accepts_valid_defaults() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn defaults_match_documented_thresholds() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    cfg.validate().expect("defaults should be valid");
    let capture = cfg.capture_config();
    assert_eq!(capture.thresholds, Thresholds::default());
    assert_eq!(capture.sample_rate, 16_000);
    assert_eq!(capture.frame_length, 320);
    assert_eq!(capture.vad_smoothing_frames, 1);
    assert!(!capture.use_wake_word);
}

#[test]
fn rejects_sample_rate_out_of_bounds() {
    let mut cfg = energy_config(&["--sample-rate", "4000"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--sample-rate", "96000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_sample_rate_bounds_with_energy_vad() {
    let mut cfg = energy_config(&["--sample-rate", "8000"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = energy_config(&["--sample-rate", "48000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_frame_length_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--frame-length", "32"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--frame-length", "8192"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_voice_threshold_outside_unit_interval() {
    let mut cfg = AppConfig::parse_from(["test-app", "--voice-threshold", "1.0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--voice-threshold=-0.1"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--voice-threshold", "0.0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_non_positive_limits() {
    for flag in ["--silence-limit", "--inactivity-limit", "--max-recording"] {
        let mut cfg = AppConfig::parse_from(["test-app", flag, "0"]);
        assert!(cfg.validate().is_err(), "{flag} 0 should be rejected");
    }
    let mut cfg = AppConfig::parse_from(["test-app", "--min-recording=-1"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_pre_buffer_above_limit() {
    let mut cfg = AppConfig::parse_from(["test-app", "--pre-buffer", "31"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--pre-buffer", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_max_recording_shorter_than_minimum() {
    let mut cfg =
        AppConfig::parse_from(["test-app", "--min-recording", "5", "--max-recording", "4"]);
    assert!(cfg.validate().is_err());
    let mut cfg =
        AppConfig::parse_from(["test-app", "--min-recording", "5", "--max-recording", "5"]);
    assert!(cfg.validate().is_ok());
}

#[cfg(feature = "vad_earshot")]
#[test]
fn earshot_requires_16khz_and_supported_frame_size() {
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-engine", "earshot", "--sample-rate", "8000"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-engine", "earshot", "--vad-frame-ms", "25"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-engine", "earshot", "--vad-frame-ms", "30"]);
    assert!(cfg.validate().is_ok());
}

#[cfg(not(feature = "vad_earshot"))]
#[test]
fn earshot_is_rejected_without_feature() {
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-engine", "earshot"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_energy_threshold_out_of_bounds() {
    let mut cfg = energy_config(&["--energy-threshold-db", "3"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--energy-threshold-db", "-40"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_vad_smoothing_frames_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-smoothing-frames", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-smoothing-frames", "11"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_channel_capacity_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--channel-capacity", "4"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--channel-capacity", "2048"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_blank_file_prefix() {
    let mut cfg = AppConfig::parse_from(["test-app", "--file-prefix", "  "]);
    assert!(cfg.validate().is_err());
}

#[cfg(not(feature = "wake-word"))]
#[test]
fn wake_word_requires_feature() {
    let mut cfg = AppConfig::parse_from(["test-app", "--wake-word", "--wake-model", "hey.rpw"]);
    assert!(cfg.validate().is_err());
}

#[cfg(feature = "wake-word")]
#[test]
fn wake_word_requires_an_existing_model() {
    let mut cfg = AppConfig::parse_from(["test-app", "--wake-word"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--wake-word", "--wake-model", "/no/such/model.rpw"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_wake_snippet_seconds_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--wake-snippet-seconds", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--wake-snippet-seconds", "45"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rolling_buffer_covers_snippets_only_when_enabled() {
    let mut cfg = AppConfig::parse_from(["test-app", "--pre-buffer", "1", "--wake-snippet-seconds", "4"]);
    cfg.validate().unwrap();
    assert_eq!(cfg.capture_config().rolling_buffer_seconds, 1.0);

    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--pre-buffer",
        "1",
        "--wake-snippet-seconds",
        "4",
        "--wake-snippet-dir",
        "snippets",
    ]);
    cfg.validate().unwrap();
    assert_eq!(cfg.capture_config().rolling_buffer_seconds, 4.0);
}

#[cfg(not(feature = "whisper"))]
#[test]
fn transcription_requires_feature() {
    let mut cfg = AppConfig::parse_from(["test-app", "--transcribe"]);
    assert!(cfg.validate().is_err());
}

#[cfg(feature = "whisper")]
#[test]
fn transcription_requires_model_path() {
    let mut cfg = AppConfig::parse_from(["test-app", "--transcribe"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_whisper_beam_size_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--whisper-beam-size", "11"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_whisper_temperature_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--whisper-temperature=-1.0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--whisper-temperature", "6.0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn language_codes_are_checked() {
    assert!(validate_lang("en").is_ok());
    assert!(validate_lang("en-US").is_ok());
    assert!(validate_lang("pt_BR").is_ok());
    assert!(validate_lang("auto").is_ok());
    assert!(validate_lang("en$").is_err());
    assert!(validate_lang("zz-ZZ").is_err());
    assert!(validate_lang(" ").is_err());
}

#[test]
fn rejects_unknown_log_level() {
    let mut cfg = AppConfig::parse_from(["test-app", "--log-level", "chatty"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--log-level", "DEBUG"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn canonical_existing_rejects_missing_paths() {
    assert!(canonical_existing(Path::new("/no/such/file.bin"), "model").is_err());
    let dir = tempfile::tempdir().unwrap();
    let resolved = canonical_existing(dir.path(), "model").unwrap();
    assert!(resolved.is_absolute());
}

#[test]
fn vad_engine_labels_are_stable() {
    assert_eq!(VadEngineKind::Earshot.label(), "earshot");
    assert_eq!(VadEngineKind::Energy.label(), "energy");
}

#[test]
fn vad_engine_default_matches_feature() {
    let cfg = AppConfig::parse_from(["test-app"]);
    assert_eq!(cfg.vad_engine, default_vad_engine());
}

#[test]
fn capture_config_copies_thresholds() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--voice-threshold",
        "0.6",
        "--silence-limit",
        "1.5",
        "--inactivity-limit",
        "4",
        "--min-recording",
        "0.5",
        "--max-recording",
        "20",
    ]);
    cfg.validate().unwrap();
    let thresholds = cfg.capture_config().thresholds;
    assert_eq!(thresholds.voice_threshold, 0.6);
    assert_eq!(thresholds.silence_limit_seconds, 1.5);
    assert_eq!(thresholds.inactivity_limit_seconds, 4.0);
    assert_eq!(thresholds.min_recording_length_seconds, 0.5);
    assert_eq!(thresholds.max_recording_seconds, 20.0);
}
