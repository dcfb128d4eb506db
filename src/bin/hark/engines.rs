//! Builds the engines selected on the command line.

use anyhow::Result;
use hark::audio::{EnergyVad, FrameFormat, VoiceActivityEngine};
use hark::config::{AppConfig, VadEngineKind};
use hark::stt::Transcriber;
use hark::wake::{KeywordEngine, WakeActions};
use std::io::Write;

pub(crate) fn build_vad(config: &AppConfig, format: FrameFormat) -> Result<Box<dyn VoiceActivityEngine>> {
    let engine: Box<dyn VoiceActivityEngine> = match config.vad_engine {
        #[cfg(feature = "vad_earshot")]
        VadEngineKind::Earshot => Box::new(hark::vad_earshot::EarshotVad::new(
            config.vad_frame_ms,
            config.vad_aggressiveness,
        )?),
        #[cfg(not(feature = "vad_earshot"))]
        VadEngineKind::Earshot => {
            anyhow::bail!("--vad-engine earshot requires building with the 'vad_earshot' feature")
        }
        VadEngineKind::Energy => Box::new(EnergyVad::new(config.energy_threshold_db, format)),
    };
    tracing::info!(engine = engine.name(), "voice activity detector ready");
    Ok(engine)
}

#[cfg(feature = "wake-word")]
pub(crate) fn build_wake_engine(config: &AppConfig) -> Result<Option<Box<dyn KeywordEngine>>> {
    if !config.wake_word {
        return Ok(None);
    }
    let models: Vec<&std::path::Path> = config.wake_models.iter().map(|p| p.as_path()).collect();
    let engine = hark::wake::RustpotterEngine::from_models(
        &models,
        config.sample_rate,
        config.wake_threshold,
    )?;
    Ok(Some(Box::new(engine)))
}

#[cfg(not(feature = "wake-word"))]
pub(crate) fn build_wake_engine(config: &AppConfig) -> Result<Option<Box<dyn KeywordEngine>>> {
    if config.wake_word {
        anyhow::bail!("--wake-word requires building with the 'wake-word' feature");
    }
    Ok(None)
}

pub(crate) fn build_wake_actions(config: &AppConfig) -> WakeActions {
    let mut actions = WakeActions::new();
    if config.wake_sound {
        actions.register("bell", |_event| {
            let mut stderr = std::io::stderr();
            stderr.write_all(b"\x07")?;
            stderr.flush()?;
            Ok(())
        });
    }
    actions.register("log", |event| {
        tracing::debug!(keyword = %event.keyword, at_ms = event.detected_at_ms, "wake action fired");
        Ok(())
    });
    actions
}

#[cfg(feature = "whisper")]
pub(crate) fn build_transcriber(config: &AppConfig) -> Result<Option<Box<dyn Transcriber>>> {
    if !config.transcribe {
        return Ok(None);
    }
    let Some(model) = config.whisper_model_path.as_deref() else {
        anyhow::bail!("--transcribe needs --whisper-model-path");
    };
    let transcriber = hark::stt::WhisperTranscriber::new(
        model,
        &config.lang,
        config.whisper_beam_size,
        config.whisper_temperature,
    )?;
    Ok(Some(Box::new(transcriber)))
}

#[cfg(not(feature = "whisper"))]
pub(crate) fn build_transcriber(config: &AppConfig) -> Result<Option<Box<dyn Transcriber>>> {
    if config.transcribe {
        anyhow::bail!("--transcribe requires building with the 'whisper' feature");
    }
    Ok(None)
}
