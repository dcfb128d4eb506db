//! Wake-word gating ahead of the recorder.
//!
//! The keyword spotter is an opaque, stateful engine: it consumes fixed-size
//! frames in strict order and reports a keyword index on a match.
//! [`WakeTrigger`] adapts device frames to the engine's frame length and
//! [`WakeActions`] runs the registered side effects when a keyword fires.

use crate::audio::{AudioFrame, FrameFormat, FrameRechunker};
use crate::error::CaptureError;
use anyhow::Result;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Keyword-spotting engine boundary.
pub trait KeywordEngine {
    fn frame_length(&self) -> usize;
    fn sample_rate(&self) -> u32;

    /// Feed one frame; `Some(index)` when a keyword matched on it.
    fn process(&mut self, samples: &[i16]) -> Result<Option<usize>>;

    /// Human-readable label for a keyword index, used for snippet file names.
    fn keyword_name(&self, index: usize) -> Option<String>;

    fn reset(&mut self);

    fn name(&self) -> &'static str {
        "unknown_wake"
    }
}

/// One keyword detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeEvent {
    pub keyword_index: usize,
    pub keyword: String,
    /// Wall-clock detection time, milliseconds since the Unix epoch.
    pub detected_at_ms: u64,
    /// Frames read from the source before (and including) the triggering one.
    pub frame_index: u64,
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Wraps a [`KeywordEngine`], re-cutting device frames to the engine's size.
pub struct WakeTrigger {
    engine: Box<dyn KeywordEngine>,
    rechunker: FrameRechunker,
}

impl WakeTrigger {
    /// Rejects engines that expect a different sample rate than the capture format.
    pub fn new(
        engine: Box<dyn KeywordEngine>,
        capture_format: FrameFormat,
    ) -> Result<Self, CaptureError> {
        if engine.sample_rate() != capture_format.sample_rate {
            return Err(CaptureError::FormatMismatch {
                engine: engine.name(),
                expected: engine.sample_rate(),
                actual: capture_format.sample_rate,
            });
        }
        let rechunker = FrameRechunker::new(engine.frame_length());
        Ok(Self { engine, rechunker })
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Index of the first keyword matched while consuming `frame`.
    ///
    /// Every completed engine frame is fed even after a match, so the engine
    /// never misses audio.
    pub fn process(&mut self, frame: &AudioFrame) -> Result<Option<usize>, CaptureError> {
        let name = self.engine.name();
        let engine = &mut self.engine;
        let mut matched: Option<usize> = None;
        self.rechunker
            .push(frame.samples(), |chunk| {
                if let Some(index) = engine.process(chunk)? {
                    matched.get_or_insert(index);
                }
                Ok::<(), anyhow::Error>(())
            })
            .map_err(|err| CaptureError::engine(name, err))?;
        Ok(matched)
    }

    pub fn keyword_name(&self, index: usize) -> String {
        self.engine
            .keyword_name(index)
            .unwrap_or_else(|| format!("keyword{index}"))
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.rechunker.clear();
    }
}

/// Side effect run when a keyword fires.
pub type WakeAction = Box<dyn FnMut(&WakeEvent) -> Result<()>>;

/// What happened when the actions ran for one event.
#[derive(Debug, Default)]
pub struct WakeActionReport {
    pub ran: usize,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl WakeActionReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered registry of named wake actions.
///
/// Actions run sequentially in registration order. A failing action does not
/// stop the rest; its error lands in the returned report.
#[derive(Default)]
pub struct WakeActions {
    actions: Vec<(String, WakeAction)>,
}

impl WakeActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        action: impl FnMut(&WakeEvent) -> Result<()> + 'static,
    ) -> &mut Self {
        self.actions.push((name.into(), Box::new(action)));
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|(name, _)| name.as_str())
    }

    pub fn run(&mut self, event: &WakeEvent) -> WakeActionReport {
        let mut report = WakeActionReport::default();
        for (name, action) in self.actions.iter_mut() {
            report.ran += 1;
            if let Err(err) = action(event) {
                tracing::warn!(action = %name, error = %format!("{err:#}"), "wake action failed");
                report.failures.push((name.clone(), err));
            }
        }
        report
    }
}

#[cfg(feature = "wake-word")]
mod rustpotter_engine {
    use super::KeywordEngine;
    use anyhow::{anyhow, Result};
    use rustpotter::{Rustpotter, RustpotterConfig, SampleFormat};
    use std::path::Path;

    /// Keyword spotter backed by rustpotter `.rpw` models.
    pub struct RustpotterEngine {
        detector: Rustpotter,
        keywords: Vec<String>,
        sample_rate: u32,
        scratch: Vec<f32>,
    }

    impl RustpotterEngine {
        /// Load every model in `models`; the keyword name is the file stem.
        pub fn from_models(models: &[&Path], sample_rate: u32, threshold: f32) -> Result<Self> {
            let mut config = RustpotterConfig::default();
            config.fmt.sample_rate = sample_rate as usize;
            config.fmt.channels = 1;
            config.fmt.sample_format = SampleFormat::F32;
            config.detector.threshold = threshold;

            let mut detector = Rustpotter::new(&config)
                .map_err(|e| anyhow!("failed to create rustpotter detector: {e}"))?;
            let mut keywords = Vec::with_capacity(models.len());
            for model in models {
                let keyword = model
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("wakeword")
                    .to_string();
                let path = model
                    .to_str()
                    .ok_or_else(|| anyhow!("wake model path is not valid UTF-8: {}", model.display()))?;
                detector
                    .add_wakeword_from_file(&keyword, path)
                    .map_err(|e| anyhow!("failed to load wake word model {path}: {e}"))?;
                tracing::info!(keyword = %keyword, model = %path, "wake word model loaded");
                keywords.push(keyword);
            }
            Ok(Self {
                detector,
                keywords,
                sample_rate,
                scratch: Vec::new(),
            })
        }
    }

    impl KeywordEngine for RustpotterEngine {
        fn frame_length(&self) -> usize {
            self.detector.get_samples_per_frame()
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn process(&mut self, samples: &[i16]) -> Result<Option<usize>> {
            self.scratch.clear();
            self.scratch
                .extend(samples.iter().map(|s| f32::from(*s) / 32_768.0));
            let Some(detection) = self.detector.process_f32(&self.scratch) else {
                return Ok(None);
            };
            let index = self
                .keywords
                .iter()
                .position(|k| *k == detection.name)
                .ok_or_else(|| anyhow!("rustpotter reported unknown keyword '{}'", detection.name))?;
            tracing::debug!(keyword = %detection.name, score = detection.score, "wake word detected");
            Ok(Some(index))
        }

        fn keyword_name(&self, index: usize) -> Option<String> {
            self.keywords.get(index).cloned()
        }

        fn reset(&mut self) {
            self.detector.reset();
        }

        fn name(&self) -> &'static str {
            "rustpotter"
        }
    }
}

#[cfg(feature = "wake-word")]
pub use rustpotter_engine::RustpotterEngine;
