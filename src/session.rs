//! Orchestrates one utterance capture: source, wake trigger, VAD gate,
//! recorder and WAV output.

use crate::audio::{
    AudioFrame, AudioSource, CaptureOutcome, DiscardReason, FinalizeReason, RecordingStateMachine,
    Thresholds, VoiceActivityEngine, VoiceActivityGate,
};
use crate::error::{AudioError, CaptureError};
use crate::stt::{sanitize_transcript, Transcriber};
use crate::wake::{unix_millis, KeywordEngine, WakeActions, WakeEvent, WakeTrigger};
use crate::wav::{spawn_snippet_writer, WavSink};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long one pull waits before re-checking the cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Caller-owned stop request, checked once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can guard the next capture.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counters for one `capture_utterance` call, logged as `capture_metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureMetrics {
    /// Frames read from the source, wake wait included.
    pub frames_processed: u64,
    pub voice_frames: u64,
    /// Frames in the finalized recording (kept or discarded for length).
    pub recording_frames: usize,
    pub overflow_events: u32,
    pub dropped_frames: usize,
    pub capture_ms: u64,
    pub finalize_reason: Option<FinalizeReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordingArtifact {
    Saved { path: PathBuf, length_secs: f64 },
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedRecording {
    pub artifact: RecordingArtifact,
    pub metrics: CaptureMetrics,
    pub wake: Option<WakeEvent>,
}

impl CompletedRecording {
    pub fn saved_path(&self) -> Option<&PathBuf> {
        match &self.artifact {
            RecordingArtifact::Saved { path, .. } => Some(path),
            RecordingArtifact::Discarded(_) => None,
        }
    }
}

/// Where and how much audio to keep when a keyword fires.
#[derive(Debug, Clone)]
pub struct SnippetOptions {
    pub dir: PathBuf,
    pub seconds: f64,
}

/// Blocking capture front-end. Owns the source and every engine; drive it
/// from one dedicated thread.
pub struct RecordingSession {
    source: AudioSource,
    gate: VoiceActivityGate,
    machine: RecordingStateMachine,
    wake: Option<WakeTrigger>,
    actions: WakeActions,
    sink: WavSink,
    snippets: Option<SnippetOptions>,
    pending_snippets: Vec<JoinHandle<Option<PathBuf>>>,
    transcriber: Option<Box<dyn Transcriber>>,
}

impl RecordingSession {
    pub fn new(
        source: AudioSource,
        vad: Box<dyn VoiceActivityEngine>,
        thresholds: Thresholds,
        vad_smoothing_frames: usize,
        sink: WavSink,
    ) -> Result<Self, CaptureError> {
        let format = source.format();
        let gate = VoiceActivityGate::new(
            vad,
            thresholds.voice_threshold,
            format,
            vad_smoothing_frames,
        )?;
        Ok(Self {
            source,
            gate,
            machine: RecordingStateMachine::new(format, thresholds),
            wake: None,
            actions: WakeActions::new(),
            sink,
            snippets: None,
            pending_snippets: Vec::new(),
            transcriber: None,
        })
    }

    pub fn with_wake_trigger(mut self, engine: Box<dyn KeywordEngine>) -> Result<Self, CaptureError> {
        self.wake = Some(WakeTrigger::new(engine, self.source.format())?);
        Ok(self)
    }

    pub fn with_actions(mut self, actions: WakeActions) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_snippets(mut self, options: SnippetOptions) -> Self {
        self.snippets = Some(options);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn has_wake_trigger(&self) -> bool {
        self.wake.is_some()
    }

    /// Capture one utterance.
    ///
    /// Discards (too short, no voice, cancelled before voice) come back as
    /// `Ok` with [`RecordingArtifact::Discarded`]. Device and engine failures
    /// close the source and return `Err`; a failed WAV write leaves it open
    /// so the next call can simply retry.
    pub fn capture_utterance(
        &mut self,
        use_wake_word: bool,
        cancel: &CancelToken,
    ) -> Result<CompletedRecording, CaptureError> {
        if use_wake_word && self.wake.is_none() {
            return Err(CaptureError::WakeTriggerMissing);
        }
        let started = Instant::now();
        let mut metrics = CaptureMetrics::default();
        self.reap_finished_snippets();

        self.source.open()?;
        let stale = self.source.discard_pending();
        self.gate.reset();
        self.machine.reset();
        if let Some(trigger) = self.wake.as_mut() {
            trigger.reset();
        }
        tracing::debug!(
            use_wake_word,
            stale_frames = stale,
            device = %self.source.device_name(),
            "capture started"
        );

        let (outcome, wake) = match self.run(use_wake_word, cancel, &mut metrics) {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "capture failed; releasing audio source");
                self.machine.reset();
                self.source.close();
                return Err(err);
            }
        };

        let artifact = match outcome {
            CaptureOutcome::Recorded(recording) => {
                metrics.recording_frames = recording.frames.len();
                metrics.finalize_reason = Some(recording.reason);
                let path = self.sink.write_frames(&recording.frames).map_err(|err| {
                    tracing::error!(error = %err, "failed to write recording");
                    err
                })?;
                tracing::info!(path = %path.display(), length_secs = recording.length_secs, "recording saved");
                RecordingArtifact::Saved {
                    path,
                    length_secs: recording.length_secs,
                }
            }
            CaptureOutcome::Discarded(reason) => {
                if let DiscardReason::UnderMinLength { frames, .. } = reason {
                    metrics.recording_frames = frames;
                }
                tracing::info!(reason = reason.label(), "recording discarded");
                RecordingArtifact::Discarded(reason)
            }
        };

        metrics.capture_ms = started.elapsed().as_millis() as u64;
        log_capture_metrics(&metrics, &artifact);
        Ok(CompletedRecording {
            artifact,
            metrics,
            wake,
        })
    }

    fn run(
        &mut self,
        use_wake_word: bool,
        cancel: &CancelToken,
        metrics: &mut CaptureMetrics,
    ) -> Result<(CaptureOutcome, Option<WakeEvent>), CaptureError> {
        let wake = if use_wake_word {
            match self.wait_for_wake(cancel, metrics)? {
                Some(event) => Some(event),
                None => return Ok((self.machine.cancel(), None)),
            }
        } else {
            None
        };
        let outcome = self.record(cancel, metrics)?;
        Ok((outcome, wake))
    }

    fn wait_for_wake(
        &mut self,
        cancel: &CancelToken,
        metrics: &mut CaptureMetrics,
    ) -> Result<Option<WakeEvent>, CaptureError> {
        let trigger = self.wake.as_mut().ok_or(CaptureError::WakeTriggerMissing)?;
        loop {
            if cancel.is_cancelled() {
                tracing::debug!("cancelled while waiting for wake word");
                return Ok(None);
            }
            let Some(frame) = pull_frame(&mut self.source, metrics)? else {
                continue;
            };
            let Some(index) = trigger.process(&frame)? else {
                continue;
            };
            let event = WakeEvent {
                keyword_index: index,
                keyword: trigger.keyword_name(index),
                detected_at_ms: unix_millis(),
                frame_index: self.source.frames_read(),
            };
            tracing::info!(keyword = %event.keyword, frame = event.frame_index, "wake word detected");

            let report = self.actions.run(&event);
            if !report.is_ok() {
                tracing::warn!(
                    failed = report.failures.len(),
                    ran = report.ran,
                    "some wake actions failed"
                );
            }
            if let Some(options) = &self.snippets {
                let format = self.source.format();
                let max_samples = (options.seconds * f64::from(format.sample_rate)).round() as usize;
                let samples = self.source.rolling_buffer().tail_samples(max_samples);
                self.pending_snippets.push(spawn_snippet_writer(
                    options.dir.clone(),
                    event.keyword.clone(),
                    samples,
                    format.sample_rate,
                ));
                self.reap_finished_snippets();
            }
            return Ok(Some(event));
        }
    }

    fn record(
        &mut self,
        cancel: &CancelToken,
        metrics: &mut CaptureMetrics,
    ) -> Result<CaptureOutcome, CaptureError> {
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(state = self.machine.state().label(), "capture cancelled");
                return Ok(self.machine.cancel());
            }
            let Some(frame) = pull_frame(&mut self.source, metrics)? else {
                continue;
            };
            let is_voice = self.gate.is_voice(&frame)?;
            if is_voice {
                metrics.voice_frames += 1;
            }
            if let Some(outcome) = self.machine.process_frame(frame, is_voice) {
                return Ok(outcome);
            }
        }
    }

    /// Run the configured transcriber on a saved recording.
    ///
    /// `Ok(None)` when nothing was saved or no transcriber is configured.
    pub fn transcribe(&mut self, completed: &CompletedRecording) -> anyhow::Result<Option<String>> {
        let (Some(transcriber), Some(path)) = (self.transcriber.as_mut(), completed.saved_path())
        else {
            return Ok(None);
        };
        let started = Instant::now();
        let raw = transcriber.transcribe(path)?;
        let text = sanitize_transcript(&raw);
        tracing::info!(
            engine = transcriber.name(),
            stt_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "transcription finished"
        );
        Ok(Some(text))
    }

    /// Wait for the snippet writes still pending; returns the files they wrote.
    ///
    /// Writers that finished earlier are joined during later captures and
    /// only show up in the log.
    pub fn join_snippets(&mut self) -> Vec<PathBuf> {
        self.pending_snippets
            .drain(..)
            .filter_map(finish_snippet)
            .collect()
    }

    /// Join the snippet writers that already exited; running ones stay pending.
    fn reap_finished_snippets(&mut self) -> usize {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_snippets)
            .into_iter()
            .partition(|handle| handle.is_finished());
        self.pending_snippets = running;
        let reaped = finished.len();
        for handle in finished {
            if let Some(path) = finish_snippet(handle) {
                tracing::debug!(path = %path.display(), "snippet writer joined");
            }
        }
        reaped
    }

    /// Release the audio device. A later capture reopens it.
    pub fn close(&mut self) {
        self.source.close();
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.source.close();
        self.join_snippets();
    }
}

fn finish_snippet(handle: JoinHandle<Option<PathBuf>>) -> Option<PathBuf> {
    match handle.join() {
        Ok(path) => path,
        Err(_) => {
            tracing::error!("wake snippet writer panicked");
            None
        }
    }
}

/// One poll of the source. Overflow is logged and counted, never fatal.
fn pull_frame(
    source: &mut AudioSource,
    metrics: &mut CaptureMetrics,
) -> Result<Option<AudioFrame>, CaptureError> {
    match source.poll_frame(POLL_INTERVAL) {
        Ok(Some(frame)) => {
            metrics.frames_processed += 1;
            Ok(Some(frame))
        }
        Ok(None) => Ok(None),
        Err(AudioError::Overflow { dropped }) => {
            metrics.overflow_events += 1;
            metrics.dropped_frames += dropped;
            tracing::warn!(dropped, "audio overflow; continuing with a gap");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn log_capture_metrics(metrics: &CaptureMetrics, artifact: &RecordingArtifact) {
    let outcome = match artifact {
        RecordingArtifact::Saved { .. } => "saved",
        RecordingArtifact::Discarded(reason) => reason.label(),
    };
    tracing::info!(
        target: "capture_metrics",
        outcome,
        frames_processed = metrics.frames_processed,
        voice_frames = metrics.voice_frames,
        recording_frames = metrics.recording_frames,
        overflow_events = metrics.overflow_events,
        dropped_frames = metrics.dropped_frames,
        capture_ms = metrics.capture_ms,
        finalize_reason = metrics.finalize_reason.map(|r| r.label()).unwrap_or("none"),
        "capture_metrics"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFrame, FrameFormat};
    use crate::testing::{
        loud, marker, quiet, ScriptedDevice, ScriptedKeywords, ScriptedVad, Step,
    };
    use std::cell::Cell;
    use std::rc::Rc;

    fn format() -> FrameFormat {
        FrameFormat::new(16_000, 320)
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            voice_threshold: 0.5,
            silence_limit_seconds: 0.1,
            inactivity_limit_seconds: 1.0,
            min_recording_length_seconds: 0.2,
            pre_buffer_seconds: 0.07,
            max_recording_seconds: 10.0,
        }
    }

    fn frames(spec: &[(usize, fn(FrameFormat) -> AudioFrame)]) -> Vec<AudioFrame> {
        spec.iter()
            .flat_map(|(count, make)| (0..*count).map(move |_| make(format())))
            .collect()
    }

    fn session_with(device: ScriptedDevice, dir: &std::path::Path) -> RecordingSession {
        let source = AudioSource::new(Box::new(device), format(), 50);
        RecordingSession::new(
            source,
            Box::new(ScriptedVad::new(format())),
            thresholds(),
            1,
            WavSink::new(dir, "utterance", 16_000),
        )
        .unwrap()
    }

    fn wav_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0)
    }

    #[test]
    fn saves_utterance_with_pre_roll_and_trailing_silence() {
        let dir = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[(5, quiet), (10, loud), (6, quiet)]));
        let mut session = session_with(device, dir.path());

        let done = session.capture_utterance(false, &CancelToken::new()).unwrap();
        // 3 pre-roll + 10 voice + 6 silent (the 6th exceeds 0.1 s)
        let path = done.saved_path().expect("recording should be saved").clone();
        assert!(path.is_absolute());
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len() as usize, 19 * 320);
        assert_eq!(done.metrics.frames_processed, 21);
        assert_eq!(done.metrics.voice_frames, 10);
        assert_eq!(done.metrics.recording_frames, 19);
        assert_eq!(done.metrics.finalize_reason, Some(FinalizeReason::SilenceLimit));
        match done.artifact {
            RecordingArtifact::Saved { length_secs, .. } => {
                assert_eq!(length_secs, format().frames_to_secs(19))
            }
            other => panic!("unexpected artifact {other:?}"),
        }
        assert!(done.wake.is_none());
    }

    #[test]
    fn short_utterance_is_discarded_and_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[(3, loud), (6, quiet)]));
        let mut session = session_with(device, dir.path());

        let done = session.capture_utterance(false, &CancelToken::new()).unwrap();
        assert!(matches!(
            done.artifact,
            RecordingArtifact::Discarded(DiscardReason::UnderMinLength { frames: 9, .. })
        ));
        assert_eq!(done.metrics.recording_frames, 9);
        assert_eq!(wav_files(dir.path()), 0);
    }

    #[test]
    fn silence_only_reports_no_voice() {
        let dir = tempfile::tempdir().unwrap();
        // 51 * 0.02 s = 1.02 s > 1.0 s inactivity limit
        let device = ScriptedDevice::new(frames(&[(60, quiet)]));
        let mut session = session_with(device, dir.path());

        let done = session.capture_utterance(false, &CancelToken::new()).unwrap();
        assert_eq!(
            done.artifact,
            RecordingArtifact::Discarded(DiscardReason::NoVoiceDetected)
        );
        assert_eq!(done.metrics.frames_processed, 51);
    }

    #[test]
    fn wake_word_gates_recording_and_runs_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let snippets = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[
            (4, loud),
            (1, marker),
            (2, quiet),
            (12, loud),
            (6, quiet),
        ]));
        let fired = Rc::new(Cell::new(0));
        let mut actions = WakeActions::new();
        let counter = fired.clone();
        actions.register("count", move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        let mut session = session_with(device, dir.path())
            .with_wake_trigger(Box::new(ScriptedKeywords::new(format())))
            .unwrap()
            .with_actions(actions)
            .with_snippets(SnippetOptions {
                dir: snippets.path().to_path_buf(),
                seconds: 0.06,
            });

        let done = session.capture_utterance(true, &CancelToken::new()).unwrap();
        let wake = done.wake.clone().expect("wake event");
        assert_eq!(wake.keyword, "hey_hark");
        assert_eq!(wake.frame_index, 5);
        assert_eq!(fired.get(), 1);

        // loud frames before the keyword never reach the recorder:
        // 2 pre-roll + 12 voice + 6 silent
        assert_eq!(done.metrics.recording_frames, 20);

        let written = session.join_snippets();
        assert_eq!(written.len(), 1);
        let name = written[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("hey_hark_"), "{name}");
        let snippet = hound::WavReader::open(&written[0]).unwrap();
        assert_eq!(snippet.len(), 960);
    }

    fn wait_for_snippet_writers(session: &RecordingSession) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !session.pending_snippets.iter().all(|h| h.is_finished()) {
            assert!(Instant::now() < deadline, "snippet writers did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn finished_snippet_writers_are_joined_between_captures() {
        let dir = tempfile::tempdir().unwrap();
        let snippets = tempfile::tempdir().unwrap();
        let wakes = 5;
        let script: Vec<AudioFrame> = (0..wakes)
            .flat_map(|_| frames(&[(1, marker), (2, quiet), (12, loud), (6, quiet)]))
            .collect();
        let mut session = session_with(ScriptedDevice::new(script), dir.path())
            .with_wake_trigger(Box::new(ScriptedKeywords::new(format())))
            .unwrap()
            .with_snippets(SnippetOptions {
                dir: snippets.path().to_path_buf(),
                seconds: 0.02,
            });

        for _ in 0..wakes {
            let done = session.capture_utterance(true, &CancelToken::new()).unwrap();
            assert!(done.wake.is_some());
            assert!(done.saved_path().is_some());
            assert!(session.pending_snippets.len() <= 1);
            wait_for_snippet_writers(&session);
        }

        assert_eq!(session.reap_finished_snippets(), 1);
        assert!(session.pending_snippets.is_empty());
        assert!(session.join_snippets().is_empty());
        assert_eq!(wav_files(snippets.path()), wakes);
    }

    #[test]
    fn wake_mode_without_trigger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedDevice::new(Vec::new()), dir.path());
        let err = session.capture_utterance(true, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CaptureError::WakeTriggerMissing));
    }

    #[test]
    fn cancel_mid_recording_still_applies_min_length() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        let device =
            ScriptedDevice::new(frames(&[(12, loud)])).cancel_when_done(cancel.clone());
        let mut session = session_with(device, dir.path());

        let done = session.capture_utterance(false, &cancel).unwrap();
        assert!(done.saved_path().is_some());
        assert_eq!(done.metrics.finalize_reason, Some(FinalizeReason::Cancelled));
        assert_eq!(done.metrics.recording_frames, 12);
    }

    #[test]
    fn cancel_before_voice_is_interrupted() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        let device = ScriptedDevice::new(frames(&[(4, quiet)])).cancel_when_done(cancel.clone());
        let mut session = session_with(device, dir.path());

        let done = session.capture_utterance(false, &cancel).unwrap();
        assert_eq!(
            done.artifact,
            RecordingArtifact::Discarded(DiscardReason::InterruptedByCaller)
        );
    }

    #[test]
    fn overflow_is_counted_and_capture_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut steps: Vec<Step> = frames(&[(6, loud)]).into_iter().map(Step::Frame).collect();
        steps.push(Step::Fail(AudioError::Overflow { dropped: 2 }));
        steps.extend(frames(&[(6, loud), (6, quiet)]).into_iter().map(Step::Frame));
        let mut session = session_with(ScriptedDevice::with_steps(steps), dir.path());

        let done = session.capture_utterance(false, &CancelToken::new()).unwrap();
        assert_eq!(done.metrics.overflow_events, 1);
        assert_eq!(done.metrics.dropped_frames, 2);
        assert_eq!(done.metrics.recording_frames, 18);
        assert!(done.saved_path().is_some());
    }

    #[test]
    fn engine_failure_closes_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[(5, loud)]));
        let probe = device.probe();
        let source = AudioSource::new(Box::new(device), format(), 50);
        let mut session = RecordingSession::new(
            source,
            Box::new(ScriptedVad::new(format()).failing_on_call(3)),
            thresholds(),
            1,
            WavSink::new(dir.path(), "utterance", 16_000),
        )
        .unwrap();

        let err = session.capture_utterance(false, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CaptureError::Engine { engine: "scripted_vad", .. }));
        assert!(!session.source().is_open());
        assert_eq!(probe.closes(), 1);
        assert_eq!(wav_files(dir.path()), 0);
    }

    #[test]
    fn device_failure_surfaces_as_audio_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedDevice::failing_open("no microphone"), dir.path());
        let err = session.capture_utterance(false, &CancelToken::new()).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Audio(AudioError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn stream_closed_mid_capture_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[(3, loud)]));
        let mut session = session_with(device, dir.path());
        let err = session.capture_utterance(false, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CaptureError::Audio(AudioError::StreamClosed)));
        assert!(!session.source().is_open());
    }

    #[test]
    fn backlog_is_flushed_and_engines_reset_each_capture() {
        let dir = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[(3, loud), (6, quiet), (3, loud), (6, quiet)]))
            .with_backlog(4);
        let probe = device.probe();
        let vad = ScriptedVad::new(format());
        let resets = vad.resets();
        let source = AudioSource::new(Box::new(device), format(), 50);
        let mut session = RecordingSession::new(
            source,
            Box::new(vad),
            thresholds(),
            1,
            WavSink::new(dir.path(), "utterance", 16_000),
        )
        .unwrap();

        session.capture_utterance(false, &CancelToken::new()).unwrap();
        session.capture_utterance(false, &CancelToken::new()).unwrap();
        assert_eq!(probe.discards(), 2);
        assert_eq!(probe.opens(), 1);
        assert_eq!(resets.load(Ordering::SeqCst), 2);
    }

    struct EchoTranscriber;

    impl Transcriber for EchoTranscriber {
        fn transcribe(&mut self, wav_path: &std::path::Path) -> anyhow::Result<String> {
            let reader = hound::WavReader::open(wav_path)?;
            Ok(format!("[BLANK_AUDIO] heard {} samples ", reader.len()))
        }
    }

    #[test]
    fn transcribes_saved_recordings_only() {
        let dir = tempfile::tempdir().unwrap();
        let device = ScriptedDevice::new(frames(&[(10, loud), (6, quiet), (3, loud), (6, quiet)]));
        let mut session =
            session_with(device, dir.path()).with_transcriber(Box::new(EchoTranscriber));

        let saved = session.capture_utterance(false, &CancelToken::new()).unwrap();
        assert_eq!(
            session.transcribe(&saved).unwrap().as_deref(),
            Some("heard 5120 samples")
        );

        let discarded = session.capture_utterance(false, &CancelToken::new()).unwrap();
        assert!(discarded.saved_path().is_none());
        assert_eq!(session.transcribe(&discarded).unwrap(), None);
    }

    #[test]
    fn completed_recording_serializes_for_json_output() {
        let done = CompletedRecording {
            artifact: RecordingArtifact::Discarded(DiscardReason::NoVoiceDetected),
            metrics: CaptureMetrics::default(),
            wake: None,
        };
        let value = serde_json::to_value(&done).unwrap();
        assert_eq!(value["artifact"]["status"], "discarded");
        assert_eq!(value["artifact"]["reason"], "no_voice_detected");
        assert_eq!(value["metrics"]["frames_processed"], 0);
    }
}
