//! Frame-driven recording state machine.
//!
//! Buffers pre-roll while waiting for voice, records until the speaker falls
//! silent (or a limit trips), then decides whether the take is long enough to
//! keep. Timing is pure frame accounting: every limit is compared against
//! `frame_count * frame_length / sample_rate`, never the wall clock.

use super::frame::{AudioFrame, FrameFormat};
use super::rolling::RollingBuffer;
use serde::Serialize;
use std::time::Instant;

/// Timing and probability limits, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// A frame is voice when the VAD probability is strictly above this.
    pub voice_threshold: f32,
    /// Trailing silence tolerated while recording.
    pub silence_limit_seconds: f64,
    /// Silence tolerated before any voice (and, while recording, since the last voice).
    pub inactivity_limit_seconds: f64,
    /// Shorter recordings are discarded.
    pub min_recording_length_seconds: f64,
    /// Pre-roll kept ahead of the voice onset.
    pub pre_buffer_seconds: f64,
    /// Hard stop for a recording that never falls silent.
    pub max_recording_seconds: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            voice_threshold: 0.8,
            silence_limit_seconds: 2.0,
            inactivity_limit_seconds: 2.0,
            min_recording_length_seconds: 3.0,
            pre_buffer_seconds: 2.0,
            max_recording_seconds: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Buffering,
    Recording,
    Finalizing,
}

impl MachineState {
    pub fn label(&self) -> &'static str {
        match self {
            MachineState::Idle => "idle",
            MachineState::Buffering => "buffering",
            MachineState::Recording => "recording",
            MachineState::Finalizing => "finalizing",
        }
    }
}

/// Why a recording stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeReason {
    SilenceLimit,
    InactivityLimit,
    MaxDuration,
    Cancelled,
}

impl FinalizeReason {
    pub fn label(&self) -> &'static str {
        match self {
            FinalizeReason::SilenceLimit => "silence_limit",
            FinalizeReason::InactivityLimit => "inactivity_limit",
            FinalizeReason::MaxDuration => "max_duration",
            FinalizeReason::Cancelled => "cancelled",
        }
    }
}

/// Expected, non-error ways a capture attempt ends without a file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscardReason {
    UnderMinLength { frames: usize, length_secs: f64 },
    NoVoiceDetected,
    InterruptedByCaller,
}

impl DiscardReason {
    pub fn label(&self) -> &'static str {
        match self {
            DiscardReason::UnderMinLength { .. } => "under_min_length",
            DiscardReason::NoVoiceDetected => "no_voice_detected",
            DiscardReason::InterruptedByCaller => "interrupted_by_caller",
        }
    }
}

/// Audio that passed the minimum-length check.
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub frames: Vec<AudioFrame>,
    pub length_secs: f64,
    pub reason: FinalizeReason,
}

impl FinishedRecording {
    /// All frames flattened in order.
    pub fn samples(&self) -> Vec<i16> {
        let total = self.frames.iter().map(AudioFrame::len).sum();
        let mut out = Vec::with_capacity(total);
        for frame in &self.frames {
            out.extend_from_slice(frame.samples());
        }
        out
    }
}

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Recorded(FinishedRecording),
    Discarded(DiscardReason),
}

/// Single-threaded recorder driven one frame at a time.
///
/// Each call to [`RecordingStateMachine::process_frame`] applies every side
/// effect of that frame (counters, buffers, transition) before returning.
/// A terminal outcome resets the machine to `Idle`, ready for the next attempt.
pub struct RecordingStateMachine {
    format: FrameFormat,
    thresholds: Thresholds,
    state: MachineState,
    pre_roll: RollingBuffer,
    frames_to_save: Vec<AudioFrame>,
    silence_frames: usize,
    inactivity_frames: usize,
    started_at: Option<Instant>,
}

impl RecordingStateMachine {
    pub fn new(format: FrameFormat, thresholds: Thresholds) -> Self {
        let capacity = format.frames_within(thresholds.pre_buffer_seconds);
        Self {
            format,
            thresholds,
            state: MachineState::Idle,
            pre_roll: RollingBuffer::new(capacity),
            frames_to_save: Vec::new(),
            silence_frames: 0,
            inactivity_frames: 0,
            started_at: None,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn pre_roll_capacity(&self) -> usize {
        self.pre_roll.capacity()
    }

    pub fn pre_roll_len(&self) -> usize {
        self.pre_roll.len()
    }

    pub fn recorded_frames(&self) -> usize {
        self.frames_to_save.len()
    }

    pub fn silence_frames(&self) -> usize {
        self.silence_frames
    }

    pub fn inactivity_frames(&self) -> usize {
        self.inactivity_frames
    }

    /// When the current attempt saw its first frame.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Advance by one classified frame. Returns the outcome when this frame ends the attempt.
    pub fn process_frame(&mut self, frame: AudioFrame, is_voice: bool) -> Option<CaptureOutcome> {
        if self.state == MachineState::Idle {
            self.started_at = Some(Instant::now());
            self.transition(MachineState::Buffering);
        }
        match self.state {
            MachineState::Recording => self.record(frame, is_voice),
            _ => self.buffer(frame, is_voice),
        }
    }

    /// Stop on caller request. A recording in progress is finalized and still
    /// subject to the minimum-length check; otherwise nothing was captured.
    pub fn cancel(&mut self) -> CaptureOutcome {
        if self.state == MachineState::Recording {
            return self.finalize(FinalizeReason::Cancelled);
        }
        tracing::debug!(state = self.state.label(), "capture cancelled before voice");
        self.reset();
        CaptureOutcome::Discarded(DiscardReason::InterruptedByCaller)
    }

    /// Drop all buffered audio and counters and return to `Idle`.
    pub fn reset(&mut self) {
        self.pre_roll.clear();
        self.frames_to_save = Vec::new();
        self.silence_frames = 0;
        self.inactivity_frames = 0;
        self.started_at = None;
        self.state = MachineState::Idle;
    }

    fn buffer(&mut self, frame: AudioFrame, is_voice: bool) -> Option<CaptureOutcome> {
        if is_voice {
            let mut frames = self.pre_roll.drain();
            let pre_roll = frames.len();
            frames.push(frame);
            self.frames_to_save = frames;
            self.silence_frames = 0;
            self.inactivity_frames = 0;
            tracing::debug!(pre_roll_frames = pre_roll, "voice onset");
            self.transition(MachineState::Recording);
            return self.check_max_duration();
        }

        self.pre_roll.push(frame);
        self.inactivity_frames += 1;
        if self.exceeds(self.inactivity_frames, self.thresholds.inactivity_limit_seconds) {
            tracing::info!(
                inactivity_secs = self.format.frames_to_secs(self.inactivity_frames),
                "no voice before inactivity limit; discarding"
            );
            self.reset();
            return Some(CaptureOutcome::Discarded(DiscardReason::NoVoiceDetected));
        }
        None
    }

    fn record(&mut self, frame: AudioFrame, is_voice: bool) -> Option<CaptureOutcome> {
        self.frames_to_save.push(frame);
        if is_voice {
            self.silence_frames = 0;
            self.inactivity_frames = 0;
        } else {
            self.silence_frames += 1;
            self.inactivity_frames += 1;
        }

        if self.exceeds(self.silence_frames, self.thresholds.silence_limit_seconds) {
            return Some(self.finalize(FinalizeReason::SilenceLimit));
        }
        if self.exceeds(self.inactivity_frames, self.thresholds.inactivity_limit_seconds) {
            return Some(self.finalize(FinalizeReason::InactivityLimit));
        }
        self.check_max_duration()
    }

    fn check_max_duration(&mut self) -> Option<CaptureOutcome> {
        if self.exceeds(self.frames_to_save.len(), self.thresholds.max_recording_seconds) {
            return Some(self.finalize(FinalizeReason::MaxDuration));
        }
        None
    }

    fn exceeds(&self, frames: usize, limit_secs: f64) -> bool {
        self.format.frames_to_secs(frames) > limit_secs
    }

    fn finalize(&mut self, reason: FinalizeReason) -> CaptureOutcome {
        self.transition(MachineState::Finalizing);
        let frames = std::mem::take(&mut self.frames_to_save);
        let length_secs = self.format.frames_to_secs(frames.len());
        let outcome = if length_secs >= self.thresholds.min_recording_length_seconds {
            tracing::info!(
                frames = frames.len(),
                length_secs,
                reason = reason.label(),
                "recording finalized"
            );
            CaptureOutcome::Recorded(FinishedRecording {
                frames,
                length_secs,
                reason,
            })
        } else {
            tracing::info!(
                frames = frames.len(),
                length_secs,
                min_secs = self.thresholds.min_recording_length_seconds,
                reason = reason.label(),
                "recording under minimum length; discarding"
            );
            CaptureOutcome::Discarded(DiscardReason::UnderMinLength {
                frames: frames.len(),
                length_secs,
            })
        };
        self.reset();
        outcome
    }

    fn transition(&mut self, next: MachineState) {
        tracing::debug!(from = self.state.label(), to = next.label(), "recorder transition");
        self.state = next;
    }
}
