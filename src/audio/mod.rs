//! Audio capture and voice activity detection (VAD) pipeline.
//!
//! Microphone audio is captured via CPAL, converted to 16-bit mono at the
//! capture rate, cut into fixed frames and handed to the recorder, which
//! decides when an utterance starts and ends.

/// Default capture rate; what both earshot and whisper expect.
pub const TARGET_RATE: u32 = 16_000;

/// Captured audio is always mono.
pub const TARGET_CHANNELS: u16 = 1;

mod dispatch;
mod frame;
mod recorder;
mod resample;
mod rolling;
mod source;
mod vad;

pub use frame::{AudioFrame, FrameFormat, FrameRechunker};
pub use recorder::{
    CaptureOutcome, DiscardReason, FinalizeReason, FinishedRecording, MachineState,
    RecordingStateMachine, Thresholds,
};
pub use rolling::{RollingBuffer, SharedRollingBuffer};
pub use source::{AudioSource, FrameDevice, MicrophoneDevice};
pub use vad::{EnergyVad, VoiceActivityEngine, VoiceActivityGate};
