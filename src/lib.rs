pub mod audio;
pub mod config;
pub mod error;
mod lock;
pub mod session;
pub mod stt;
pub mod telemetry;
#[cfg(feature = "vad_earshot")]
pub mod vad_earshot;
pub mod wake;
pub mod wav;

#[cfg(test)]
mod testing;

pub(crate) use lock::lock_or_recover;
pub use error::{AudioError, CaptureError};
pub use session::{CancelToken, CompletedRecording, RecordingArtifact, RecordingSession};
