//! Hardware-free stand-ins for the microphone and the external engines.

use crate::audio::{AudioFrame, FrameDevice, FrameFormat, VoiceActivityEngine};
use crate::error::AudioError;
use crate::session::CancelToken;
use crate::wake::KeywordEngine;
use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sample value that `ScriptedVad` scores as voice.
pub(crate) const LOUD: i16 = 4_000;
/// Sample value that `ScriptedKeywords` treats as the wake phrase.
pub(crate) const WAKE_MARKER: i16 = 7_777;

pub(crate) fn quiet(format: FrameFormat) -> AudioFrame {
    AudioFrame::new(vec![0; format.frame_length])
}

pub(crate) fn loud(format: FrameFormat) -> AudioFrame {
    AudioFrame::new(vec![LOUD; format.frame_length])
}

pub(crate) fn marker(format: FrameFormat) -> AudioFrame {
    AudioFrame::new(vec![WAKE_MARKER; format.frame_length])
}

/// Counters shared with a boxed [`ScriptedDevice`].
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceProbe {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub discards: Arc<AtomicUsize>,
}

impl DeviceProbe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

pub(crate) enum Step {
    Frame(AudioFrame),
    Fail(AudioError),
}

/// Plays back a fixed script of frames and errors.
///
/// When the script runs out the device either cancels the supplied token
/// (and then idles) or reports the stream as closed.
pub(crate) struct ScriptedDevice {
    script: VecDeque<Step>,
    open_error: Option<String>,
    backlog: usize,
    cancel_when_done: Option<CancelToken>,
    probe: DeviceProbe,
}

impl ScriptedDevice {
    pub fn new(frames: impl IntoIterator<Item = AudioFrame>) -> Self {
        Self {
            script: frames.into_iter().map(Step::Frame).collect(),
            open_error: None,
            backlog: 0,
            cancel_when_done: None,
            probe: DeviceProbe::default(),
        }
    }

    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        let mut device = Self::new(Vec::new());
        device.script = steps.into_iter().collect();
        device
    }

    pub fn failing_open(reason: &str) -> Self {
        let mut device = Self::new(Vec::new());
        device.open_error = Some(reason.to_string());
        device
    }

    pub fn with_backlog(mut self, frames: usize) -> Self {
        self.backlog = frames;
        self
    }

    pub fn cancel_when_done(mut self, token: CancelToken) -> Self {
        self.cancel_when_done = Some(token);
        self
    }

    pub fn probe(&self) -> DeviceProbe {
        self.probe.clone()
    }
}

impl FrameDevice for ScriptedDevice {
    fn open(&mut self, _format: FrameFormat) -> Result<(), AudioError> {
        if let Some(reason) = &self.open_error {
            return Err(AudioError::DeviceUnavailable(reason.clone()));
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&mut self, _timeout: Duration) -> Result<Option<Vec<i16>>, AudioError> {
        match self.script.pop_front() {
            Some(Step::Frame(frame)) => Ok(Some(frame.samples().to_vec())),
            Some(Step::Fail(err)) => Err(err),
            None => match &self.cancel_when_done {
                Some(token) => {
                    token.cancel();
                    Ok(None)
                }
                None => Err(AudioError::StreamClosed),
            },
        }
    }

    fn discard_pending(&mut self) -> usize {
        self.probe.discards.fetch_add(1, Ordering::SeqCst);
        std::mem::take(&mut self.backlog)
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

/// Scores a frame 1.0 when its first sample is at least [`LOUD`], else 0.0.
/// Optionally fails on the n-th call (1-based).
pub(crate) struct ScriptedVad {
    format: FrameFormat,
    calls: usize,
    fail_on_call: Option<usize>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedVad {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            calls: 0,
            fail_on_call: None,
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn resets(&self) -> Arc<AtomicUsize> {
        self.resets.clone()
    }
}

impl VoiceActivityEngine for ScriptedVad {
    fn frame_length(&self) -> usize {
        self.format.frame_length
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn process(&mut self, samples: &[i16]) -> Result<f32> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            bail!("scripted vad failure");
        }
        Ok(match samples.first() {
            Some(s) if *s >= LOUD => 1.0,
            _ => 0.0,
        })
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "scripted_vad"
    }
}

/// Fires keyword 0 ("hey_hark") on any frame starting with [`WAKE_MARKER`].
pub(crate) struct ScriptedKeywords {
    format: FrameFormat,
}

impl ScriptedKeywords {
    pub fn new(format: FrameFormat) -> Self {
        Self { format }
    }
}

impl KeywordEngine for ScriptedKeywords {
    fn frame_length(&self) -> usize {
        self.format.frame_length
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn process(&mut self, samples: &[i16]) -> Result<Option<usize>> {
        Ok((samples.first() == Some(&WAKE_MARKER)).then_some(0))
    }

    fn keyword_name(&self, index: usize) -> Option<String> {
        (index == 0).then(|| "hey_hark".to_string())
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "scripted_keywords"
    }
}
