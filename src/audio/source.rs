//! Microphone input behind a pull interface.
//!
//! cpal delivers audio on its own callback thread; [`MicrophoneDevice`] turns
//! that push stream into exact fixed-size frames, and [`AudioSource`] adds the
//! open/close lifecycle plus the rolling pre-roll window.

use super::dispatch::{BlockReader, FrameAssembler, FrameDispatcher};
use super::frame::{AudioFrame, FrameFormat};
use super::resample::StreamResampler;
use super::rolling::SharedRollingBuffer;
use crate::error::AudioError;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long `next_frame` waits per poll before re-checking the device.
const DEFAULT_POLL: Duration = Duration::from_millis(250);

/// A device that yields frames of exactly `format.frame_length` samples.
///
/// Implementations own the OS handle; `close` must release it and be safe to
/// call on a device that is already closed.
pub trait FrameDevice {
    fn open(&mut self, format: FrameFormat) -> Result<(), AudioError>;

    /// Wait up to `timeout` for the next frame. `Ok(None)` means nothing arrived yet.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Vec<i16>>, AudioError>;

    /// Drop everything queued so far; returns the number of frames discarded.
    fn discard_pending(&mut self) -> usize;

    fn close(&mut self);

    fn name(&self) -> String;
}

/// Input device wrapper built on cpal.
pub struct MicrophoneDevice {
    preferred_device: Option<String>,
    channel_capacity: usize,
    live: Option<LiveStream>,
}

struct LiveStream {
    // Dropping the stream stops the callback and releases the OS handle.
    stream: cpal::Stream,
    reader: BlockReader,
    failed: Arc<AtomicBool>,
    device_name: String,
}

impl MicrophoneDevice {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn new(preferred_device: Option<&str>, channel_capacity: usize) -> Self {
        Self {
            preferred_device: preferred_device.map(str::to_string),
            channel_capacity: channel_capacity.max(1),
            live: None,
        }
    }

    fn select_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();
        match self.preferred_device.as_deref() {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))
            }
            None => host
                .default_input_device()
                .ok_or_else(|| anyhow!("no default input device available. {}", mic_permission_hint())),
        }
    }
}

/// Prefer a native config at the capture rate (fewest channels, i16 first);
/// otherwise fall back to the device default and resample.
fn choose_stream_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<(StreamConfig, SampleFormat)> {
    let wanted = SampleRate(target_rate);
    if let Ok(ranges) = device.supported_input_configs() {
        let mut candidates: Vec<_> = ranges
            .filter(|range| {
                range.min_sample_rate() <= wanted
                    && range.max_sample_rate() >= wanted
                    && format_rank(range.sample_format()).is_some()
            })
            .collect();
        candidates.sort_by_key(|range| (range.channels(), format_rank(range.sample_format())));
        if let Some(range) = candidates.into_iter().next() {
            let supported = range.with_sample_rate(wanted);
            return Ok((supported.config(), supported.sample_format()));
        }
    }
    let fallback = device
        .default_input_config()
        .context("failed to query default input config")?;
    Ok((fallback.config(), fallback.sample_format()))
}

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

impl FrameDevice for MicrophoneDevice {
    fn open(&mut self, format: FrameFormat) -> Result<(), AudioError> {
        if self.live.is_some() {
            return Ok(());
        }
        let unavailable = |err: anyhow::Error| AudioError::DeviceUnavailable(format!("{err:#}"));
        let device = self.select_device().map_err(unavailable)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());
        let (config, sample_format) =
            choose_stream_config(&device, format.sample_rate).map_err(unavailable)?;
        let device_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));
        let resampler = StreamResampler::new(device_rate, format.sample_rate).map_err(unavailable)?;

        tracing::debug!(
            device = %device_name,
            ?sample_format,
            device_rate,
            channels,
            target_rate = format.sample_rate,
            frame_length = format.frame_length,
            resampler = resampler.label(),
            "opening input stream"
        );

        let (sender, receiver) = bounded::<Vec<f32>>(self.channel_capacity);
        let dropped = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));
        let mut dispatcher = FrameDispatcher::new(sender, dropped.clone());

        let err_fn = {
            let failed = failed.clone();
            move |err: cpal::StreamError| {
                tracing::error!(error = %err, "audio stream error");
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    failed.store(true, Ordering::Relaxed);
                }
            }
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    dispatcher.push(data, channels, |sample| sample);
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    dispatcher.push(data, channels, |sample| f32::from(sample) / 32_768.0);
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    dispatcher.push(data, channels, |sample| {
                        (f32::from(sample) - 32_768.0) / 32_768.0
                    });
                },
                err_fn,
                None,
            ),
            other => {
                return Err(AudioError::DeviceUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|err| AudioError::DeviceUnavailable(err.to_string()))?;

        stream
            .play()
            .map_err(|err| AudioError::DeviceUnavailable(err.to_string()))?;

        tracing::info!(device = %device_name, "input stream started");
        self.live = Some(LiveStream {
            stream,
            reader: BlockReader::new(
                receiver,
                FrameAssembler::new(format.frame_length, resampler),
                dropped,
            ),
            failed,
            device_name,
        });
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Vec<i16>>, AudioError> {
        let live = self.live.as_mut().ok_or(AudioError::StreamClosed)?;
        if live.failed.load(Ordering::Relaxed) {
            return Err(AudioError::DeviceUnavailable(format!(
                "'{}' is no longer available",
                live.device_name
            )));
        }

        live.reader.read(timeout)
    }

    fn discard_pending(&mut self) -> usize {
        self.live
            .as_mut()
            .map_or(0, |live| live.reader.discard_pending())
    }

    fn close(&mut self) {
        if let Some(live) = self.live.take() {
            if let Err(err) = live.stream.pause() {
                tracing::debug!(error = %err, "failed to pause audio stream");
            }
            drop(live.stream);
            tracing::info!(device = %live.device_name, "input stream closed");
        }
    }

    fn name(&self) -> String {
        match (&self.live, &self.preferred_device) {
            (Some(live), _) => live.device_name.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => "default input".to_string(),
        }
    }
}

impl Drop for MicrophoneDevice {
    fn drop(&mut self) {
        self.close();
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Unopened,
    Open,
    Closed,
}

/// Owns the input device and the rolling window of recently read frames.
///
/// Every frame handed out by [`AudioSource::next_frame`] has already been
/// appended to the rolling buffer, so a snapshot never lags behind or runs
/// ahead of what the caller has seen.
pub struct AudioSource {
    device: Box<dyn FrameDevice>,
    format: FrameFormat,
    rolling: SharedRollingBuffer,
    state: SourceState,
    frames_read: u64,
}

impl AudioSource {
    pub fn new(device: Box<dyn FrameDevice>, format: FrameFormat, rolling_frames: usize) -> Self {
        Self {
            device,
            format,
            rolling: SharedRollingBuffer::new(rolling_frames),
            state: SourceState::Unopened,
            frames_read: 0,
        }
    }

    /// Microphone-backed source whose rolling window holds `rolling_secs` of audio.
    pub fn microphone(
        preferred_device: Option<&str>,
        format: FrameFormat,
        channel_capacity: usize,
        rolling_secs: f64,
    ) -> Self {
        let device = MicrophoneDevice::new(preferred_device, channel_capacity);
        Self::new(Box::new(device), format, format.frames_within(rolling_secs))
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn is_open(&self) -> bool {
        self.state == SourceState::Open
    }

    pub fn device_name(&self) -> String {
        self.device.name()
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Acquire the device. Reopening after `close` is allowed.
    pub fn open(&mut self) -> Result<(), AudioError> {
        if self.state == SourceState::Open {
            return Ok(());
        }
        self.device.open(self.format)?;
        self.state = SourceState::Open;
        Ok(())
    }

    /// Block until exactly one frame is available.
    pub fn next_frame(&mut self) -> Result<AudioFrame, AudioError> {
        loop {
            if let Some(frame) = self.poll_frame(DEFAULT_POLL)? {
                return Ok(frame);
            }
        }
    }

    /// Like [`AudioSource::next_frame`] but gives up after `timeout` with `Ok(None)`,
    /// letting the caller poll a cancellation flag between waits.
    pub fn poll_frame(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, AudioError> {
        if self.state != SourceState::Open {
            return Err(AudioError::StreamClosed);
        }
        let Some(samples) = self.device.read_frame(timeout)? else {
            return Ok(None);
        };
        if samples.len() != self.format.frame_length {
            return Err(AudioError::DeviceUnavailable(format!(
                "device produced a {}-sample frame, expected {}",
                samples.len(),
                self.format.frame_length
            )));
        }
        let frame = AudioFrame::new(samples);
        self.rolling.push(frame.clone());
        self.frames_read += 1;
        Ok(Some(frame))
    }

    /// Throw away frames queued while nobody was reading.
    pub fn discard_pending(&mut self) -> usize {
        if self.state != SourceState::Open {
            return 0;
        }
        let discarded = self.device.discard_pending();
        if discarded > 0 {
            tracing::debug!(discarded, "discarded stale frames");
        }
        discarded
    }

    /// Copy of the rolling window as little-endian 16-bit PCM.
    pub fn snapshot_rolling_buffer(&self) -> Vec<u8> {
        self.rolling.snapshot_bytes()
    }

    pub fn snapshot_rolling_frames(&self) -> Vec<AudioFrame> {
        self.rolling.snapshot()
    }

    /// Shared handle for readers on other threads.
    pub fn rolling_buffer(&self) -> SharedRollingBuffer {
        self.rolling.clone()
    }

    /// Release the device. Idempotent.
    pub fn close(&mut self) {
        if self.state == SourceState::Open {
            self.device.close();
            tracing::debug!(frames_read = self.frames_read, "audio source closed");
        }
        self.state = SourceState::Closed;
    }
}

impl Drop for AudioSource {
    fn drop(&mut self) {
        self.close();
    }
}
