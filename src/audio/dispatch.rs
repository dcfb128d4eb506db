use super::resample::StreamResampler;
use crate::error::AudioError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Downmix multi-channel input to mono while applying the provided converter so
/// the engines always see a single channel regardless of the microphone layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Normalised f32 back to 16-bit PCM; exact inverse of `i16 / 32768`.
pub(super) fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32_768.0).round().clamp(-32_768.0, 32_767.0) as i16
}

/// Runs on the cpal callback thread. Does the minimum there (downmix and hand
/// off) so the realtime thread never blocks.
///
/// The channel is bounded; when the reader falls behind the incoming block is
/// dropped and counted so the pull side can surface an overflow.
pub(super) struct FrameDispatcher {
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub(super) fn new(sender: Sender<Vec<f32>>, dropped: Arc<AtomicUsize>) -> Self {
        Self { sender, dropped }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        let mut block = Vec::with_capacity(data.len() / channels.max(1) + 1);
        append_downmixed_samples(&mut block, data, channels, convert);
        if block.is_empty() {
            return;
        }
        match self.sender.try_send(block) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Pull-side half: resamples mono blocks to the capture rate, quantises to
/// 16-bit and cuts exact `frame_samples` frames in arrival order.
pub(super) struct FrameAssembler {
    frame_samples: usize,
    resampler: StreamResampler,
    resampled: Vec<f32>,
    pending: Vec<i16>,
    ready: VecDeque<Vec<i16>>,
}

impl FrameAssembler {
    pub(super) fn new(frame_samples: usize, resampler: StreamResampler) -> Self {
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            resampler,
            resampled: Vec::new(),
            pending: Vec::with_capacity(frame_samples * 2),
            ready: VecDeque::new(),
        }
    }

    pub(super) fn accept(&mut self, block: &[f32]) {
        self.resampled.clear();
        self.resampler.process(block, &mut self.resampled);
        self.pending
            .extend(self.resampled.iter().copied().map(f32_to_i16));
        while self.pending.len() >= self.frame_samples {
            let frame: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            self.ready.push_back(frame);
        }
    }

    pub(super) fn next_ready(&mut self) -> Option<Vec<i16>> {
        self.ready.pop_front()
    }

    /// Forget partial and completed frames.
    pub(super) fn clear(&mut self) {
        self.pending.clear();
        self.ready.clear();
    }
}

/// Pull side of the callback channel. Reports blocks the dispatcher dropped,
/// then hands out assembled frames in arrival order.
pub(super) struct BlockReader {
    receiver: Receiver<Vec<f32>>,
    assembler: FrameAssembler,
    dropped: Arc<AtomicUsize>,
    reported_dropped: usize,
}

impl BlockReader {
    pub(super) fn new(
        receiver: Receiver<Vec<f32>>,
        assembler: FrameAssembler,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            receiver,
            assembler,
            dropped,
            reported_dropped: 0,
        }
    }

    /// Next frame, `Ok(None)` on timeout, or `Overflow` once per new run of
    /// dropped blocks.
    ///
    /// Samples already in the assembler and the channel were captured before
    /// the dropped block, so they are kept and delivered after the overflow.
    pub(super) fn read(&mut self, timeout: Duration) -> Result<Option<Vec<i16>>, AudioError> {
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > self.reported_dropped {
            let newly_dropped = dropped - self.reported_dropped;
            self.reported_dropped = dropped;
            return Err(AudioError::Overflow {
                dropped: newly_dropped,
            });
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.assembler.next_ready() {
                return Ok(Some(frame));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(block) => self.assembler.accept(&block),
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(AudioError::StreamClosed),
            }
        }
    }

    /// Drop queued blocks and partial frames; returns how many were discarded.
    /// Overflows that happened meanwhile are not reported afterwards.
    pub(super) fn discard_pending(&mut self) -> usize {
        let mut discarded = 0usize;
        while self.assembler.next_ready().is_some() {
            discarded += 1;
        }
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        self.assembler.clear();
        self.reported_dropped = self.dropped.load(Ordering::Relaxed);
        discarded
    }
}
