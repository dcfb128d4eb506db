//! RIFF/WAVE output for finished recordings and wake snippets.
//!
//! Files are mono 16-bit PCM at the capture rate, named
//! `<stem>_<unix-millis>.wav` so repeated captures never overwrite each other.

use crate::audio::{AudioFrame, TARGET_CHANNELS};
use crate::error::CaptureError;
use crate::wake::unix_millis;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

pub fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: TARGET_CHANNELS,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Writes recordings into one directory under a fixed file stem.
#[derive(Debug, Clone)]
pub struct WavSink {
    dir: PathBuf,
    stem: String,
    sample_rate: u32,
}

impl WavSink {
    pub fn new(dir: impl Into<PathBuf>, stem: &str, sample_rate: u32) -> Self {
        Self {
            dir: dir.into(),
            stem: sanitize_stem(stem),
            sample_rate,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `frames` to a fresh file and return its absolute path.
    pub fn write_frames(&self, frames: &[AudioFrame]) -> Result<PathBuf, CaptureError> {
        write_samples(
            &self.dir,
            &self.stem,
            frames.iter().flat_map(|f| f.samples().iter().copied()),
            self.sample_rate,
        )
    }
}

/// Write `samples` to `<dir>/<stem>_<unix-millis>.wav`, creating `dir` if needed.
pub fn write_samples(
    dir: &Path,
    stem: &str,
    samples: impl IntoIterator<Item = i16>,
    sample_rate: u32,
) -> Result<PathBuf, CaptureError> {
    let io_err = |path: &Path, err: std::io::Error| CaptureError::WavWrite {
        path: path.to_path_buf(),
        source: hound::Error::IoError(err),
    };
    std::fs::create_dir_all(dir).map_err(|err| io_err(dir, err))?;
    let path = unique_path(dir, &sanitize_stem(stem));

    write_fresh(path, |path| write_wav(path, samples, sample_rate))
}

/// Run `write` against `path`; on failure the partial file is removed so only
/// complete recordings stay on disk.
fn write_fresh(
    path: PathBuf,
    write: impl FnOnce(&Path) -> Result<(), hound::Error>,
) -> Result<PathBuf, CaptureError> {
    if let Err(source) = write(&path) {
        if let Err(err) = std::fs::remove_file(&path) {
            tracing::debug!(path = %path.display(), error = %err, "could not remove partial wav");
        }
        return Err(CaptureError::WavWrite { path, source });
    }
    std::fs::canonicalize(&path).map_err(|err| CaptureError::WavWrite {
        path,
        source: hound::Error::IoError(err),
    })
}

fn write_wav(
    path: &Path,
    samples: impl IntoIterator<Item = i16>,
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, wav_spec(sample_rate))?;
    for sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Persist a wake snippet off the frame-pull thread.
///
/// The samples are already a copy, so the caller's buffers stay untouched.
pub fn spawn_snippet_writer(
    dir: PathBuf,
    keyword: String,
    samples: Vec<i16>,
    sample_rate: u32,
) -> JoinHandle<Option<PathBuf>> {
    thread::spawn(move || {
        match write_samples(&dir, &keyword, samples.iter().copied(), sample_rate) {
            Ok(path) => {
                tracing::info!(path = %path.display(), samples = samples.len(), "wake snippet saved");
                Some(path)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to save wake snippet");
                None
            }
        }
    })
}

fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let millis = unix_millis();
    let mut candidate = dir.join(format!("{stem}_{millis}.wav"));
    let mut suffix = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{millis}-{suffix}.wav"));
        suffix += 1;
    }
    candidate
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "recording".to_string()
    } else {
        cleaned
    }
}
