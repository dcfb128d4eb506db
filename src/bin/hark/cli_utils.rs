use anyhow::Result;
use hark::audio::MicrophoneDevice;
use hark::session::{CompletedRecording, RecordingArtifact};
use serde::Serialize;

pub(crate) fn list_input_devices() -> Result<()> {
    // HARK_TEST_DEVICES stands in for the host device list in tests.
    let devices = if let Ok(raw) = std::env::var("HARK_TEST_DEVICES") {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    } else {
        MicrophoneDevice::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err:#}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CaptureReport<'a> {
    #[serde(flatten)]
    recording: &'a CompletedRecording,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a str>,
}

pub(crate) fn print_capture(
    completed: &CompletedRecording,
    transcript: Option<&str>,
    json: bool,
) -> Result<()> {
    if json {
        let line = serde_json::to_string(&CaptureReport {
            recording: completed,
            transcript,
        })?;
        println!("{line}");
        return Ok(());
    }

    if let Some(wake) = &completed.wake {
        eprintln!("wake word: {}", wake.keyword);
    }
    match &completed.artifact {
        RecordingArtifact::Saved { path, length_secs } => {
            println!("{} ({length_secs:.2}s)", path.display());
        }
        RecordingArtifact::Discarded(reason) => {
            eprintln!("discarded: {}", reason.label());
        }
    }
    if let Some(text) = transcript {
        println!("{text}");
    }
    Ok(())
}
