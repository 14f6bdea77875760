use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::codec::pcm_to_samples;
use super::resample::resample_linear;
use crate::config::RecordingConfig;
use crate::error::BridgeResult;

/// Summary of one written recording
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub file_path: PathBuf,
    /// Samples accumulated at the source rate
    pub input_samples: usize,
    /// Samples written at the target rate
    pub output_samples: usize,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

/// Accumulates the upstream PCM of one call and writes it out as a WAV file
///
/// The buffer holds raw little-endian PCM16 at `source_rate`. Nothing is
/// written until [`CallRecorder::flush`].
pub struct CallRecorder {
    buffer: Vec<u8>,
    output_path: PathBuf,
    source_rate: u32,
    target_rate: u32,
}

impl CallRecorder {
    pub fn new(output_path: impl Into<PathBuf>, source_rate: u32, target_rate: u32) -> Self {
        Self {
            buffer: Vec::new(),
            output_path: output_path.into(),
            source_rate,
            target_rate,
        }
    }

    /// Recorder for a session, expanding `{session}` in the configured path
    pub fn from_config(config: &RecordingConfig, session_id: &str) -> Self {
        let path = config.output_path.replace("{session}", session_id);
        Self::new(path, config.source_sample_rate, config.target_sample_rate)
    }

    pub fn append(&mut self, pcm: &[u8]) {
        self.buffer.extend_from_slice(pcm);
    }

    pub fn buffered_samples(&self) -> usize {
        self.buffer.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Resample the buffered audio and write it out, overwriting any
    /// previous file at the output path
    ///
    /// Returns `Ok(None)` without touching the filesystem when nothing was
    /// buffered. The buffer is cleared once the file is written.
    pub fn flush(&mut self) -> BridgeResult<Option<RecordingSummary>> {
        if self.buffer.is_empty() {
            debug!("Recording buffer empty, nothing to flush");
            return Ok(None);
        }

        let samples = pcm_to_samples(&self.buffer);
        let resampled = resample_linear(&samples, self.source_rate, self.target_rate);

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.target_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&self.output_path, spec)?;
        for &sample in &resampled {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        let summary = RecordingSummary {
            file_path: self.output_path.clone(),
            input_samples: samples.len(),
            output_samples: resampled.len(),
            sample_rate: self.target_rate,
            duration_secs: resampled.len() as f64 / self.target_rate as f64,
        };

        info!(
            "Recording saved to {} ({:.1}s, {} samples at {}Hz)",
            summary.file_path.display(),
            summary.duration_secs,
            summary.output_samples,
            summary.sample_rate
        );

        self.buffer.clear();

        Ok(Some(summary))
    }
}
