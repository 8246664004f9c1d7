//! Streaming WAV capture of the beeper output.
//!
//! The runner drains [`Plus3::take_audio`](crate::Plus3::take_audio) once
//! per frame and hands each batch to [`AudioCapture::write_frame`], so a
//! long run never holds its whole soundtrack in memory.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Mono 16-bit PCM WAV file fed one frame of samples at a time.
pub struct AudioCapture {
    writer: hound::WavWriter<BufWriter<File>>,
    frames: u32,
    samples: u64,
}

impl AudioCapture {
    /// Create `path` for samples at `sample_rate` Hz.
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        Ok(Self {
            writer: hound::WavWriter::create(path, spec)?,
            frames: 0,
            samples: 0,
        })
    }

    /// Append one frame's beeper samples. Values outside -1.0..=1.0 clip.
    pub fn write_frame(&mut self, samples: &[f32]) -> Result<(), hound::Error> {
        for &s in samples {
            self.writer.write_sample(to_pcm(s))?;
        }
        self.frames += 1;
        self.samples += samples.len() as u64;
        Ok(())
    }

    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Patch the WAV header with the final length and close the file.
    pub fn finish(self) -> Result<u64, hound::Error> {
        log::debug!(
            "capture: {} samples over {} frames",
            self.samples,
            self.frames
        );
        self.writer.finalize()?;
        Ok(self.samples)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_pcm(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}
