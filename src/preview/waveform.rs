use anyhow::{Context, Result};
use image::{Rgba as Pixel, RgbaImage};
use std::path::Path;

use crate::core::config::Rgba;
use super::ffmpeg::FfmpegTools;

/// Decoded first-channel samples in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct WaveformData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration: f64,
}

impl WaveformData {
    /// Load samples from any media file. WAV files are read directly, anything
    /// else is decoded through ffmpeg first.
    pub fn generate(media_file: &Path, tools: &FfmpegTools) -> Result<Self> {
        let is_wav = media_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav {
            return Self::from_wav(media_file);
        }

        let temp_path = std::env::temp_dir().join(format!("dub-editor-{}.wav", uuid::Uuid::new_v4()));
        tools.decode_to_wav(media_file, &temp_path)?;
        let data = Self::from_wav(&temp_path);
        let _ = std::fs::remove_file(&temp_path);
        data
    }

    /// Read a WAV file, keeping only the first channel.
    pub fn from_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|sample| sample as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };
        let samples: Vec<f32> = interleaved.into_iter().step_by(channels).collect();
        let duration = samples.len() as f64 / spec.sample_rate.max(1) as f64;

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            duration,
        })
    }
}

/// Per-column `(min, max)` amplitude for a fixed output width.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformEnvelope {
    pub columns: Vec<(f32, f32)>,
}

impl WaveformEnvelope {
    /// Each column scans `ceil(len / width)` consecutive samples. Columns past
    /// the end of the data are flat `(0, 0)`.
    pub fn compute(samples: &[f32], width: usize) -> Self {
        if width == 0 {
            return Self { columns: Vec::new() };
        }
        let step = samples.len().div_ceil(width);
        let columns = (0..width)
            .map(|i| {
                let start = (i * step).min(samples.len());
                let end = ((i + 1) * step).min(samples.len());
                let slice = &samples[start..end];
                if slice.is_empty() {
                    return (0.0, 0.0);
                }
                let (min, max) = slice
                    .iter()
                    .fold((1.0f32, -1.0f32), |(min, max), &s| (min.min(s), max.max(s)));
                (min.clamp(-1.0, 1.0), max.clamp(-1.0, 1.0))
            })
            .collect();
        Self { columns }
    }

    /// Closed outline: the max envelope left to right, then the min envelope
    /// right to left. Positive amplitude points up.
    pub fn polygon(&self, height: u32) -> Vec<(f32, f32)> {
        let amp = height as f32 / 2.0;
        let top = self
            .columns
            .iter()
            .enumerate()
            .map(|(x, &(_, max))| (x as f32, (1.0 - max) * amp));
        let bottom = self
            .columns
            .iter()
            .enumerate()
            .rev()
            .map(|(x, &(min, _))| (x as f32, (1.0 - min) * amp));
        top.chain(bottom).collect()
    }

    /// Rasterise onto a background, blending `fill` between the envelopes.
    pub fn render(&self, height: u32, fill: Rgba, background: Rgba) -> RgbaImage {
        let width = self.columns.len() as u32;
        let mut image = RgbaImage::from_pixel(width, height, Pixel(background.0));
        if height == 0 {
            return image;
        }
        let amp = height as f32 / 2.0;
        let max_row = height as i64 - 1;

        for (x, &(min, max)) in self.columns.iter().enumerate() {
            let top = ((1.0 - max) * amp).floor() as i64;
            let bottom = (((1.0 - min) * amp).ceil() as i64).max(top + 1);
            for y in top.clamp(0, max_row)..bottom.clamp(0, max_row + 1) {
                let pixel = image.get_pixel_mut(x as u32, y as u32);
                *pixel = blend(*pixel, fill);
            }
        }
        image
    }
}

fn blend(under: Pixel<u8>, over: Rgba) -> Pixel<u8> {
    let alpha = over.0[3] as f32 / 255.0;
    let mix = |top: u8, bottom: u8| (top as f32 * alpha + bottom as f32 * (1.0 - alpha)).round() as u8;
    Pixel([
        mix(over.0[0], under.0[0]),
        mix(over.0[1], under.0[1]),
        mix(over.0[2], under.0[2]),
        255,
    ])
}

/// Render `media_file` as a waveform PNG.
pub fn render_to_png(media_file: &Path, output: &Path, width: u32, height: u32, fill: Rgba, background: Rgba, tools: &FfmpegTools) -> Result<WaveformEnvelope> {
    let data = WaveformData::generate(media_file, tools)?;
    log::debug!(
        "Rendering waveform for {} ({} samples, {:.2}s)",
        media_file.display(),
        data.samples.len(),
        data.duration
    );
    let envelope = WaveformEnvelope::compute(&data.samples, width as usize);
    envelope
        .render(height, fill, background)
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(envelope)
}
