use anyhow::{Context, Result};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};

use super::ffmpeg::FfmpegTools;

/// Something that can be positioned and asked for the frame it shows. Only
/// one position is held at a time, so captures are strictly sequential.
pub trait FrameSource {
    fn duration(&self) -> f64;
    /// Move to `time` and return once the frame there is available.
    fn seek(&mut self, time: f64) -> Result<()>;
    fn capture(&mut self) -> Result<DynamicImage>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub time: f64,
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
}

impl Thumbnail {
    pub fn jpeg_bytes(&self) -> Result<Vec<u8>> {
        let encoded = self
            .data_url
            .strip_prefix(DATA_URL_PREFIX)
            .context("Not a JPEG data URL")?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }
}

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailOptions {
    pub count: usize,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl From<&crate::core::config::PreviewConfig> for ThumbnailOptions {
    fn from(config: &crate::core::config::PreviewConfig) -> Self {
        Self {
            count: config.thumbnail_count,
            width: config.thumbnail_width,
            height: config.thumbnail_height,
            quality: config.jpeg_quality,
        }
    }
}

/// Timestamps `duration * i / count` for `i` in `0..count`.
pub fn thumbnail_times(duration: f64, count: usize) -> Vec<f64> {
    if count == 0 || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    (0..count).map(|i| duration * i as f64 / count as f64).collect()
}

/// Capture evenly spaced frames, one seek at a time.
pub fn extract_thumbnails(source: &mut dyn FrameSource, options: ThumbnailOptions) -> Result<Vec<Thumbnail>> {
    let times = thumbnail_times(source.duration(), options.count);
    let mut thumbnails = Vec::with_capacity(times.len());
    for time in times {
        source.seek(time)?;
        let frame = source.capture()?;
        let data_url = encode_data_url(&frame, options)?;
        thumbnails.push(Thumbnail { time, data_url });
    }
    log::debug!("Extracted {} thumbnails", thumbnails.len());
    Ok(thumbnails)
}

fn encode_data_url(frame: &DynamicImage, options: ThumbnailOptions) -> Result<String> {
    let scaled = frame
        .resize_exact(options.width, options.height, FilterType::Triangle)
        .to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.quality.clamp(1, 100)).encode_image(&scaled)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);
    Ok(format!("{}{}", DATA_URL_PREFIX, encoded))
}

/// Write thumbnails as `thumb_000.jpg`, `thumb_001.jpg`, ... into `dir`.
pub fn write_thumbnails(thumbnails: &[Thumbnail], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    thumbnails
        .iter()
        .enumerate()
        .map(|(i, thumbnail)| {
            let path = dir.join(format!("thumb_{:03}.jpg", i));
            std::fs::write(&path, thumbnail.jpeg_bytes()?)?;
            Ok(path)
        })
        .collect()
}

/// Frames decoded from a local file through ffmpeg.
pub struct FfmpegFrameSource {
    path: PathBuf,
    tools: FfmpegTools,
    duration: f64,
    position: f64,
}

impl FfmpegFrameSource {
    pub fn open(path: impl Into<PathBuf>, tools: FfmpegTools) -> Result<Self> {
        let path = path.into();
        let duration = tools.probe_duration(&path)?;
        Ok(Self { path, tools, duration, position: 0.0 })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        self.position = time.clamp(0.0, self.duration);
        Ok(())
    }

    fn capture(&mut self) -> Result<DynamicImage> {
        self.tools.grab_frame(&self.path, self.position)
    }
}
