// =============================================================================
// PREVIEW LOADER - BACKGROUND WAVEFORMS AND THUMBNAILS
// =============================================================================
//
// Generation runs on the blocking pool and reports back over a channel. Every
// request gets an id; only the newest id per preview kind is current, so a slow
// result for a replaced file can never overwrite the preview of its successor.
//
// =============================================================================

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::config::PreviewConfig;
use crate::core::media::MediaKind;

use super::ffmpeg::FfmpegTools;
use super::thumbnail::{extract_thumbnails, FfmpegFrameSource, Thumbnail, ThumbnailOptions};
use super::waveform::{WaveformData, WaveformEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewKind {
    Thumbnails,
    Waveform(MediaKind),
}

#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub request_id: u64,
    pub kind: PreviewKind,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutput {
    Waveform(WaveformEnvelope),
    Thumbnails(Vec<Thumbnail>),
}

#[derive(Debug, Clone)]
pub struct PreviewResult {
    pub request_id: u64,
    pub kind: PreviewKind,
    pub source: PathBuf,
    pub result: Result<PreviewOutput, String>,
}

pub type PreviewGenerator = Arc<dyn Fn(&PreviewRequest) -> Result<PreviewOutput> + Send + Sync>;

pub struct PreviewLoader {
    runtime: tokio::runtime::Handle,
    generator: PreviewGenerator,
    result_sender: mpsc::UnboundedSender<PreviewResult>,
    result_receiver: mpsc::UnboundedReceiver<PreviewResult>,
    next_request_id: u64,
    latest: HashMap<PreviewKind, u64>,
    pending: usize,
}

impl PreviewLoader {
    /// Must be called from within a tokio runtime.
    pub fn new(generator: PreviewGenerator) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let (result_sender, result_receiver) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            generator,
            result_sender,
            result_receiver,
            next_request_id: 0,
            latest: HashMap::new(),
            pending: 0,
        })
    }

    /// Loader that decodes through ffmpeg using the configured sizes.
    pub fn with_ffmpeg(tools: FfmpegTools, config: PreviewConfig) -> Result<Self> {
        let generator: PreviewGenerator = Arc::new(move |request: &PreviewRequest| {
            generate_with_ffmpeg(request, &tools, &config)
        });
        Self::new(generator)
    }

    /// Queue generation for `source`. Any earlier request of the same kind
    /// becomes stale.
    pub fn request(&mut self, kind: PreviewKind, source: PathBuf) -> u64 {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.latest.insert(kind, request_id);
        self.pending += 1;

        let request = PreviewRequest { request_id, kind, source };
        let generator = self.generator.clone();
        let sender = self.result_sender.clone();
        log::debug!("Preview request {} for {:?}: {:?}", request_id, kind, request.source);

        self.runtime.spawn_blocking(move || {
            let result = generator(&request).map_err(|e| {
                log::debug!("Preview {} failed: {}", request.request_id, e);
                e.to_string()
            });
            let response = PreviewResult {
                request_id: request.request_id,
                kind: request.kind,
                source: request.source,
                result,
            };
            if let Err(e) = sender.send(response) {
                log::error!("Failed to deliver preview result: {}", e);
            }
        });
        request_id
    }

    /// Mark every in-flight request of `kind` as stale without starting a new one.
    pub fn invalidate(&mut self, kind: PreviewKind) {
        self.next_request_id += 1;
        self.latest.insert(kind, self.next_request_id);
    }

    pub fn is_current(&self, result: &PreviewResult) -> bool {
        self.latest.get(&result.kind) == Some(&result.request_id)
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    fn accept(&mut self, result: PreviewResult) -> Option<PreviewResult> {
        self.pending = self.pending.saturating_sub(1);
        if self.is_current(&result) {
            Some(result)
        } else {
            log::warn!(
                "Discarding stale {:?} preview {} for {:?}",
                result.kind,
                result.request_id,
                result.source
            );
            None
        }
    }

    /// Drain finished results without waiting. Stale ones are dropped.
    pub fn process_completed(&mut self) -> Vec<PreviewResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            if let Some(result) = self.accept(result) {
                results.push(result);
            }
        }
        results
    }

    /// Wait for the next current result. Returns `None` once nothing is in
    /// flight.
    pub async fn next_current(&mut self) -> Option<PreviewResult> {
        while self.pending > 0 {
            let result = self.result_receiver.recv().await?;
            if let Some(result) = self.accept(result) {
                return Some(result);
            }
        }
        None
    }
}

fn generate_with_ffmpeg(request: &PreviewRequest, tools: &FfmpegTools, config: &PreviewConfig) -> Result<PreviewOutput> {
    match request.kind {
        PreviewKind::Waveform(_) => {
            let data = WaveformData::generate(&request.source, tools)?;
            let envelope = WaveformEnvelope::compute(&data.samples, config.waveform_width as usize);
            Ok(PreviewOutput::Waveform(envelope))
        }
        PreviewKind::Thumbnails => {
            let mut source = FfmpegFrameSource::open(&request.source, tools.clone())?;
            let thumbnails = extract_thumbnails(&mut source, ThumbnailOptions::from(config))?;
            Ok(PreviewOutput::Thumbnails(thumbnails))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Generator that sleeps for the number of milliseconds in the file stem.
    fn sleepy_generator() -> PreviewGenerator {
        Arc::new(|request: &PreviewRequest| {
            let millis: u64 = request
                .source
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            std::thread::sleep(Duration::from_millis(millis));
            Ok(PreviewOutput::Waveform(WaveformEnvelope { columns: vec![(0.0, millis as f32)] }))
        })
    }

    #[tokio::test]
    async fn test_result_delivered() {
        let mut loader = PreviewLoader::new(sleepy_generator()).unwrap();
        let id = loader.request(PreviewKind::Thumbnails, PathBuf::from("0.mp4"));

        let result = loader.next_current().await.unwrap();
        assert_eq!(result.request_id, id);
        assert_eq!(loader.pending(), 0);
        assert!(loader.next_current().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_stale_result_is_discarded() {
        let mut loader = PreviewLoader::new(sleepy_generator()).unwrap();
        let kind = PreviewKind::Waveform(MediaKind::Video);
        let _first = loader.request(kind, PathBuf::from("300.mp4"));
        let second = loader.request(kind, PathBuf::from("10.mp4"));

        let result = loader.next_current().await.unwrap();
        assert_eq!(result.request_id, second);
        assert_eq!(result.source, PathBuf::from("10.mp4"));

        // The first request still finishes, but never surfaces
        assert!(loader.next_current().await.is_none());
        assert_eq!(loader.pending(), 0);
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let mut loader = PreviewLoader::new(sleepy_generator()).unwrap();
        loader.request(PreviewKind::Thumbnails, PathBuf::from("5.mp4"));
        loader.request(PreviewKind::Waveform(MediaKind::Audio), PathBuf::from("5.wav"));

        let mut delivered = 0;
        while loader.next_current().await.is_some() {
            delivered += 1;
        }
        assert_eq!(delivered, 2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_in_flight_result() {
        let mut loader = PreviewLoader::new(sleepy_generator()).unwrap();
        loader.request(PreviewKind::Thumbnails, PathBuf::from("20.mp4"));
        loader.invalidate(PreviewKind::Thumbnails);

        assert!(loader.next_current().await.is_none());
    }

    #[test]
    fn test_requires_runtime() {
        assert!(PreviewLoader::new(sleepy_generator()).is_err());
    }
}
