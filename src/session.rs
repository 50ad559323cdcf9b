// =============================================================================
// EDITOR SESSION - EVERYTHING ONE OPEN PROJECT OWNS
// =============================================================================
//
// Uploads become object URLs and media elements, elements feed the playback
// controller, backend subtitles feed both the caption list and the speech cue
// player. Previews for the current media arrive from the background loader.
//
// =============================================================================

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::client::{normalize_video_id, BackendClient};
use crate::api::types::ProcessedVideo;
use crate::core::config::AppConfig;
use crate::core::error::ValidationError;
use crate::core::media::{sort_uploads, MediaFile, MediaKind, MediaLibrary, MediaUrl};
use crate::core::subtitle::Subtitle;
use crate::core::subtitle_list::{SubtitleField, SubtitleList};
use crate::playback::controller::PlaybackController;
use crate::playback::cue_player::{build_cues, CuePlayer};
use crate::playback::element::MediaOpener;
use crate::playback::timeline::Track;
use crate::preview::loader::{PreviewKind, PreviewLoader, PreviewOutput};
use crate::preview::thumbnail::Thumbnail;
use crate::preview::waveform::WaveformEnvelope;

/// What was sent on the last successful save.
#[derive(Debug, Clone)]
pub struct SaveRecord {
    pub video_id: String,
    pub voice_id: String,
    pub transcript_count: usize,
    pub saved_at: DateTime<Utc>,
}

pub struct EditorSession {
    config: AppConfig,
    library: MediaLibrary,
    controller: PlaybackController,
    subtitles: SubtitleList,
    cues: CuePlayer,
    opener: Box<dyn MediaOpener>,
    previews: Option<PreviewLoader>,
    thumbnails: Vec<Thumbnail>,
    waveforms: HashMap<MediaKind, WaveformEnvelope>,
    pub prompt: String,
    pub voice_id: String,
    video_id: Option<String>,
    last_save: Option<SaveRecord>,
}

impl EditorSession {
    pub fn new(config: AppConfig, opener: Box<dyn MediaOpener>) -> Self {
        let controller = PlaybackController::new(config.playback.clone());
        let cues = CuePlayer::new(config.cues.clone());
        let voice_id = config.default_voice_id.clone();
        Self {
            config,
            library: MediaLibrary::new(),
            controller,
            subtitles: SubtitleList::new(),
            cues,
            opener,
            previews: None,
            thumbnails: Vec::new(),
            waveforms: HashMap::new(),
            prompt: String::new(),
            voice_id,
            video_id: None,
            last_save: None,
        }
    }

    /// Generate previews in the background for every upload.
    pub fn with_previews(mut self, loader: PreviewLoader) -> Self {
        self.previews = Some(loader);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub fn subtitles(&self) -> &SubtitleList {
        &self.subtitles
    }

    pub fn cues(&self) -> &CuePlayer {
        &self.cues
    }

    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    pub fn waveform(&self, kind: MediaKind) -> Option<&WaveformEnvelope> {
        self.waveforms.get(&kind)
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn last_save(&self) -> Option<&SaveRecord> {
        self.last_save.as_ref()
    }

    // -------------------------------------------------------------------------
    // Uploads
    // -------------------------------------------------------------------------

    /// Load files into their tracks, videos first. Unsupported files are
    /// skipped; a file that fails to open is reported through the controller.
    pub fn upload(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> Vec<MediaUrl> {
        let mut urls = Vec::new();
        for file in sort_uploads(paths) {
            if let Some(url) = self.load_file(file) {
                urls.push(url);
            }
        }
        urls
    }

    fn load_file(&mut self, file: MediaFile) -> Option<MediaUrl> {
        let track = match file.kind {
            MediaKind::Video => Track::Video,
            MediaKind::Audio => Track::Audio,
        };
        let element = match self.opener.open_file(&file) {
            Ok(element) => element,
            Err(e) => {
                self.controller.handle_error(track, e);
                return None;
            }
        };

        let kind = file.kind;
        let path = file.path.clone();
        let url = self.library.create_url(file);
        match kind {
            MediaKind::Video => self.controller.attach_video(element),
            MediaKind::Audio => self.controller.attach_audio(element),
        }
        self.request_previews(kind, path);
        Some(url)
    }

    fn request_previews(&mut self, kind: MediaKind, path: PathBuf) {
        self.waveforms.remove(&kind);
        if kind == MediaKind::Video {
            self.thumbnails.clear();
        }
        let Some(loader) = self.previews.as_mut() else {
            return;
        };
        loader.request(PreviewKind::Waveform(kind), path.clone());
        if kind == MediaKind::Video {
            loader.request(PreviewKind::Thumbnails, path);
        }
    }

    fn store_preview(&mut self, kind: PreviewKind, output: PreviewOutput) {
        match (kind, output) {
            (PreviewKind::Thumbnails, PreviewOutput::Thumbnails(thumbnails)) => self.thumbnails = thumbnails,
            (PreviewKind::Waveform(media), PreviewOutput::Waveform(envelope)) => {
                self.waveforms.insert(media, envelope);
            }
            (kind, _) => log::warn!("Preview output does not match request kind {:?}", kind),
        }
    }

    /// Pick up finished previews without waiting.
    pub fn apply_previews(&mut self) -> usize {
        let Some(loader) = self.previews.as_mut() else {
            return 0;
        };
        let results = loader.process_completed();
        let count = results.len();
        for result in results {
            match result.result {
                Ok(output) => self.store_preview(result.kind, output),
                Err(e) => log::error!("Preview for {:?} failed: {}", result.source, e),
            }
        }
        count
    }

    /// Wait until every outstanding preview has finished.
    pub async fn wait_for_previews(&mut self) {
        loop {
            let Some(loader) = self.previews.as_mut() else {
                return;
            };
            let Some(result) = loader.next_current().await else {
                return;
            };
            match result.result {
                Ok(output) => self.store_preview(result.kind, output),
                Err(e) => log::error!("Preview for {:?} failed: {}", result.source, e),
            }
        }
    }

    // -------------------------------------------------------------------------
    // Playback
    // -------------------------------------------------------------------------

    /// Move the clock forward by `elapsed` and bring speech clips in line.
    pub fn advance(&mut self, elapsed: Duration) {
        self.controller.advance(elapsed);
        let state = self.controller.state();
        let (position, playing) = (state.position, state.playing);
        self.cues.tick(position, playing, elapsed, self.opener.as_ref());
    }

    pub fn toggle_mute(&mut self, track: Track) {
        self.controller.toggle_mute(track);
        if track == Track::Audio {
            self.cues.set_muted(self.controller.state().audio.muted);
        }
    }

    /// Trim is only editable when trim handles are enabled.
    pub fn set_trim(&mut self, start: f64, end: f64) -> bool {
        if !self.config.editor.trim_handles {
            log::debug!("Trim handles disabled; ignoring trim {:.2}-{:.2}", start, end);
            return false;
        }
        self.controller.set_trim(start, end);
        true
    }

    // -------------------------------------------------------------------------
    // Subtitles
    // -------------------------------------------------------------------------

    /// Replace the caption list with what the backend produced.
    pub fn load_processed(&mut self, processed: ProcessedVideo) {
        self.video_id = Some(normalize_video_id(&processed.video_id));
        self.load_subtitles(processed.subtitles);
    }

    pub fn load_subtitles(&mut self, subtitles: Vec<Subtitle>) {
        log::info!("Loaded {} subtitles", subtitles.len());
        self.subtitles = SubtitleList::from_subtitles(subtitles);
        self.refresh_cues();
    }

    fn refresh_cues(&mut self) {
        let cues = build_cues(&self.subtitles.subtitles(), self.config.backend_base());
        self.cues.set_cues(cues);
    }

    /// Rows active at the current position.
    pub fn active_subtitles(&self) -> Vec<usize> {
        self.subtitles.active_indices(self.controller.state().position)
    }

    pub fn add_subtitle(&mut self) {
        self.subtitles.add();
    }

    pub fn edit_subtitle(&mut self, index: usize) -> Result<(), ValidationError> {
        self.subtitles.begin_edit(index)
    }

    pub fn update_subtitle(&mut self, index: usize, field: SubtitleField, value: impl Into<String>) -> Result<(), ValidationError> {
        self.subtitles.update_draft(index, field, value)
    }

    pub fn save_subtitle(&mut self, index: usize) -> Result<(), ValidationError> {
        self.subtitles.save(index)?;
        self.refresh_cues();
        Ok(())
    }

    pub fn cancel_subtitle(&mut self, index: usize) -> Result<(), ValidationError> {
        self.subtitles.cancel(index)
    }

    pub fn delete_subtitle(&mut self, index: usize) -> Result<Subtitle, ValidationError> {
        let removed = self.subtitles.delete(index)?;
        self.refresh_cues();
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Backend
    // -------------------------------------------------------------------------

    /// Send the committed captions for re-rendering.
    pub async fn save(&mut self, client: &BackendClient) -> anyhow::Result<&SaveRecord> {
        let video_id = self
            .video_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No processed video to save"))?;
        if let Err((row, e)) = self.subtitles.validate_all() {
            anyhow::bail!("Subtitle row {} is invalid: {}", row, e);
        }
        let transcripts = self.subtitles.subtitles();
        client.update_video(&video_id, &transcripts, &self.voice_id).await?;

        Ok(self.last_save.insert(SaveRecord {
            video_id,
            voice_id: self.voice_id.clone(),
            transcript_count: transcripts.len(),
            saved_at: Utc::now(),
        }))
    }
}
