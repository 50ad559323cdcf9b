use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::core::error::ApiError;
use crate::core::media::MediaFile;
use crate::core::subtitle::Subtitle;

use super::types::{
    ProcessVideoResponse, ProcessedVideo, SuccessResponse, TtsModel, TtsModelsResponse, UpdateVideoRequest,
    VideoDetail,
};

/// Strip the storage prefix and URL escaping the backend puts on video ids.
pub fn normalize_video_id(raw: &str) -> String {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    };
    decoded.replacen("files/", "", 1)
}

/// Client for the rendering backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn audio_url(&self, audio_id: &str) -> String {
        self.url(&format!("/audio/{}", audio_id))
    }

    pub fn rendered_video_url(&self, video_id: &str) -> String {
        self.url(&format!("/videos/{}", normalize_video_id(video_id)))
    }

    /// Upload a video with a prompt; the backend transcribes and voices it.
    pub async fn process_video(&self, video: &MediaFile, prompt: &str) -> Result<ProcessedVideo, ApiError> {
        let bytes = tokio::fs::read(&video.path).await?;
        let file_name = video
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&video.mime)?;
        let form = reqwest::multipart::Form::new()
            .part("video", part)
            .text("prompt", prompt.to_string());

        log::info!("Uploading {} for processing", video.path.display());
        let response = self
            .http
            .post(self.url("/process-video"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: ProcessVideoResponse = response.json().await?;
        log::info!(
            "Backend returned video {} with {} subtitles",
            body.result.video_id,
            body.result.subtitles.len()
        );
        Ok(body.result)
    }

    pub async fn video_detail(&self, video_id: &str) -> Result<VideoDetail, ApiError> {
        let id = normalize_video_id(video_id);
        let detail: VideoDetail = self
            .http
            .get(self.url(&format!("/video/{}/detail", id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !detail.success {
            return Err(ApiError::Rejected(format!("no detail for video {}", id)));
        }
        Ok(detail)
    }

    /// Send edited transcripts and trigger a re-render.
    pub async fn update_video(&self, video_id: &str, transcripts: &[Subtitle], voice_id: &str) -> Result<(), ApiError> {
        let id = normalize_video_id(video_id);
        let request = UpdateVideoRequest {
            video_id: &id,
            transcripts,
            voice_id,
        };
        let response: SuccessResponse = self
            .http
            .post(self.url(&format!("/video/{}/update", id)))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.success {
            return Err(ApiError::Rejected(format!("update of video {} failed", id)));
        }
        log::info!("Saved {} transcripts for video {}", transcripts.len(), id);
        Ok(())
    }

    /// Stream the rendered video into `output`. Returns the bytes written.
    pub async fn download_video(&self, video_id: &str, output: &Path) -> Result<u64, ApiError> {
        let mut response = self
            .http
            .get(self.rendered_video_url(video_id))
            .send()
            .await?
            .error_for_status()?;

        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::File::create(output).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        log::info!("Downloaded {} bytes to {}", written, output.display());
        Ok(written)
    }

    pub async fn tts_models(&self) -> Result<Vec<TtsModel>, ApiError> {
        let response: TtsModelsResponse = self
            .http
            .get(self.url("/tts-models"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.models)
    }

    /// Fetch one synthesized speech clip.
    pub async fn fetch_audio(&self, audio_id: &str) -> Result<Vec<u8>, ApiError> {
        let bytes = self
            .http
            .get(self.audio_url(audio_id))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// File name the browser would have offered for a rendered video.
pub fn download_file_name(video_id: &str) -> String {
    format!("{}.mp4", normalize_video_id(video_id))
}
