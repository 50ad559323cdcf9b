use serde::{Deserialize, Serialize};

use crate::core::subtitle::Subtitle;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessedVideo {
    pub video_id: String,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessVideoResponse {
    pub result: ProcessedVideo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoDetail {
    pub success: bool,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub transcripts: Vec<Subtitle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateVideoRequest<'a> {
    pub video_id: &'a str,
    pub transcripts: &'a [Subtitle],
    pub voice_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsModel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsModelsResponse {
    #[serde(default)]
    pub models: Vec<TtsModel>,
}
