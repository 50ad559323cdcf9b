use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RGBA colour stored as four bytes in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub progress_interval_ms: u64,
    pub drift_tolerance: f64,
    /// Apply the playback speed to the separate audio track as well as the video.
    pub audio_follows_speed: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            drift_tolerance: 0.1,
            audio_follows_speed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub thumbnail_count: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub jpeg_quality: u8,
    pub waveform_width: u32,
    pub waveform_height: u32,
    pub waveform_fill: Rgba,
    pub waveform_background: Rgba,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            thumbnail_count: 20,
            thumbnail_width: 120,
            thumbnail_height: 80,
            jpeg_quality: 70,
            waveform_width: 800,
            waveform_height: 60,
            waveform_fill: Rgba([33, 150, 243, 77]),
            waveform_background: Rgba([19, 47, 76, 255]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    pub fade_steps: u32,
    /// A clip with less than this many seconds left is not started.
    pub min_remaining: f64,
    /// The sounding clip is left alone while more than this many seconds remain.
    pub keep_alive_margin: f64,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: 300,
            fade_out_ms: 500,
            fade_steps: 20,
            min_remaining: 0.2,
            keep_alive_margin: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub trim_handles: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            trim_handles: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub default_voice_id: String,
    pub ffmpeg_path: Option<PathBuf>,
    pub playback: PlaybackConfig,
    pub preview: PreviewConfig,
    pub cues: CueConfig,
    pub editor: EditorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            default_voice_id: "AZnzlk1XvdvUeBnXmlld".to_string(),
            ffmpeg_path: None,
            playback: PlaybackConfig::default(),
            preview: PreviewConfig::default(),
            cues: CueConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &PathBuf) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), replacing it with defaults", e);
                    let new_config = Self::default();
                    new_config.save_to(config_path)
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dub-editor")
            .join("config.json")
    }

    /// Backend base URL without a trailing slash.
    pub fn backend_base(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    pub fn ffmpeg_binary(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }
}
