use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::core::config::AppConfig;

/// Caps how many ffmpeg/ffprobe processes run at once across all preview work.
pub struct FfmpegManager {
    active_count: AtomicUsize,
}

/// Releases a process slot when dropped.
struct Slot<'a>(&'a AtomicUsize);

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FfmpegManager {
    pub const MAX_PROCESSES: usize = 4;

    pub fn new() -> Self {
        Self {
            active_count: AtomicUsize::new(0),
        }
    }

    fn acquire(&self) -> Result<Slot<'_>> {
        let previous = self.active_count.fetch_add(1, Ordering::SeqCst);
        if previous >= Self::MAX_PROCESSES {
            self.active_count.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!(
                "Cannot run ffmpeg: {} processes already running (max: {})",
                previous,
                Self::MAX_PROCESSES
            );
        }
        Ok(Slot(&self.active_count))
    }

    /// Run `command` to completion, failing fast when the cap is reached.
    pub fn execute(&self, mut command: Command) -> Result<Output> {
        let _slot = self.acquire()?;
        log::debug!("Running {:?} ({} active)", command.get_program(), self.active_count());
        let output = command
            .output()
            .with_context(|| format!("Failed to start {:?}", command.get_program()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{:?} failed: {}", command.get_program(), stderr.trim());
        }
        Ok(output)
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }
}

impl Default for FfmpegManager {
    fn default() -> Self {
        Self::new()
    }
}

static FFMPEG_MANAGER: OnceLock<FfmpegManager> = OnceLock::new();

pub fn ffmpeg_manager() -> &'static FfmpegManager {
    FFMPEG_MANAGER.get_or_init(FfmpegManager::new)
}

/// Locations of the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegTools {
    /// An overridden ffmpeg path implies ffprobe lives next to it.
    pub fn from_config(config: &AppConfig) -> Self {
        let ffmpeg = config.ffmpeg_binary();
        let ffprobe = match ffmpeg.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(probe_name(&ffmpeg)),
            _ => PathBuf::from("ffprobe"),
        };
        Self { ffmpeg, ffprobe }
    }

    /// Container duration in seconds.
    pub fn probe_duration(&self, path: &Path) -> Result<f64> {
        let mut command = Command::new(&self.ffprobe);
        command
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path);
        let output = ffmpeg_manager().execute(command)?;
        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        parse_probe_duration(&info)
            .with_context(|| format!("No duration reported for {}", path.display()))
    }

    /// Decode the first audio stream to a mono 16-bit WAV file.
    pub fn decode_to_wav(&self, input: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i").arg(input)
            .arg("-map").arg("0:a:0")
            .arg("-af").arg("pan=mono|c0=c0")
            .arg("-acodec").arg("pcm_s16le")
            .arg("-ar").arg("44100")
            .arg("-y")
            .arg(output);
        ffmpeg_manager().execute(command)?;
        Ok(())
    }

    /// Decode the frame at `timestamp` seconds.
    pub fn grab_frame(&self, input: &Path, timestamp: f64) -> Result<image::DynamicImage> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-ss").arg(format!("{:.3}", timestamp.max(0.0)))
            .arg("-i").arg(input)
            .arg("-frames:v").arg("1")
            .arg("-f").arg("image2pipe")
            .arg("-vcodec").arg("png")
            .arg("pipe:1");
        let output = ffmpeg_manager().execute(command)?;
        let frame = image::load_from_memory(&output.stdout)
            .with_context(|| format!("Unreadable frame at {:.3}s", timestamp))?;
        Ok(frame)
    }
}

fn probe_name(ffmpeg: &Path) -> String {
    match ffmpeg.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("ffprobe.{}", ext),
        None => "ffprobe".to_string(),
    }
}

fn parse_probe_duration(info: &serde_json::Value) -> Option<f64> {
    info["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_cap() {
        let manager = FfmpegManager::new();
        let slots: Vec<_> = (0..FfmpegManager::MAX_PROCESSES)
            .map(|_| manager.acquire().unwrap())
            .collect();
        assert_eq!(manager.active_count(), FfmpegManager::MAX_PROCESSES);
        assert!(manager.acquire().is_err());
        assert_eq!(manager.active_count(), FfmpegManager::MAX_PROCESSES);

        drop(slots);
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_parse_probe_duration() {
        let info = serde_json::json!({ "format": { "duration": "12.480000" } });
        assert_eq!(parse_probe_duration(&info), Some(12.48));

        let missing = serde_json::json!({ "format": {} });
        assert_eq!(parse_probe_duration(&missing), None);
    }

    #[test]
    fn test_tools_follow_ffmpeg_override() {
        let mut config = AppConfig::default();
        assert_eq!(FfmpegTools::from_config(&config).ffprobe, PathBuf::from("ffprobe"));

        config.ffmpeg_path = Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        let tools = FfmpegTools::from_config(&config);
        assert_eq!(tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(tools.ffprobe, PathBuf::from("/opt/ffmpeg/bin/ffprobe"));
    }
}
