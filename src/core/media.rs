use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Guess a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        _ => return None,
    };
    Some(mime)
}

/// Classify by MIME prefix.
pub fn kind_for_mime(mime: &str) -> Option<MediaKind> {
    if mime.starts_with("video/") {
        Some(MediaKind::Video)
    } else if mime.starts_with("audio/") {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub mime: String,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let mime = mime_for_path(&path)?;
        let kind = kind_for_mime(mime)?;
        Some(Self { path, mime: mime.to_string(), kind })
    }
}

/// Keep the usable files and order videos ahead of audio. Relative order
/// within a kind is preserved.
pub fn sort_uploads(paths: impl IntoIterator<Item = PathBuf>) -> Vec<MediaFile> {
    let mut files: Vec<MediaFile> = paths
        .into_iter()
        .filter_map(|path| {
            let file = MediaFile::from_path(&path);
            if file.is_none() {
                log::warn!("Ignoring upload with unsupported type: {}", path.display());
            }
            file
        })
        .collect();
    files.sort_by_key(|file| file.kind);
    files
}

/// Opaque handle standing in for an object URL (`blob:<uuid>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaUrl(String);

impl MediaUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live object URLs. Each track holds at most one URL; replacing
/// it revokes the previous one, and dropping the library revokes everything.
#[derive(Debug, Default)]
pub struct MediaLibrary {
    entries: HashMap<MediaUrl, MediaFile>,
    current: HashMap<MediaKind, MediaUrl>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` as the current media for its kind and return its URL.
    pub fn create_url(&mut self, file: MediaFile) -> MediaUrl {
        let url = MediaUrl(format!("blob:{}", uuid::Uuid::new_v4()));
        let kind = file.kind;
        log::debug!("Created {} for {}", url, file.path.display());
        self.entries.insert(url.clone(), file);
        if let Some(previous) = self.current.insert(kind, url.clone()) {
            self.revoke(&previous);
        }
        url
    }

    pub fn revoke(&mut self, url: &MediaUrl) -> bool {
        let removed = self.entries.remove(url).is_some();
        if removed {
            log::debug!("Revoked {}", url);
        }
        self.current.retain(|_, current| current != url);
        removed
    }

    pub fn resolve(&self, url: &MediaUrl) -> Option<&MediaFile> {
        self.entries.get(url)
    }

    pub fn current(&self, kind: MediaKind) -> Option<&MediaUrl> {
        self.current.get(&kind)
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn revoke_all(&mut self) {
        let urls: Vec<MediaUrl> = self.entries.keys().cloned().collect();
        for url in urls {
            self.revoke(&url);
        }
    }
}

impl Drop for MediaLibrary {
    fn drop(&mut self) {
        self.revoke_all();
    }
}
