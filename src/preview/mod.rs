pub mod ffmpeg;
pub mod waveform;
pub mod thumbnail;
pub mod loader;

pub use ffmpeg::{ffmpeg_manager, FfmpegManager, FfmpegTools};
pub use waveform::*;
pub use thumbnail::*;
pub use loader::*;
