pub mod core;
pub mod playback;
pub mod preview;
pub mod api;
pub mod session;
