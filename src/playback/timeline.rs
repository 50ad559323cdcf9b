use serde::{Deserialize, Serialize};

/// Smallest trim window the handles may be dragged to.
pub const MIN_TRIM_LENGTH: f64 = 0.1;
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
const ZOOM_STEP: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

impl TrimRange {
    pub fn full(duration: f64) -> Self {
        Self { start: 0.0, end: duration.max(0.0) }
    }

    pub fn clamp(&self, time: f64) -> f64 {
        time.clamp(self.start, self.end)
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Pull both bounds inside `[0, duration]`.
    fn reclamp(&mut self, duration: f64) {
        let duration = duration.max(0.0);
        self.end = self.end.clamp(0.0, duration);
        self.start = self.start.clamp(0.0, self.end);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    pub muted: bool,
    pub volume: f64,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self { muted: false, volume: 1.0 }
    }
}

impl TrackSettings {
    /// Muting forces silence without touching the stored slider value.
    pub fn effective_volume(&self) -> f64 {
        if self.muted { 0.0 } else { self.volume }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    Video,
    Audio,
}

/// The single source of truth for what the editor is showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineState {
    pub position: f64,
    pub duration: f64,
    pub trim: TrimRange,
    pub speed: f64,
    pub video: TrackSettings,
    pub audio: TrackSettings,
    pub audio_offset: f64,
    pub playing: bool,
    /// Set while the user drags a seek control; progress ticks are ignored.
    pub seeking: bool,
    pub zoom: f64,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            position: 0.0,
            duration: 0.0,
            trim: TrimRange::full(0.0),
            speed: 1.0,
            video: TrackSettings::default(),
            audio: TrackSettings::default(),
            audio_offset: 0.0,
            playing: false,
            seeking: false,
            zoom: 1.0,
        }
    }
}

impl TimelineState {
    /// Reset for freshly loaded media.
    pub fn load_media(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.trim = TrimRange::full(self.duration);
        self.position = 0.0;
        self.playing = false;
        self.seeking = false;
    }

    /// Duration changed without a reload (e.g. metadata refined).
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.trim.reclamp(self.duration);
        self.position = self.trim.clamp(self.position);
    }

    pub fn clamp_to_trim(&self, time: f64) -> f64 {
        self.trim.clamp(time)
    }

    /// Move a trim bound, keeping at least `MIN_TRIM_LENGTH` between them.
    /// Non-finite bounds leave the trim untouched.
    pub fn set_trim(&mut self, start: f64, end: f64) {
        if !start.is_finite() || !end.is_finite() {
            return;
        }
        let start = start.clamp(0.0, self.duration);
        let end = end.clamp(0.0, self.duration);
        let (start, end) = if end - start < MIN_TRIM_LENGTH {
            let end = (start + MIN_TRIM_LENGTH).min(self.duration);
            ((end - MIN_TRIM_LENGTH).max(0.0), end)
        } else {
            (start, end)
        };
        self.trim = TrimRange { start, end };
        self.position = self.trim.clamp(self.position);
    }

    pub fn track(&self, track: Track) -> &TrackSettings {
        match track {
            Track::Video => &self.video,
            Track::Audio => &self.audio,
        }
    }

    pub fn track_mut(&mut self, track: Track) -> &mut TrackSettings {
        match track {
            Track::Video => &mut self.video,
            Track::Audio => &mut self.audio,
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Map a horizontal offset on a track of `width` pixels to a time.
    pub fn time_at(&self, x: f64, width: f64) -> f64 {
        if width <= 0.0 || self.duration <= 0.0 {
            return 0.0;
        }
        (x / (width * self.zoom) * self.duration).clamp(0.0, self.duration)
    }

    /// Playhead offset in pixels on a track of `width` pixels.
    pub fn playhead_x(&self, width: f64) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        self.position / self.duration * width * self.zoom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerMarker {
    pub time: f64,
    pub major: bool,
}

/// One marker per whole second, with a major tick every five.
pub fn ruler_markers(duration: f64) -> Vec<RulerMarker> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    (0..duration.ceil() as u32)
        .map(|i| RulerMarker { time: i as f64, major: i % 5 == 0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_media_resets_trim() {
        let mut state = TimelineState::default();
        state.position = 3.0;
        state.load_media(10.0);
        assert_eq!(state.trim, TrimRange { start: 0.0, end: 10.0 });
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn test_duration_change_reclamps_trim() {
        let mut state = TimelineState::default();
        state.load_media(10.0);
        state.set_trim(6.0, 9.0);
        state.position = 8.0;
        state.set_duration(5.0);
        assert_eq!(state.trim.end, 5.0);
        assert_eq!(state.trim.start, 5.0);
        assert_eq!(state.position, 5.0);
    }

    #[test]
    fn test_set_trim_keeps_minimum_window() {
        let mut state = TimelineState::default();
        state.load_media(10.0);
        state.set_trim(4.0, 4.0);
        assert!((state.trim.length() - MIN_TRIM_LENGTH).abs() < 1e-9);
        state.set_trim(-3.0, 50.0);
        assert_eq!(state.trim, TrimRange { start: 0.0, end: 10.0 });
    }

    #[test]
    fn test_mute_restores_slider_value() {
        let mut settings = TrackSettings { muted: false, volume: 0.35 };
        settings.muted = true;
        assert_eq!(settings.effective_volume(), 0.0);
        settings.muted = false;
        assert_eq!(settings.effective_volume(), 0.35);
    }

    #[test]
    fn test_zoom_bounds() {
        let mut state = TimelineState::default();
        for _ in 0..20 {
            state.zoom_in();
        }
        assert_eq!(state.zoom, MAX_ZOOM);
        for _ in 0..20 {
            state.zoom_out();
        }
        assert_eq!(state.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_click_position_maps_to_time() {
        let mut state = TimelineState::default();
        state.load_media(20.0);
        assert_eq!(state.time_at(250.0, 1000.0), 5.0);
        assert_eq!(state.time_at(-10.0, 1000.0), 0.0);
        assert_eq!(state.time_at(5000.0, 1000.0), 20.0);
        state.position = 10.0;
        assert_eq!(state.playhead_x(1000.0), 500.0);
    }

    #[test]
    fn test_ruler_markers() {
        let markers = ruler_markers(10.5);
        assert_eq!(markers.len(), 11);
        assert!(markers[0].major);
        assert!(!markers[1].major);
        assert!(markers[5].major);
        assert!(ruler_markers(0.0).is_empty());
    }
}
