// =============================================================================
// PLAYBACK CONTROLLER - ONE TIMELINE, TWO TRANSPORTS
// =============================================================================
//
// The controller owns the timeline state and both transports. Every user
// action and every element callback goes through it; transports receive
// explicit commands and never read shared state themselves. Views subscribe
// to `TimelineEvent`s over a broadcast channel.
//
// =============================================================================

use std::time::Duration;
use tokio::sync::broadcast;

use crate::core::config::PlaybackConfig;
use crate::core::error::PlaybackError;

use super::element::MediaElement;
use super::timeline::{TimelineState, Track, TrimRange};
use super::transport::{AudioTransport, ProgressTick, VideoTransport};

/// State changes published to views.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    MediaLoaded { track: Track, duration: f64 },
    PositionChanged(f64),
    PlayingChanged(bool),
    TrimChanged(TrimRange),
    VolumeChanged { track: Track, effective: f64 },
    SpeedChanged(f64),
    Error { track: Track, message: String },
}

pub struct PlaybackController {
    state: TimelineState,
    video: Option<VideoTransport>,
    audio: Option<AudioTransport>,
    config: PlaybackConfig,
    events: broadcast::Sender<TimelineEvent>,
    video_ended_latch: bool,
    audio_ended_latch: bool,
}

impl PlaybackController {
    pub fn new(config: PlaybackConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: TimelineState::default(),
            video: None,
            audio: None,
            config,
            events,
            video_ended_latch: false,
            audio_ended_latch: false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.config.progress_interval_ms.max(1))
    }

    pub fn video(&self) -> Option<&VideoTransport> {
        self.video.as_ref()
    }

    pub fn audio(&self) -> Option<&AudioTransport> {
        self.audio.as_ref()
    }

    pub fn video_mut(&mut self) -> Option<&mut VideoTransport> {
        self.video.as_mut()
    }

    pub fn audio_mut(&mut self) -> Option<&mut AudioTransport> {
        self.audio.as_mut()
    }

    fn emit(&self, event: TimelineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Timeline length is driven by the video; an audio-only project uses the
    /// audio length.
    fn timeline_duration(&self) -> f64 {
        match (&self.video, &self.audio) {
            (Some(video), _) => video.duration(),
            (None, Some(audio)) => audio.duration().unwrap_or(0.0),
            (None, None) => 0.0,
        }
    }

    pub fn attach_video(&mut self, element: Box<dyn MediaElement>) {
        self.pause_all();
        self.set_playing_flag(false);
        self.video_ended_latch = false;
        let mut video = VideoTransport::new(element);
        video.set_volume(self.state.video.effective_volume());
        video.set_rate(self.state.speed);
        self.video = Some(video);

        let duration = self.timeline_duration();
        self.state.load_media(duration);
        log::info!("Video loaded ({:.2}s)", duration);
        self.emit(TimelineEvent::MediaLoaded { track: Track::Video, duration });
        self.emit(TimelineEvent::TrimChanged(self.state.trim));
        self.resync_audio();
    }

    pub fn attach_audio(&mut self, element: Box<dyn MediaElement>) {
        let mut audio = AudioTransport::new(element);
        audio.set_volume(self.state.audio.effective_volume());
        if self.config.audio_follows_speed {
            audio.set_rate(self.state.speed);
        }
        let duration = audio.duration().unwrap_or(0.0);
        if let Some(mut previous) = self.audio.replace(audio) {
            previous.pause();
        }
        self.audio_ended_latch = false;

        if self.video.is_none() {
            self.state.load_media(duration);
            self.emit(TimelineEvent::TrimChanged(self.state.trim));
        }
        log::info!("Audio loaded ({:.2}s)", duration);
        self.emit(TimelineEvent::MediaLoaded { track: Track::Audio, duration });
        self.resync_audio();
    }

    pub fn detach_audio(&mut self) {
        if let Some(mut audio) = self.audio.take() {
            audio.pause();
        }
        if self.video.is_none() {
            self.state.load_media(0.0);
        }
    }

    /// Re-read the timeline length after element metadata changed.
    pub fn refresh_duration(&mut self) {
        let duration = self.timeline_duration();
        if (duration - self.state.duration).abs() > f64::EPSILON {
            self.state.set_duration(duration);
            self.emit(TimelineEvent::TrimChanged(self.state.trim));
        }
    }

    pub fn set_playing(&mut self, playing: bool) {
        if !playing {
            self.pause_all();
            self.set_playing_flag(false);
            return;
        }
        if self.video.is_none() && self.audio.is_none() {
            log::debug!("Play requested with no media loaded");
            return;
        }

        // Playback restarts from the trim start once the out point is reached
        if self.state.position >= self.state.trim.end {
            self.seek(self.state.trim.start);
        }

        if let Some(video) = self.video.as_mut() {
            if let Err(e) = video.play() {
                self.handle_error(Track::Video, e);
                return;
            }
        }
        self.set_playing_flag(true);

        let position = self.state.position;
        let offset = self.state.audio_offset;
        let tolerance = self.config.drift_tolerance;
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.sync(position, offset, tolerance, true) {
                self.handle_error(Track::Audio, e);
            }
        }
    }

    fn set_playing_flag(&mut self, playing: bool) {
        if self.state.playing != playing {
            self.state.playing = playing;
            log::debug!("Playing: {}", playing);
            self.emit(TimelineEvent::PlayingChanged(playing));
        }
    }

    fn pause_all(&mut self) {
        if let Some(video) = self.video.as_mut() {
            video.pause();
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.pause();
        }
    }

    /// Jump to `time`, clamped into the trim range. Returns the position used.
    pub fn seek(&mut self, time: f64) -> f64 {
        let time = if time.is_finite() { time } else { self.state.trim.start };
        let position = self.state.clamp_to_trim(time);
        self.state.position = position;

        if let Some(video) = self.video.as_mut() {
            let duration = video.duration();
            if duration > 0.0 {
                video.seek_to_fraction(position / duration);
            }
        }
        self.resync_audio();
        self.emit(TimelineEvent::PositionChanged(position));
        position
    }

    fn resync_audio(&mut self) {
        let position = self.state.position;
        let offset = self.state.audio_offset;
        let tolerance = self.config.drift_tolerance;
        let playing = self.state.playing;
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.sync(position, offset, tolerance, playing) {
                self.handle_error(Track::Audio, e);
            }
        }
    }

    pub fn begin_scrub(&mut self) {
        self.state.seeking = true;
    }

    /// Finish a drag on the seek control at `time`.
    pub fn end_scrub(&mut self, time: f64) -> f64 {
        self.state.seeking = false;
        self.seek(time)
    }

    /// Feed a progress report from the video element.
    pub fn on_progress(&mut self, tick: ProgressTick) {
        let Some(played) = tick.position() else {
            return;
        };
        if self.state.seeking {
            return;
        }
        if self.state.playing && played >= self.state.trim.end {
            self.state.position = self.state.trim.end;
            self.set_playing(false);
            self.emit(TimelineEvent::PositionChanged(self.state.position));
            return;
        }
        let position = self.state.clamp_to_trim(played);
        self.state.position = position;
        self.resync_audio();
        self.emit(TimelineEvent::PositionChanged(position));
    }

    /// Poll the elements the way a periodic progress timer would: report the
    /// position and pick up end-of-media from either track. "Ended" fires
    /// once per transition, so a track that already finished does not keep
    /// stopping playback.
    pub fn tick(&mut self) {
        let (tick, video_ended) = match self.video.as_ref() {
            Some(video) => (Some(video.progress()), video.ended()),
            None => (
                self.audio
                    .as_ref()
                    .map(|audio| ProgressTick::at(audio.element().current_time() + self.state.audio_offset)),
                false,
            ),
        };
        let audio_ended = self.audio.as_ref().map(|audio| audio.ended()).unwrap_or(false);

        if let Some(tick) = tick {
            self.on_progress(tick);
        }

        let video_fired = video_ended && !self.video_ended_latch;
        let audio_fired = audio_ended && !self.audio_ended_latch;
        self.video_ended_latch = video_ended;
        self.audio_ended_latch = audio_ended;

        if video_fired && self.state.playing {
            self.on_ended(Track::Video);
        }
        if audio_fired && self.state.playing {
            self.on_ended(Track::Audio);
        }
    }

    /// Drive externally clocked elements forward, then poll them.
    pub fn advance(&mut self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        if let Some(video) = self.video.as_mut() {
            video.element_mut().advance_clock(seconds);
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.element_mut().advance_clock(seconds);
        }
        self.tick();
    }

    /// Either transport reaching its end stops playback.
    pub fn on_ended(&mut self, track: Track) {
        log::debug!("{:?} track ended", track);
        self.set_playing(false);
    }

    /// Decode or playback failure on `track`: logged, playback forced off.
    pub fn handle_error(&mut self, track: Track, error: PlaybackError) {
        log::error!("{:?} playback error: {}", track, error);
        self.pause_all();
        self.set_playing_flag(false);
        self.emit(TimelineEvent::Error { track, message: error.to_string() });
    }

    pub fn set_volume(&mut self, track: Track, volume: f64) {
        self.state.track_mut(track).volume = volume.clamp(0.0, 1.0);
        self.apply_volume(track);
    }

    pub fn set_muted(&mut self, track: Track, muted: bool) {
        self.state.track_mut(track).muted = muted;
        self.apply_volume(track);
    }

    pub fn toggle_mute(&mut self, track: Track) {
        let muted = !self.state.track(track).muted;
        self.set_muted(track, muted);
    }

    fn apply_volume(&mut self, track: Track) {
        let effective = self.state.track(track).effective_volume();
        match track {
            Track::Video => {
                if let Some(video) = self.video.as_mut() {
                    video.set_volume(effective);
                }
            }
            Track::Audio => {
                if let Some(audio) = self.audio.as_mut() {
                    audio.set_volume(effective);
                }
            }
        }
        self.emit(TimelineEvent::VolumeChanged { track, effective });
    }

    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 {
            log::warn!("Ignoring invalid playback speed {}", speed);
            return;
        }
        self.state.speed = speed;
        if let Some(video) = self.video.as_mut() {
            video.set_rate(speed);
        }
        if self.config.audio_follows_speed {
            if let Some(audio) = self.audio.as_mut() {
                audio.set_rate(speed);
            }
        }
        self.emit(TimelineEvent::SpeedChanged(speed));
    }

    pub fn set_audio_offset(&mut self, offset: f64) {
        if !offset.is_finite() {
            return;
        }
        self.state.audio_offset = offset;
        self.resync_audio();
    }

    pub fn set_trim(&mut self, start: f64, end: f64) {
        if !start.is_finite() || !end.is_finite() {
            log::warn!("Ignoring invalid trim {}-{}", start, end);
            return;
        }
        self.state.set_trim(start, end);
        let position = self.state.position;
        self.emit(TimelineEvent::TrimChanged(self.state.trim));
        self.seek(position);
    }

    pub fn zoom_in(&mut self) {
        self.state.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.state.zoom_out();
    }
}
