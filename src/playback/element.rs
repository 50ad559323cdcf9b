// =============================================================================
// MEDIA ELEMENT - THE SEAM BETWEEN PLAYBACK LOGIC AND A REAL PLAYER
// =============================================================================
//
// Transports own exactly one element each and are the only code that drives
// it. `SimulatedElement` is a clock-driven stand-in used by the simulate
// command and by tests.
//
// =============================================================================

use crate::core::error::PlaybackError;
use crate::core::media::MediaFile;

pub trait MediaElement: Send {
    /// Start playback. May be refused (e.g. autoplay policy).
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// True once playback ran off the end of the media.
    fn ended(&self) -> bool;

    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// `None` until metadata is known.
    fn duration(&self) -> Option<f64>;

    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);

    /// Move an externally clocked element forward by `seconds` of wall time.
    /// Elements that keep their own clock ignore this.
    fn advance_clock(&mut self, _seconds: f64) {}
}

/// Opens an element for an uploaded file or a remote clip.
pub trait MediaOpener: Send {
    fn open_file(&self, file: &MediaFile) -> Result<Box<dyn MediaElement>, PlaybackError>;
    fn open_url(&self, url: &str, duration_hint: Option<f64>) -> Result<Box<dyn MediaElement>, PlaybackError>;
}

/// An element whose clock only moves when `advance_clock` is called.
#[derive(Debug, Clone)]
pub struct SimulatedElement {
    duration: Option<f64>,
    position: f64,
    paused: bool,
    ended: bool,
    volume: f64,
    muted: bool,
    rate: f64,
    refuse_play: Option<PlaybackError>,
    /// Number of explicit position changes, for observing resync behaviour.
    pub seek_count: usize,
}

impl SimulatedElement {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration.max(0.0)),
            position: 0.0,
            paused: true,
            ended: false,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            refuse_play: None,
            seek_count: 0,
        }
    }

    /// Make every `play` call fail with `error`.
    pub fn refusing_play(mut self, error: PlaybackError) -> Self {
        self.refuse_play = Some(error);
        self
    }

    /// Output level as a listener would hear it.
    pub fn audible_volume(&self) -> f64 {
        if self.muted || self.paused { 0.0 } else { self.volume }
    }
}

impl MediaElement for SimulatedElement {
    fn play(&mut self) -> Result<(), PlaybackError> {
        if let Some(err) = &self.refuse_play {
            return Err(err.clone());
        }
        if self.duration.is_none() {
            return Err(PlaybackError::NotLoaded);
        }
        if self.ended {
            self.position = 0.0;
            self.ended = false;
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn ended(&self) -> bool {
        self.ended
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn set_current_time(&mut self, seconds: f64) {
        let upper = self.duration.unwrap_or(f64::MAX).max(0.0);
        self.position = seconds.clamp(0.0, upper);
        self.ended = false;
        self.seek_count += 1;
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn advance_clock(&mut self, seconds: f64) {
        if self.paused {
            return;
        }
        self.position += seconds * self.rate;
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.position = duration;
                self.paused = true;
                self.ended = true;
            }
        }
    }
}

/// Opens simulated elements, taking durations from a probe function.
pub struct SimulatedOpener<P> {
    probe: P,
}

impl<P> SimulatedOpener<P>
where
    P: Fn(&std::path::Path) -> Option<f64> + Send,
{
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P> MediaOpener for SimulatedOpener<P>
where
    P: Fn(&std::path::Path) -> Option<f64> + Send,
{
    fn open_file(&self, file: &MediaFile) -> Result<Box<dyn MediaElement>, PlaybackError> {
        let duration = (self.probe)(&file.path)
            .ok_or_else(|| PlaybackError::Decode(file.path.display().to_string()))?;
        Ok(Box::new(SimulatedElement::new(duration)))
    }

    fn open_url(&self, url: &str, duration_hint: Option<f64>) -> Result<Box<dyn MediaElement>, PlaybackError> {
        let duration = duration_hint.ok_or_else(|| PlaybackError::Unsupported(url.to_string()))?;
        Ok(Box::new(SimulatedElement::new(duration)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_clock_stops_at_end() {
        let mut element = SimulatedElement::new(2.0);
        element.play().unwrap();
        element.advance_clock(1.5);
        assert_eq!(element.current_time(), 1.5);
        element.advance_clock(1.0);
        assert_eq!(element.current_time(), 2.0);
        assert!(element.ended());
        assert!(element.is_paused());
    }

    #[test]
    fn test_simulated_rate_scales_clock() {
        let mut element = SimulatedElement::new(10.0);
        element.set_playback_rate(2.0);
        element.play().unwrap();
        element.advance_clock(1.0);
        assert_eq!(element.current_time(), 2.0);
    }

    #[test]
    fn test_refused_play_stays_paused() {
        let mut element = SimulatedElement::new(3.0)
            .refusing_play(PlaybackError::Autoplay("blocked".into()));
        assert!(element.play().is_err());
        assert!(element.is_paused());
        assert_eq!(element.audible_volume(), 0.0);
    }

    #[test]
    fn test_negative_duration_pins_to_zero() {
        let mut element = SimulatedElement::new(-3.0);
        assert_eq!(element.duration(), Some(0.0));
        element.set_current_time(1.0);
        assert_eq!(element.current_time(), 0.0);
    }
}
