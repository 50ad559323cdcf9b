use crate::core::error::PlaybackError;

use super::element::MediaElement;

/// Progress report from the video element. `played_seconds` may be missing or
/// garbage while the element is still loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressTick {
    pub played_seconds: Option<f64>,
}

impl ProgressTick {
    pub fn at(seconds: f64) -> Self {
        Self { played_seconds: Some(seconds) }
    }

    /// The reported position, if it is usable.
    pub fn position(&self) -> Option<f64> {
        self.played_seconds.filter(|s| s.is_finite() && *s >= 0.0)
    }
}

pub struct VideoTransport {
    element: Box<dyn MediaElement>,
}

impl VideoTransport {
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self { element }
    }

    pub fn duration(&self) -> f64 {
        self.element.duration().filter(|d| d.is_finite()).unwrap_or(0.0)
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.element.play()
    }

    pub fn pause(&mut self) {
        self.element.pause();
    }

    /// Seek by fraction of the total duration.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.element.set_current_time(fraction * self.duration());
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.element.set_volume(volume);
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.element.set_playback_rate(rate);
    }

    pub fn progress(&self) -> ProgressTick {
        ProgressTick { played_seconds: Some(self.element.current_time()) }
    }

    pub fn ended(&self) -> bool {
        self.element.ended()
    }

    pub fn element(&self) -> &dyn MediaElement {
        self.element.as_ref()
    }

    pub fn element_mut(&mut self) -> &mut dyn MediaElement {
        self.element.as_mut()
    }
}

/// Where the audio track stands relative to a timeline position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioPlacement {
    /// The track starts later on the timeline.
    BeforeStart,
    Within(f64),
    /// The track already finished; holds the track duration.
    AfterEnd(f64),
}

/// An independently loaded audio track, shifted by an offset against the
/// video's zero point.
pub struct AudioTransport {
    element: Box<dyn MediaElement>,
}

impl AudioTransport {
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self { element }
    }

    pub fn duration(&self) -> Option<f64> {
        self.element.duration().filter(|d| d.is_finite())
    }

    pub fn placement(&self, timeline_position: f64, offset: f64) -> AudioPlacement {
        let target = timeline_position - offset;
        if target < 0.0 {
            return AudioPlacement::BeforeStart;
        }
        match self.duration() {
            Some(duration) if target >= duration => AudioPlacement::AfterEnd(duration),
            _ => AudioPlacement::Within(target),
        }
    }

    /// Bring the element in line with the timeline. The element is only moved
    /// when it has drifted more than `tolerance` from the target, so frequent
    /// progress ticks do not restart it.
    pub fn sync(&mut self, timeline_position: f64, offset: f64, tolerance: f64, playing: bool) -> Result<(), PlaybackError> {
        let target = match self.placement(timeline_position, offset) {
            AudioPlacement::BeforeStart => {
                self.element.pause();
                0.0
            }
            AudioPlacement::AfterEnd(duration) => {
                self.element.pause();
                duration
            }
            AudioPlacement::Within(target) => {
                if playing && self.element.is_paused() {
                    self.resync(target, tolerance);
                    return self.element.play();
                }
                if !playing {
                    self.element.pause();
                }
                target
            }
        };
        self.resync(target, tolerance);
        Ok(())
    }

    fn resync(&mut self, target: f64, tolerance: f64) {
        let drift = (self.element.current_time() - target).abs();
        if drift > tolerance {
            log::debug!("Audio drifted {:.3}s, moving to {:.3}s", drift, target);
            self.element.set_current_time(target);
        }
    }

    pub fn pause(&mut self) {
        self.element.pause();
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.element.set_volume(volume);
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.element.set_playback_rate(rate);
    }

    pub fn ended(&self) -> bool {
        self.element.ended()
    }

    pub fn element(&self) -> &dyn MediaElement {
        self.element.as_ref()
    }

    pub fn element_mut(&mut self) -> &mut dyn MediaElement {
        self.element.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::element::SimulatedElement;

    #[test]
    fn test_progress_tick_filters_garbage() {
        assert_eq!(ProgressTick::at(1.5).position(), Some(1.5));
        assert_eq!(ProgressTick::at(f64::NAN).position(), None);
        assert_eq!(ProgressTick::at(f64::INFINITY).position(), None);
        assert_eq!(ProgressTick { played_seconds: None }.position(), None);
    }

    #[test]
    fn test_video_fraction_seek() {
        let mut video = VideoTransport::new(Box::new(SimulatedElement::new(20.0)));
        video.seek_to_fraction(0.25);
        assert_eq!(video.progress().position(), Some(5.0));
    }

    #[test]
    fn test_audio_resync_respects_tolerance() {
        let mut audio = AudioTransport::new(Box::new(SimulatedElement::new(30.0)));
        audio.sync(5.0, 0.0, 0.1, false).unwrap();
        assert_eq!(audio.element().current_time(), 5.0);

        // Within tolerance: left alone
        audio.sync(5.05, 0.0, 0.1, false).unwrap();
        assert_eq!(audio.element().current_time(), 5.0);

        audio.sync(5.5, 0.0, 0.1, false).unwrap();
        assert_eq!(audio.element().current_time(), 5.5);
    }

    #[test]
    fn test_audio_offset_shifts_target() {
        let mut audio = AudioTransport::new(Box::new(SimulatedElement::new(30.0)));
        audio.sync(7.0, 2.0, 0.1, false).unwrap();
        assert_eq!(audio.element().current_time(), 5.0);
        assert_eq!(audio.placement(1.0, 2.0), AudioPlacement::BeforeStart);
    }

    #[test]
    fn test_audio_past_end_is_silent() {
        let mut audio = AudioTransport::new(Box::new(SimulatedElement::new(5.0)));
        audio.sync(7.0, 0.0, 0.1, true).unwrap();
        assert_eq!(audio.placement(7.0, 0.0), AudioPlacement::AfterEnd(5.0));
        assert!(audio.element().is_paused());
        assert_eq!(audio.element().current_time(), 5.0);
    }

    #[test]
    fn test_audio_starts_when_playing_within_range() {
        let mut audio = AudioTransport::new(Box::new(SimulatedElement::new(5.0)));
        audio.sync(2.0, 0.0, 0.1, true).unwrap();
        assert!(!audio.element().is_paused());
        assert_eq!(audio.element().current_time(), 2.0);
    }
}
