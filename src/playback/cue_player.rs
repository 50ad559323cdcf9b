// =============================================================================
// CUE PLAYER - PER-SUBTITLE SPEECH CLIPS
// =============================================================================
//
// Each synthesized subtitle clip is a cue on the timeline. While the video
// plays, the cue under the playhead is opened, seeked to the right offset and
// faded in; the previous clip fades out underneath it.
//
// =============================================================================

use std::time::Duration;

use crate::core::config::CueConfig;
use crate::core::subtitle::Subtitle;

use super::element::{MediaElement, MediaOpener};
use super::fade::{Fade, FadeDirection};

#[derive(Debug, Clone, PartialEq)]
pub struct AudioCue {
    pub id: String,
    pub start: f64,
    pub end: f64,
    pub audio_length: f64,
    /// Where the following cue may begin without overlapping this one.
    pub next_start: f64,
    pub url: String,
    pub text: String,
}

impl AudioCue {
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }

    /// The cue holds the speech track from its start until the next cue
    /// begins or its clip runs out, whichever is first.
    pub fn owns(&self, position: f64) -> bool {
        position >= self.start && position < self.next_start
    }
}

/// Build cues from backend subtitles. Rows without a synthesized clip or with
/// a malformed start time are skipped.
pub fn build_cues(subtitles: &[Subtitle], backend_base: &str) -> Vec<AudioCue> {
    let timed: Vec<(f64, &Subtitle, &str, f64)> = subtitles
        .iter()
        .filter_map(|subtitle| {
            let start = subtitle.start_seconds()? as f64;
            let id = subtitle.audio_id.as_deref()?;
            let length = subtitle.audio_length.filter(|l| l.is_finite() && *l > 0.0)?;
            Some((start, subtitle, id, length))
        })
        .collect();

    timed
        .iter()
        .enumerate()
        .map(|(i, (start, subtitle, id, length))| {
            let end = start + length;
            let next_start = timed
                .get(i + 1)
                .map(|(next, ..)| next.min(end))
                .unwrap_or(end);
            AudioCue {
                id: id.to_string(),
                start: *start,
                end,
                audio_length: *length,
                next_start,
                url: subtitle
                    .audio
                    .clone()
                    .unwrap_or_else(|| format!("{}/audio/{}", backend_base, id)),
                text: subtitle.text.clone(),
            }
        })
        .collect()
}

struct SoundingClip {
    cue_id: String,
    element: Box<dyn MediaElement>,
    fade: Option<Fade>,
}

impl SoundingClip {
    fn fading_out(&self) -> bool {
        self.fade.as_ref().map(|f| f.direction() == FadeDirection::Out).unwrap_or(false)
    }

    fn begin_fade_out(&mut self, config: &CueConfig) {
        if self.fading_out() {
            return;
        }
        let fade = Fade::fade_out(self.element.as_mut(), Duration::from_millis(config.fade_out_ms), config.fade_steps);
        self.fade = Some(fade);
    }

    /// Returns true when the clip has gone silent for good.
    fn advance(&mut self, elapsed: Duration) -> bool {
        self.element.advance_clock(elapsed.as_secs_f64());
        let Some(fade) = self.fade.as_mut() else {
            return false;
        };
        let finished = fade.advance(elapsed, self.element.as_mut());
        if finished && fade.direction() == FadeDirection::In {
            self.fade = None;
            return false;
        }
        finished && fade.direction() == FadeDirection::Out
    }
}

pub struct CuePlayer {
    cues: Vec<AudioCue>,
    config: CueConfig,
    current: Option<SoundingClip>,
    releasing: Vec<SoundingClip>,
    muted: bool,
}

impl CuePlayer {
    pub fn new(config: CueConfig) -> Self {
        Self {
            cues: Vec::new(),
            config,
            current: None,
            releasing: Vec::new(),
            muted: false,
        }
    }

    pub fn set_cues(&mut self, cues: Vec<AudioCue>) {
        self.stop();
        self.cues = cues;
    }

    pub fn cues(&self) -> &[AudioCue] {
        &self.cues
    }

    pub fn active_cue(&self, position: f64) -> Option<&AudioCue> {
        self.cues.iter().find(|cue| cue.owns(position))
    }

    pub fn current_cue_id(&self) -> Option<&str> {
        self.current.as_ref().map(|clip| clip.cue_id.as_str())
    }

    /// Clips still audible, including ones fading out.
    pub fn sounding_count(&self) -> usize {
        self.releasing.len() + self.current.iter().filter(|c| !c.element.is_paused()).count()
    }

    pub fn current_element(&self) -> Option<&dyn MediaElement> {
        self.current.as_ref().map(|clip| clip.element.as_ref())
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(clip) = self.current.as_mut() {
            clip.element.set_muted(muted);
        }
        for clip in &mut self.releasing {
            clip.element.set_muted(muted);
        }
    }

    /// Silence everything immediately.
    pub fn stop(&mut self) {
        if let Some(mut clip) = self.current.take() {
            clip.element.pause();
        }
        for clip in &mut self.releasing {
            clip.element.pause();
        }
        self.releasing.clear();
    }

    fn release_current(&mut self) {
        if let Some(mut clip) = self.current.take() {
            clip.begin_fade_out(&self.config);
            if !clip.element.is_paused() {
                self.releasing.push(clip);
            }
        }
    }

    /// Bring clip playback in line with the timeline. Call on every progress
    /// tick with the wall time elapsed since the previous one.
    pub fn tick(&mut self, position: f64, playing: bool, elapsed: Duration, opener: &dyn MediaOpener) {
        self.releasing.retain_mut(|clip| !clip.advance(elapsed));
        if let Some(clip) = self.current.as_mut() {
            clip.advance(elapsed);
        }

        if !playing {
            self.release_current();
            return;
        }

        let Some(cue) = self.active_cue(position).cloned() else {
            self.release_current();
            return;
        };

        if let Some(clip) = self.current.as_mut() {
            if clip.cue_id == cue.id {
                // Fade out ahead of the cue end or the next cue
                if cue.next_start - position <= self.config.keep_alive_margin {
                    clip.begin_fade_out(&self.config);
                }
                return;
            }
        }

        self.release_current();
        self.start_cue(&cue, position, opener);
    }

    fn start_cue(&mut self, cue: &AudioCue, position: f64, opener: &dyn MediaOpener) {
        let offset = (position - cue.start).max(0.0);
        if cue.audio_length - offset < self.config.min_remaining {
            log::debug!("Skipping cue {}: only {:.2}s left", cue.id, cue.audio_length - offset);
            return;
        }

        let mut element = match opener.open_url(&cue.url, Some(cue.audio_length)) {
            Ok(element) => element,
            Err(e) => {
                log::error!("Failed to open clip {}: {}", cue.url, e);
                return;
            }
        };
        element.set_muted(self.muted);
        element.set_current_time(offset);
        if let Err(e) = element.play() {
            log::error!("Failed to play clip {}: {}", cue.id, e);
            return;
        }
        let fade = Fade::fade_in(element.as_mut(), Duration::from_millis(self.config.fade_in_ms), self.config.fade_steps);
        log::debug!("Started cue {} at +{:.2}s", cue.id, offset);
        self.current = Some(SoundingClip {
            cue_id: cue.id.clone(),
            element,
            fade: Some(fade),
        });
    }
}
