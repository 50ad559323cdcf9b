use std::time::Duration;

use super::element::MediaElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// A stepped volume ramp applied to one element. Fading out ends by pausing
/// the element.
#[derive(Debug, Clone)]
pub struct Fade {
    direction: FadeDirection,
    step_delta: f64,
    step_interval: Duration,
    carried: Duration,
    finished: bool,
}

impl Fade {
    /// Start a fade-in: the element drops to silence and rises to full volume
    /// over `duration`.
    pub fn fade_in(element: &mut dyn MediaElement, duration: Duration, steps: u32) -> Self {
        let steps = steps.max(1);
        element.set_volume(0.0);
        Self {
            direction: FadeDirection::In,
            step_delta: 1.0 / steps as f64,
            step_interval: duration / steps,
            carried: Duration::ZERO,
            finished: false,
        }
    }

    /// Start a fade-out from the element's current volume.
    pub fn fade_out(element: &mut dyn MediaElement, duration: Duration, steps: u32) -> Self {
        let steps = steps.max(1);
        let start = element.volume();
        let finished = start <= 0.0;
        if finished {
            element.pause();
        }
        Self {
            direction: FadeDirection::Out,
            step_delta: start / steps as f64,
            step_interval: duration / steps,
            carried: Duration::ZERO,
            finished,
        }
    }

    pub fn direction(&self) -> FadeDirection {
        self.direction
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply every step that fell due within `elapsed`. Returns true once the
    /// ramp has completed.
    pub fn advance(&mut self, elapsed: Duration, element: &mut dyn MediaElement) -> bool {
        if self.finished {
            return true;
        }
        self.carried += elapsed;
        while !self.finished && self.carried >= self.step_interval {
            self.carried -= self.step_interval;
            self.step(element);
        }
        self.finished
    }

    fn step(&mut self, element: &mut dyn MediaElement) {
        let volume = element.volume();
        match self.direction {
            FadeDirection::In => {
                if volume + self.step_delta < 1.0 {
                    element.set_volume((volume + self.step_delta).min(1.0));
                } else {
                    element.set_volume(1.0);
                    self.finished = true;
                }
            }
            FadeDirection::Out => {
                if volume - self.step_delta > 0.0 {
                    element.set_volume((volume - self.step_delta).max(0.0));
                } else {
                    element.set_volume(0.0);
                    element.pause();
                    self.finished = true;
                }
            }
        }
    }
}
