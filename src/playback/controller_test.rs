#[cfg(test)]
mod tests {

    use std::time::Duration;
    use crate::core::config::PlaybackConfig;
    use crate::core::error::PlaybackError;
    use crate::playback::controller::{PlaybackController, TimelineEvent};
    use crate::playback::element::SimulatedElement;
    use crate::playback::timeline::Track;
    use crate::playback::transport::ProgressTick;

    fn controller_with(video: Option<f64>, audio: Option<f64>) -> PlaybackController {
        let mut controller = PlaybackController::new(PlaybackConfig::default());
        if let Some(duration) = video {
            controller.attach_video(Box::new(SimulatedElement::new(duration)));
        }
        if let Some(duration) = audio {
            controller.attach_audio(Box::new(SimulatedElement::new(duration)));
        }
        controller
    }

    #[test]
    fn test_timeline_duration_follows_video() {
        let controller = controller_with(Some(10.0), Some(5.0));
        assert_eq!(controller.state().duration, 10.0);
        assert_eq!(controller.state().trim.end, 10.0);
    }

    #[test]
    fn test_audio_only_project_uses_audio_length() {
        let controller = controller_with(None, Some(42.0));
        assert_eq!(controller.state().duration, 42.0);
    }

    #[test]
    fn test_seek_past_audio_end_leaves_audio_silent() {
        let mut controller = controller_with(Some(10.0), Some(5.0));
        let position = controller.seek(7.0);

        assert_eq!(position, 7.0);
        let video = controller.video().unwrap().element();
        assert_eq!(video.current_time(), 7.0);
        let audio = controller.audio().unwrap().element();
        assert_eq!(audio.current_time(), 5.0);
        assert!(audio.is_paused());
    }

    #[test]
    fn test_seek_clamps_to_trim() {
        let mut controller = controller_with(Some(10.0), None);
        controller.set_trim(2.0, 6.0);

        assert_eq!(controller.seek(0.5), 2.0);
        assert_eq!(controller.seek(9.0), 6.0);
        assert_eq!(controller.seek(-4.0), 2.0);
        assert_eq!(controller.seek(f64::NAN), 2.0);
        assert_eq!(controller.seek(4.0), 4.0);
    }

    #[test]
    fn test_set_playing_starts_both_transports() {
        let mut controller = controller_with(Some(10.0), Some(8.0));
        controller.seek(1.0);
        controller.set_playing(true);

        assert!(controller.state().playing);
        assert!(!controller.video().unwrap().element().is_paused());
        assert!(!controller.audio().unwrap().element().is_paused());

        controller.set_playing(false);
        assert!(!controller.state().playing);
        assert!(controller.video().unwrap().element().is_paused());
        assert!(controller.audio().unwrap().element().is_paused());
    }

    #[test]
    fn test_autoplay_rejection_reports_not_playing() {
        let mut controller = controller_with(Some(10.0), None);
        let refusing = SimulatedElement::new(8.0).refusing_play(PlaybackError::Autoplay("blocked".into()));
        controller.attach_audio(Box::new(refusing));
        let mut events = controller.subscribe();

        controller.set_playing(true);

        assert!(!controller.state().playing);
        assert!(controller.video().unwrap().element().is_paused());
        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if let TimelineEvent::Error { track, .. } = event {
                assert_eq!(track, Track::Audio);
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn test_video_error_forces_pause() {
        let mut controller = PlaybackController::new(PlaybackConfig::default());
        let broken = SimulatedElement::new(10.0).refusing_play(PlaybackError::Decode("bad frame".into()));
        controller.attach_video(Box::new(broken));
        controller.set_playing(true);
        assert!(!controller.state().playing);
    }

    #[test]
    fn test_progress_ignores_garbage_ticks() {
        let mut controller = controller_with(Some(10.0), None);
        controller.on_progress(ProgressTick::at(3.0));
        assert_eq!(controller.state().position, 3.0);

        controller.on_progress(ProgressTick::at(f64::NAN));
        controller.on_progress(ProgressTick { played_seconds: None });
        assert_eq!(controller.state().position, 3.0);
    }

    #[test]
    fn test_scrubbing_suppresses_progress() {
        let mut controller = controller_with(Some(10.0), None);
        controller.begin_scrub();
        controller.on_progress(ProgressTick::at(6.0));
        assert_eq!(controller.state().position, 0.0);

        assert_eq!(controller.end_scrub(4.0), 4.0);
        assert!(!controller.state().seeking);
        controller.on_progress(ProgressTick::at(4.1));
        assert_eq!(controller.state().position, 4.1);
    }

    #[test]
    fn test_mute_forces_zero_and_restores_volume() {
        let mut controller = controller_with(Some(10.0), Some(10.0));
        controller.set_volume(Track::Audio, 0.6);
        assert_eq!(controller.audio().unwrap().element().volume(), 0.6);

        controller.set_muted(Track::Audio, true);
        assert_eq!(controller.audio().unwrap().element().volume(), 0.0);
        assert_eq!(controller.state().audio.volume, 0.6);

        controller.toggle_mute(Track::Audio);
        assert_eq!(controller.audio().unwrap().element().volume(), 0.6);

        // Tracks are independent
        assert_eq!(controller.video().unwrap().element().volume(), 1.0);
    }

    #[test]
    fn test_speed_applies_to_video_only_by_default() {
        let mut controller = controller_with(Some(10.0), Some(10.0));
        controller.set_speed(1.5);
        assert_eq!(controller.video().unwrap().element().playback_rate(), 1.5);
        assert_eq!(controller.audio().unwrap().element().playback_rate(), 1.0);

        controller.set_speed(0.0);
        assert_eq!(controller.state().speed, 1.5);
    }

    #[test]
    fn test_speed_follows_audio_when_configured() {
        let config = PlaybackConfig { audio_follows_speed: true, ..PlaybackConfig::default() };
        let mut controller = PlaybackController::new(config);
        controller.attach_video(Box::new(SimulatedElement::new(10.0)));
        controller.attach_audio(Box::new(SimulatedElement::new(10.0)));
        controller.set_speed(2.0);
        assert_eq!(controller.audio().unwrap().element().playback_rate(), 2.0);
    }

    #[test]
    fn test_audio_offset_applied_on_seek() {
        let mut controller = controller_with(Some(20.0), Some(20.0));
        controller.set_audio_offset(3.0);
        controller.seek(10.0);
        assert_eq!(controller.audio().unwrap().element().current_time(), 7.0);
    }

    #[test]
    fn test_small_drift_does_not_reseek_audio() {
        let mut controller = controller_with(Some(20.0), Some(20.0));
        controller.seek(5.0);
        let seeks_before = controller.audio().unwrap().element().current_time();
        controller.on_progress(ProgressTick::at(5.05));
        assert_eq!(controller.audio().unwrap().element().current_time(), seeks_before);
        controller.on_progress(ProgressTick::at(5.5));
        assert_eq!(controller.audio().unwrap().element().current_time(), 5.5);
    }

    #[test]
    fn test_reaching_trim_end_stops_playback() {
        let mut controller = controller_with(Some(10.0), None);
        controller.set_trim(0.0, 4.0);
        controller.set_playing(true);
        controller.on_progress(ProgressTick::at(4.2));
        assert!(!controller.state().playing);
        assert_eq!(controller.state().position, 4.0);

        // Playing again starts from the in point
        controller.set_playing(true);
        assert_eq!(controller.state().position, 0.0);
        assert!(controller.state().playing);
    }

    #[test]
    fn test_audio_end_stops_playback_once() {
        let mut controller = controller_with(Some(10.0), Some(2.0));
        controller.set_playing(true);

        for _ in 0..30 {
            controller.advance(Duration::from_millis(100));
        }
        assert!(!controller.state().playing);
        let stopped_at = controller.state().position;
        assert!(stopped_at >= 2.0 && stopped_at < 2.3, "stopped at {}", stopped_at);

        // The finished audio track does not stop playback again
        controller.set_playing(true);
        controller.tick();
        assert!(controller.state().playing);
    }

    #[test]
    fn test_video_end_stops_playback() {
        let mut controller = controller_with(Some(1.0), None);
        controller.set_playing(true);
        for _ in 0..15 {
            controller.advance(Duration::from_millis(100));
        }
        assert!(!controller.state().playing);
        assert_eq!(controller.state().position, 1.0);
    }

    #[test]
    fn test_events_published() {
        let mut controller = controller_with(Some(10.0), None);
        let mut events = controller.subscribe();
        controller.seek(3.0);
        controller.set_playing(true);

        assert_eq!(events.try_recv().ok(), Some(TimelineEvent::PositionChanged(3.0)));
        assert_eq!(events.try_recv().ok(), Some(TimelineEvent::PlayingChanged(true)));
    }

    #[test]
    fn test_non_finite_trim_is_ignored() {
        let mut controller = controller_with(Some(10.0), None);
        controller.set_trim(2.0, 8.0);
        controller.set_trim(f64::NAN, 5.0);
        controller.set_trim(1.0, f64::INFINITY);
        assert_eq!(controller.state().trim.start, 2.0);
        assert_eq!(controller.state().trim.end, 8.0);
        assert_eq!(controller.seek(9.0), 8.0);
    }

    #[test]
    fn test_paused_progress_stays_inside_trim() {
        let mut controller = controller_with(Some(10.0), None);
        controller.set_trim(2.0, 6.0);
        controller.on_progress(ProgressTick::at(9.0));
        assert_eq!(controller.state().position, 6.0);
        controller.on_progress(ProgressTick::at(0.5));
        assert_eq!(controller.state().position, 2.0);
    }

    #[test]
    fn test_negative_audio_length_does_not_panic_on_seek() {
        let mut controller = controller_with(Some(10.0), Some(-3.0));
        assert_eq!(controller.seek(1.0), 1.0);
        assert!(controller.audio().unwrap().element().is_paused());
    }

    #[test]
    fn test_zero_progress_interval_still_advances() {
        let config = PlaybackConfig { progress_interval_ms: 0, ..PlaybackConfig::default() };
        let controller = PlaybackController::new(config);
        assert_eq!(controller.progress_interval(), Duration::from_millis(1));
    }
}
