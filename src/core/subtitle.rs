use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::error::ValidationError;

fn timecode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-5]?[0-9]):([0-5][0-9])$").expect("timecode pattern is valid")
    })
}

/// Parse an `MM:SS` timecode into whole seconds.
pub fn parse_timecode(value: &str) -> Option<u32> {
    let caps = timecode_pattern().captures(value)?;
    let minutes: u32 = caps[1].parse().ok()?;
    let seconds: u32 = caps[2].parse().ok()?;
    Some(minutes * 60 + seconds)
}

/// Format seconds as a zero-padded `MM:SS` timecode. Fractions are truncated.
pub fn format_timecode(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format seconds as `M:SS` for transport displays.
pub fn format_clock(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{}:{:02}", mins, secs)
}

/// One timed caption line. Times stay as the user typed them; they are only
/// checked when an edit is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    pub start: String,
    pub end: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_length: Option<f64>,
}

impl Subtitle {
    pub fn new(start: impl Into<String>, end: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            text: text.into(),
            audio: None,
            audio_id: None,
            audio_length: None,
        }
    }

    /// The row a user gets when adding a new caption.
    pub fn blank() -> Self {
        Self::new("00:00", "00:00", "")
    }

    pub fn start_seconds(&self) -> Option<u32> {
        parse_timecode(&self.start)
    }

    pub fn end_seconds(&self) -> Option<u32> {
        parse_timecode(&self.end)
    }

    /// Check the timecodes are well formed and ordered.
    pub fn validate(&self) -> Result<(u32, u32), ValidationError> {
        let start = self.start_seconds().ok_or_else(|| ValidationError::InvalidFormat {
            field: "start",
            value: self.start.clone(),
        })?;
        let end = self.end_seconds().ok_or_else(|| ValidationError::InvalidFormat {
            field: "end",
            value: self.end.clone(),
        })?;
        if start >= end {
            return Err(ValidationError::StartNotBeforeEnd {
                start: self.start.clone(),
                end: self.end.clone(),
            });
        }
        Ok((start, end))
    }

    /// Whether `position` falls inside `[start, end)`. Rows with malformed
    /// times are never active.
    pub fn is_active_at(&self, position: f64) -> bool {
        match (self.start_seconds(), self.end_seconds()) {
            (Some(start), Some(end)) => position >= start as f64 && position < end as f64,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timecode() {
        assert_eq!(parse_timecode("00:00"), Some(0));
        assert_eq!(parse_timecode("01:30"), Some(90));
        assert_eq!(parse_timecode("9:05"), Some(545));
        assert_eq!(parse_timecode("59:59"), Some(3599));
    }

    #[test]
    fn test_parse_timecode_rejects_malformed() {
        assert_eq!(parse_timecode("60:00"), None);
        assert_eq!(parse_timecode("00:60"), None);
        assert_eq!(parse_timecode("1:5"), None);
        assert_eq!(parse_timecode("abc"), None);
        assert_eq!(parse_timecode("00:00:01"), None);
        assert_eq!(parse_timecode(""), None);
        assert_eq!(parse_timecode(" 00:01 "), None);
        assert_eq!(parse_timecode("00:01\n"), None);
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "00:00");
        assert_eq!(format_timecode(65.9), "01:05");
        assert_eq!(format_timecode(f64::NAN), "00:00");
        assert_eq!(format_clock(125.0), "2:05");
    }

    #[test]
    fn test_validate_ordering() {
        assert_eq!(Subtitle::new("00:01", "00:03", "hi").validate(), Ok((1, 3)));
        assert!(matches!(
            Subtitle::new("00:03", "00:03", "hi").validate(),
            Err(ValidationError::StartNotBeforeEnd { .. })
        ));
        assert!(matches!(
            Subtitle::new("00:04", "00:03", "hi").validate(),
            Err(ValidationError::StartNotBeforeEnd { .. })
        ));
        assert!(matches!(
            Subtitle::new("0:1", "00:03", "hi").validate(),
            Err(ValidationError::InvalidFormat { field: "start", .. })
        ));
    }

    #[test]
    fn test_active_interval() {
        let subtitle = Subtitle::new("00:01", "00:03", "hi");
        assert!(!subtitle.is_active_at(0.5));
        assert!(subtitle.is_active_at(1.0));
        assert!(subtitle.is_active_at(2.0));
        assert!(!subtitle.is_active_at(3.0));
        assert!(!subtitle.is_active_at(3.5));
    }

    #[test]
    fn test_backend_fields_round_trip() {
        let json = r#"{"start":"00:02","end":"00:04","text":"hello","audio_id":"a1","audio_length":1.5}"#;
        let subtitle: Subtitle = serde_json::from_str(json).unwrap();
        assert_eq!(subtitle.audio_id.as_deref(), Some("a1"));
        assert_eq!(subtitle.audio_length, Some(1.5));
        assert!(subtitle.audio.is_none());

        let back = serde_json::to_value(&subtitle).unwrap();
        assert!(back.get("audio").is_none());
        assert_eq!(back["audio_id"], "a1");
    }
}
