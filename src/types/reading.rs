//! Reading value object and live session events

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{NeedleState, SessionSummary, SignalQuality};

/// Statistics derived from the analysis window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalMetrics {
    /// Normalized Shannon dispersion of raw values (0.0-1.0)
    pub entropy: f64,
    /// Inverse-variance stability (0.0-1.0]
    pub coherence: f64,
    /// Needle slope per sample, signed
    pub trend: f64,
    /// Number of samples the metrics were derived from
    pub samples: usize,
}

/// One meter reading. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Position in the session, starting at 1
    pub sequence: u64,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Combined entropy sample (0.0-1.0)
    pub raw_value: f64,
    /// Baseline-adjusted magnitude (0.0-10.0)
    pub tone_arm: f64,
    /// Momentary deflection (-100.0-100.0)
    pub needle_position: f64,
    pub needle_state: NeedleState,
    pub quality: SignalQuality,
    pub entropy: f64,
    pub coherence: f64,
    pub trend: f64,
    /// Likelihood of a stable release state (0.0-1.0)
    pub floating_needle_score: f64,
}

impl Reading {
    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.needle_state.color();
        format!(
            "{} #{:<4} TA={:.2} | needle={:+7.2} | state={} | fn={:.3} | {}",
            self.needle_state.emoji(),
            self.sequence,
            self.tone_arm,
            self.needle_position,
            self.needle_state,
            self.floating_needle_score,
            self.quality,
        )
        .color(color)
        .to_string()
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "seq={} | raw={:.4} | ta={:.3} | needle={:.2} | state={} | quality={} | entropy={:.3} | coherence={:.3} | trend={:.3} | fn={:.3}",
            self.sequence,
            self.raw_value,
            self.tone_arm,
            self.needle_position,
            self.needle_state,
            self.quality,
            self.entropy,
            self.coherence,
            self.trend,
            self.floating_needle_score,
        )
    }
}

/// Live update message pushed to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A reading was appended
    Reading { reading: Reading },
    /// The session was stopped; carries the frozen summary
    Stopped { summary: SessionSummary },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reading {
        Reading {
            sequence: 7,
            timestamp: Utc::now(),
            raw_value: 0.5,
            tone_arm: 3.0,
            needle_position: 0.0,
            needle_state: NeedleState::Floating,
            quality: SignalQuality::Excellent,
            entropy: 0.0,
            coherence: 1.0,
            trend: 0.0,
            floating_needle_score: 1.0,
        }
    }

    #[test]
    fn test_field_names_on_the_wire() {
        let json = serde_json::to_value(sample()).unwrap();
        for field in [
            "timestamp", "raw_value", "tone_arm", "needle_position", "needle_state",
            "quality", "entropy", "coherence", "trend", "floating_needle_score",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(json["needle_state"], "FLOATING");
    }

    #[test]
    fn test_parseable_output_format() {
        let formatted = sample().to_parseable_string();
        assert!(formatted.contains("seq=7"));
        assert!(formatted.contains("state=FLOATING"));
        assert!(formatted.contains("quality=EXCELLENT"));
    }

    #[test]
    fn test_event_tagging() {
        let json = serde_json::to_value(SessionEvent::Reading { reading: sample() }).unwrap();
        assert_eq!(json["event"], "reading");
        assert_eq!(json["reading"]["sequence"], 7);
    }
}
