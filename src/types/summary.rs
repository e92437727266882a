//! Aggregate session statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NeedleState, Reading};

/// Per-state reading counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StateCounts {
    pub stuck: u64,
    pub rising: u64,
    pub falling: u64,
    pub floating: u64,
    pub rockslam: u64,
    pub theta_bop: u64,
}

impl StateCounts {
    fn slot(&mut self, state: NeedleState) -> &mut u64 {
        match state {
            NeedleState::Stuck => &mut self.stuck,
            NeedleState::Rising => &mut self.rising,
            NeedleState::Falling => &mut self.falling,
            NeedleState::Floating => &mut self.floating,
            NeedleState::Rockslam => &mut self.rockslam,
            NeedleState::ThetaBop => &mut self.theta_bop,
        }
    }

    pub fn increment(&mut self, state: NeedleState) {
        *self.slot(state) += 1;
    }

    pub fn get(&self, state: NeedleState) -> u64 {
        match state {
            NeedleState::Stuck => self.stuck,
            NeedleState::Rising => self.rising,
            NeedleState::Falling => self.falling,
            NeedleState::Floating => self.floating,
            NeedleState::Rockslam => self.rockslam,
            NeedleState::ThetaBop => self.theta_bop,
        }
    }

    pub fn total(&self) -> u64 {
        NeedleState::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// Most frequent state, ties resolved in `NeedleState::ALL` order
    pub fn dominant(&self) -> Option<NeedleState> {
        if self.total() == 0 {
            return None;
        }
        NeedleState::ALL
            .iter()
            .copied()
            .fold(None, |best: Option<NeedleState>, s| match best {
                Some(b) if self.get(b) >= self.get(s) => Some(b),
                _ => Some(s),
            })
    }
}

/// Lifetime statistics, updated on every reading
///
/// Covers every reading ever taken, including ones since evicted from history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub total_readings: u64,
    pub state_counts: StateCounts,
    pub tone_arm_sum: f64,
    pub peak_tone_arm: Option<f64>,
    pub coherence_sum: f64,
    pub floating_score_sum: f64,
    pub peak_floating_score: Option<f64>,
}

impl SessionStats {
    pub fn record(&mut self, reading: &Reading) {
        self.total_readings += 1;
        self.state_counts.increment(reading.needle_state);
        self.tone_arm_sum += reading.tone_arm;
        self.peak_tone_arm = Some(self.peak_tone_arm.map_or(reading.tone_arm, |p| p.max(reading.tone_arm)));
        self.coherence_sum += reading.coherence;
        self.floating_score_sum += reading.floating_needle_score;
        self.peak_floating_score = Some(
            self.peak_floating_score
                .map_or(reading.floating_needle_score, |p| p.max(reading.floating_needle_score)),
        );
    }

    fn mean(&self, sum: f64) -> Option<f64> {
        if self.total_readings == 0 {
            None
        } else {
            Some(sum / self.total_readings as f64)
        }
    }

    pub fn mean_tone_arm(&self) -> Option<f64> {
        self.mean(self.tone_arm_sum)
    }

    pub fn mean_coherence(&self) -> Option<f64> {
        self.mean(self.coherence_sum)
    }

    pub fn mean_floating_score(&self) -> Option<f64> {
        self.mean(self.floating_score_sum)
    }
}

/// Summary of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub active: bool,
    pub baseline_tone_arm: f64,
    pub sensitivity: f64,
    pub created_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    /// From creation to stop (or to the latest reading while active)
    pub duration_secs: f64,
    pub total_readings: u64,
    /// Readings currently retained in history
    pub history_len: usize,
    pub state_counts: StateCounts,
    pub dominant_state: Option<NeedleState>,
    pub mean_tone_arm: Option<f64>,
    pub peak_tone_arm: Option<f64>,
    pub mean_coherence: Option<f64>,
    pub mean_floating_score: Option<f64>,
    pub peak_floating_score: Option<f64>,
    pub floating_count: u64,
    pub last_reading: Option<Reading>,
}

/// Row of the session listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListing {
    pub session_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub total_readings: u64,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalQuality;

    fn reading(state: NeedleState, tone_arm: f64, coherence: f64) -> Reading {
        Reading {
            sequence: 1,
            timestamp: Utc::now(),
            raw_value: 0.5,
            tone_arm,
            needle_position: 0.0,
            needle_state: state,
            quality: SignalQuality::from_coherence(coherence),
            entropy: 0.5,
            coherence,
            trend: 0.0,
            floating_needle_score: coherence,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = SessionStats::default();
        assert_eq!(stats.mean_tone_arm(), None);
        assert_eq!(stats.peak_tone_arm, None);
        assert_eq!(stats.state_counts.dominant(), None);
    }

    #[test]
    fn test_record_accumulates() {
        let mut stats = SessionStats::default();
        stats.record(&reading(NeedleState::Floating, 2.0, 1.0));
        stats.record(&reading(NeedleState::Rising, 4.0, 0.5));
        stats.record(&reading(NeedleState::Floating, 3.0, 0.6));

        assert_eq!(stats.total_readings, 3);
        assert_eq!(stats.state_counts.floating, 2);
        assert_eq!(stats.state_counts.rising, 1);
        assert_eq!(stats.state_counts.total(), 3);
        assert!((stats.mean_tone_arm().unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(stats.peak_tone_arm, Some(4.0));
        assert!((stats.mean_coherence().unwrap() - 0.7).abs() < 1e-12);
        assert_eq!(stats.state_counts.dominant(), Some(NeedleState::Floating));
    }

    #[test]
    fn test_counts_serialize_by_state_name() {
        let mut counts = StateCounts::default();
        counts.increment(NeedleState::ThetaBop);
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["THETA_BOP"], 1);
        assert_eq!(json["FLOATING"], 0);
    }
}
