//! Needle State Classifier
//!
//! Priority order, first match wins:
//! - ROCKSLAM: |needle| > 60 with sign changes in the lookback
//! - THETA_BOP: rhythmic sign changes (every 1-3 samples) above the amplitude floor,
//!   or a lookback that flips sign on every sample
//! - FLOATING: coherence > 0.75 and |trend| < ε
//! - RISING: trend > ε
//! - FALLING: trend < -ε
//! - STUCK: fallback
//!
//! Oscillation is judged on the deflection `2·(raw − 0.5)`, not on the needle,
//! so a low sensitivity cannot hide a swinging signal.
//! The floating-needle score is computed for every reading, whatever the state.

use crate::core::analyzer::variance;
use crate::core::config::ClassifierConfig;
use crate::types::{NeedleState, SignalMetrics, SignalQuality};
use crate::{NEUTRAL, SCORE_WEIGHT_COHERENCE, SCORE_WEIGHT_FLATNESS, SCORE_WEIGHT_STABILITY};

/// Below this magnitude a deflection has no sign
const SIGN_DEADBAND: f64 = 1e-9;

/// Classifier verdict for one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub state: NeedleState,
    pub quality: SignalQuality,
    pub floating_needle_score: f64,
}

/// Maps window statistics to a needle state
#[derive(Debug, Clone, Default)]
pub struct NeedleClassifier {
    config: ClassifierConfig,
}

impl NeedleClassifier {
    /// Create classifier with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify the newest reading.
    ///
    /// `raw_window` and `needle_window` are oldest first, the same length,
    /// and end with the current reading.
    pub fn classify(&self, raw_window: &[f64], needle_window: &[f64], metrics: &SignalMetrics) -> Classification {
        let quality = SignalQuality::from_coherence(metrics.coherence);

        if needle_window.len() < self.config.min_samples.max(1) {
            return Classification {
                state: NeedleState::Stuck,
                quality,
                floating_needle_score: NEUTRAL,
            };
        }

        Classification {
            state: self.state_for(raw_window, needle_window, metrics),
            quality,
            floating_needle_score: self.floating_score(needle_window, metrics),
        }
    }

    fn state_for(&self, raw_window: &[f64], needle_window: &[f64], metrics: &SignalMetrics) -> NeedleState {
        let cfg = &self.config;
        let current = needle_window.last().copied().unwrap_or(0.0);
        let lookback: Vec<f64> = tail(raw_window, cfg.oscillation_lookback)
            .iter()
            .map(|&raw| deflection(raw))
            .collect();
        let changes = sign_change_positions(&lookback);

        if current.abs() > cfg.rockslam_deflection && changes.len() >= cfg.rockslam_min_sign_changes {
            return NeedleState::Rockslam;
        }

        if self.is_theta_bop(&lookback, &changes) {
            return NeedleState::ThetaBop;
        }

        let flat = metrics.trend.abs() < cfg.trend_epsilon;
        if flat && metrics.coherence > cfg.floating_coherence {
            return NeedleState::Floating;
        }

        if metrics.trend > cfg.trend_epsilon {
            NeedleState::Rising
        } else if metrics.trend < -cfg.trend_epsilon {
            NeedleState::Falling
        } else {
            NeedleState::Stuck
        }
    }

    /// Above the amplitude floor, still going, and either enough rhythmic
    /// sign changes or a flip on every signed sample
    fn is_theta_bop(&self, lookback: &[f64], changes: &[usize]) -> bool {
        let cfg = &self.config;
        if changes.len() < 2 {
            return false;
        }

        let amplitude = lookback.iter().map(|v| v.abs()).sum::<f64>() / lookback.len() as f64;
        if amplitude < cfg.theta_min_amplitude {
            return false;
        }

        let signed = lookback.iter().filter(|v| v.abs() > SIGN_DEADBAND).count();
        if changes.len() + 1 == signed {
            return true;
        }

        let rhythmic = changes.windows(2).all(|w| w[1] - w[0] <= cfg.theta_max_period);
        let ongoing = changes
            .last()
            .map_or(false, |&last| lookback.len() - 1 - last < cfg.theta_max_period);
        changes.len() >= cfg.theta_min_sign_changes && rhythmic && ongoing
    }

    /// Weighted coherence, flatness and recent stability, in [0,1]
    pub fn floating_score(&self, needle_window: &[f64], metrics: &SignalMetrics) -> f64 {
        let cfg = &self.config;
        let flatness = 1.0 / (1.0 + metrics.trend.abs() / cfg.trend_epsilon);

        let recent: Vec<f64> = tail(needle_window, cfg.score_recent_samples)
            .iter()
            .map(|p| p / cfg.needle_division)
            .collect();
        let stability = 1.0 / (1.0 + variance(&recent));

        let score = metrics.coherence * SCORE_WEIGHT_COHERENCE
            + flatness * SCORE_WEIGHT_FLATNESS
            + stability * SCORE_WEIGHT_STABILITY;

        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            NEUTRAL
        }
    }
}

/// Signed swing of a raw value around neutral, in [-1, 1]
fn deflection(raw: f64) -> f64 {
    (raw - NEUTRAL) * 2.0
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Indices at which the sign flips relative to the previous signed sample
fn sign_change_positions(values: &[f64]) -> Vec<usize> {
    let mut changes = Vec::new();
    let mut last_sign: Option<bool> = None;

    for (i, v) in values.iter().enumerate() {
        if v.abs() <= SIGN_DEADBAND {
            continue;
        }
        let positive = *v > 0.0;
        if let Some(prev) = last_sign {
            if prev != positive {
                changes.push(i);
            }
        }
        last_sign = Some(positive);
    }

    changes
}

// =============================================================================
// TESTS
// =============================================================================
