//! Tunable engine configuration
//!
//! Defaults come from the crate-level constants; every threshold can be
//! overridden per registry.

use crate::types::{EngineError, EngineResult};
use crate::{
    ANALYSIS_WINDOW, ENTROPY_BINS, FLOATING_COHERENCE, HISTORY_CAPACITY, MIN_CLASSIFY_SAMPLES,
    NEEDLE_DIVISION, OSCILLATION_LOOKBACK, ROCKSLAM_DEFLECTION, ROCKSLAM_MIN_SIGN_CHANGES,
    SCORE_RECENT_SAMPLES, THETA_MAX_PERIOD, THETA_MIN_AMPLITUDE, THETA_MIN_SIGN_CHANGES,
    TONE_ARM_SCALE, TREND_EPSILON,
};

/// Settings for the window statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Readings (including the new one) fed to the analyzer
    pub window_size: usize,
    /// Histogram bins for entropy
    pub entropy_bins: usize,
    /// Needle units per division for the coherence variance
    pub needle_division: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_size: ANALYSIS_WINDOW,
            entropy_bins: ENTROPY_BINS,
            needle_division: NEEDLE_DIVISION,
        }
    }
}

/// Classification thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub rockslam_deflection: f64,
    pub rockslam_min_sign_changes: usize,
    pub oscillation_lookback: usize,
    pub theta_min_sign_changes: usize,
    pub theta_max_period: usize,
    pub theta_min_amplitude: f64,
    pub floating_coherence: f64,
    pub trend_epsilon: f64,
    pub min_samples: usize,
    pub score_recent_samples: usize,
    pub needle_division: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rockslam_deflection: ROCKSLAM_DEFLECTION,
            rockslam_min_sign_changes: ROCKSLAM_MIN_SIGN_CHANGES,
            oscillation_lookback: OSCILLATION_LOOKBACK,
            theta_min_sign_changes: THETA_MIN_SIGN_CHANGES,
            theta_max_period: THETA_MAX_PERIOD,
            theta_min_amplitude: THETA_MIN_AMPLITUDE,
            floating_coherence: FLOATING_COHERENCE,
            trend_epsilon: TREND_EPSILON,
            min_samples: MIN_CLASSIFY_SAMPLES,
            score_recent_samples: SCORE_RECENT_SAMPLES,
            needle_division: NEEDLE_DIVISION,
        }
    }
}

/// Everything a registry needs to run sessions
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub tone_arm_scale: f64,
    pub analyzer: AnalyzerConfig,
    pub classifier: ClassifierConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            tone_arm_scale: TONE_ARM_SCALE,
            analyzer: AnalyzerConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Override the analysis window size
    pub fn with_window(mut self, window_size: usize) -> Self {
        self.analyzer.window_size = window_size;
        self
    }

    /// Override the history capacity
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        if self.history_capacity == 0 {
            return Err(EngineError::invalid("history_capacity must be at least 1"));
        }
        if self.analyzer.window_size < 2 {
            return Err(EngineError::invalid("window_size must be at least 2"));
        }
        if self.analyzer.entropy_bins < 2 {
            return Err(EngineError::invalid("entropy_bins must be at least 2"));
        }
        if !positive(self.analyzer.needle_division) || !positive(self.classifier.needle_division) {
            return Err(EngineError::invalid("needle_division must be positive"));
        }
        if !positive(self.classifier.trend_epsilon) {
            return Err(EngineError::invalid("trend_epsilon must be positive"));
        }
        if self.classifier.oscillation_lookback < 2 {
            return Err(EngineError::invalid("oscillation_lookback must be at least 2"));
        }
        if !self.tone_arm_scale.is_finite() {
            return Err(EngineError::invalid("tone_arm_scale must be finite"));
        }
        Ok(())
    }
}

fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}
