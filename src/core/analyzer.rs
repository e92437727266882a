//! Signal Analyzer: entropy, coherence and trend over the recent window
//!
//! Pure functions of the window contents. The window always includes the
//! reading currently being produced as its last element.

use crate::core::config::AnalyzerConfig;
use crate::types::SignalMetrics;
use crate::NEUTRAL;

/// Window statistics calculator
#[derive(Debug, Clone, Default)]
pub struct SignalAnalyzer {
    config: AnalyzerConfig,
}

impl SignalAnalyzer {
    /// Create analyzer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// How many readings (including the new one) to feed `analyze`
    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Derive all metrics from parallel raw / needle windows
    pub fn analyze(&self, raw_values: &[f64], needle_positions: &[f64]) -> SignalMetrics {
        SignalMetrics {
            entropy: self.entropy(raw_values),
            coherence: self.coherence(needle_positions),
            trend: trend(needle_positions),
            samples: needle_positions.len(),
        }
    }

    /// Shannon entropy of binned raw values, normalized by log2(bins)
    ///
    /// Fewer than two samples give the neutral 0.5.
    pub fn entropy(&self, raw_values: &[f64]) -> f64 {
        if raw_values.len() < 2 {
            return NEUTRAL;
        }

        let bins = self.config.entropy_bins.max(2);
        let mut counts = vec![0usize; bins];
        for v in raw_values {
            let idx = ((v.clamp(0.0, 1.0) * bins as f64) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let n = raw_values.len() as f64;
        let h: f64 = counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / n;
                -p * p.log2()
            })
            .sum();

        (h / (bins as f64).log2()).clamp(0.0, 1.0)
    }

    /// 1 / (1 + variance), with the needle measured in meter divisions
    pub fn coherence(&self, needle_positions: &[f64]) -> f64 {
        let division = self.config.needle_division;
        let scaled: Vec<f64> = needle_positions.iter().map(|p| p / division).collect();
        (1.0 / (1.0 + variance(&scaled))).clamp(f64::MIN_POSITIVE, 1.0)
    }
}

/// Population variance; 0.0 for fewer than two values
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Least-squares slope of the values against their index
///
/// Positive = rising, negative = falling, 0.0 for fewer than two values.
pub fn trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

// =============================================================================
// TESTS
// =============================================================================
