//! Attunement: blended-entropy signal engine
//!
//! EntropyCombiner → SignalHistory → SignalAnalyzer → NeedleClassifier,
//! orchestrated per session by the SessionRegistry.

pub mod core;
pub mod types;

// =============================================================================
// ENTROPY WEIGHTS [C] - sum = 1.0
// =============================================================================

/// Cryptographically strong source (OS RNG)
pub const WEIGHT_CRYPTO: f64 = 0.4;
/// Fast pseudo-random generator
pub const WEIGHT_PRNG: f64 = 0.3;
/// Time-derived fluctuation
pub const WEIGHT_TIME: f64 = 0.2;
/// Feedback from the session's own recent output pool
pub const WEIGHT_FEEDBACK: f64 = 0.1;

/// Number of recent combined outputs the feedback pool averages
pub const FEEDBACK_POOL_SIZE: usize = 10;

/// Neutral value used wherever there is no data yet
pub const NEUTRAL: f64 = 0.5;

// =============================================================================
// SESSION / METER MAPPING
// =============================================================================

/// Tone arm used when a caller does not supply one
pub const DEFAULT_BASELINE_TONE_ARM: f64 = 3.0;

/// Sensitivity used when a caller does not supply one
pub const DEFAULT_SENSITIVITY: f64 = 1.0;

/// Readings retained per session
pub const HISTORY_CAPACITY: usize = 1000;

/// Tone arm range
pub const TONE_ARM_MIN: f64 = 0.0;
pub const TONE_ARM_MAX: f64 = 10.0;

/// Tone arm swing per unit of (raw - 0.5) at sensitivity 1.0
pub const TONE_ARM_SCALE: f64 = 2.0;

/// Needle range
pub const NEEDLE_MAX: f64 = 100.0;

/// Needle swing per unit of (raw - 0.5) at sensitivity 1.0
pub const NEEDLE_SCALE: f64 = 200.0;

// =============================================================================
// ANALYZER [C]
// =============================================================================

/// Readings (including the new one) the analyzer looks at
pub const ANALYSIS_WINDOW: usize = 20;

/// Histogram bins for the entropy metric
pub const ENTROPY_BINS: usize = 10;

/// Needle units per meter division; coherence variance is taken in divisions
pub const NEEDLE_DIVISION: f64 = 10.0;

// =============================================================================
// CLASSIFIER THRESHOLDS [C] - empirically chosen, tunable via ClassifierConfig
// =============================================================================

/// |needle| above which a swing counts as a rock slam
pub const ROCKSLAM_DEFLECTION: f64 = 60.0;

/// Sign changes inside the lookback needed for a rock slam
pub const ROCKSLAM_MIN_SIGN_CHANGES: usize = 2;

/// Samples inspected for oscillation patterns
pub const OSCILLATION_LOOKBACK: usize = 8;

/// Sign changes inside the lookback needed for a theta bop
pub const THETA_MIN_SIGN_CHANGES: usize = 3;

/// Longest gap (samples) between sign changes that is still rhythmic
pub const THETA_MAX_PERIOD: usize = 3;

/// Mean |deflection| floor for a theta bop, as a fraction of full scale
/// (deflection is `2·(raw − 0.5)`, so it does not depend on sensitivity)
pub const THETA_MIN_AMPLITUDE: f64 = 0.05;

/// Coherence above which a flat needle floats
pub const FLOATING_COHERENCE: f64 = 0.75;

/// |trend| (needle units per sample) treated as flat
pub const TREND_EPSILON: f64 = 0.5;

/// Shortest window the classifier will judge
pub const MIN_CLASSIFY_SAMPLES: usize = 3;

/// Floating-needle score weights (sum = 1.0)
pub const SCORE_WEIGHT_COHERENCE: f64 = 0.5;
pub const SCORE_WEIGHT_FLATNESS: f64 = 0.3;
pub const SCORE_WEIGHT_STABILITY: f64 = 0.2;

/// Most recent samples used for the stability term of the score
pub const SCORE_RECENT_SAMPLES: usize = 5;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
