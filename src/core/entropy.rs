//! Entropy Combiner: blends four independent sources into one sample
//!
//! raw = 0.4·crypto + 0.3·prng + 0.2·time + 0.1·feedback, clamped to [0,1].
//! Each source sits behind `EntropySource` so tests can script the inputs
//! without touching the weighting.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};

use crate::{FEEDBACK_POOL_SIZE, NEUTRAL, WEIGHT_CRYPTO, WEIGHT_FEEDBACK, WEIGHT_PRNG, WEIGHT_TIME};

/// One independent input to the combiner
pub trait EntropySource: Send + std::fmt::Debug {
    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Next value in [0,1]
    fn sample(&mut self) -> f64;

    /// Called with every combined output after it is produced
    fn observe(&mut self, _combined: f64) {}
}

/// Map 64 random bits onto [0,1)
fn unit_from_bits(bits: u64) -> f64 {
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

/// Operating-system CSPRNG
#[derive(Debug, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn name(&self) -> &'static str {
        "os"
    }

    fn sample(&mut self) -> f64 {
        unit_from_bits(OsRng.next_u64())
    }
}

/// Fast non-cryptographic generator, seeded once from the OS
#[derive(Debug)]
pub struct PrngEntropy {
    rng: SmallRng,
}

impl Default for PrngEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl PrngEntropy {
    pub fn new() -> Self {
        Self { rng: SmallRng::from_entropy() }
    }
}

impl EntropySource for PrngEntropy {
    fn name(&self) -> &'static str {
        "prng"
    }

    fn sample(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Clock jitter: SHA-256 of the nanosecond clock and a call counter
#[derive(Debug, Default)]
pub struct TimeEntropy {
    counter: u64,
}

impl EntropySource for TimeEntropy {
    fn name(&self) -> &'static str {
        "time"
    }

    fn sample(&mut self) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(nanos.to_le_bytes());
        hasher.update(self.counter.to_le_bytes());
        let digest: [u8; 32] = hasher.finalize().into();

        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[0..8]);
        unit_from_bits(u64::from_le_bytes(word))
    }
}

/// Mean of the session's own recent combined outputs
#[derive(Debug)]
pub struct FeedbackPool {
    pool: VecDeque<f64>,
    capacity: usize,
}

impl Default for FeedbackPool {
    fn default() -> Self {
        Self::new(FEEDBACK_POOL_SIZE)
    }
}

impl FeedbackPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl EntropySource for FeedbackPool {
    fn name(&self) -> &'static str {
        "feedback"
    }

    fn sample(&mut self) -> f64 {
        if self.pool.is_empty() {
            return NEUTRAL;
        }
        self.pool.iter().sum::<f64>() / self.pool.len() as f64
    }

    fn observe(&mut self, combined: f64) {
        if self.pool.len() == self.capacity {
            self.pool.pop_front();
        }
        self.pool.push_back(combined);
    }
}

/// Always the same value
#[derive(Debug, Clone)]
pub struct FixedSource(pub f64);

impl EntropySource for FixedSource {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Cycles through a script of values
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    pos: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, pos: 0 }
    }
}

impl EntropySource for SequenceSource {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn sample(&mut self) -> f64 {
        if self.values.is_empty() {
            return NEUTRAL;
        }
        let value = self.values[self.pos % self.values.len()];
        self.pos = (self.pos + 1) % self.values.len();
        value
    }
}

/// Weighted blend of crypto, prng, time and feedback sources
#[derive(Debug)]
pub struct EntropyCombiner {
    crypto: Box<dyn EntropySource>,
    prng: Box<dyn EntropySource>,
    time: Box<dyn EntropySource>,
    feedback: Box<dyn EntropySource>,
}

impl Default for EntropyCombiner {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCombiner {
    /// Live sources: OS RNG, SmallRng, clock hash, feedback pool
    pub fn new() -> Self {
        Self::with_sources(
            Box::new(OsEntropy),
            Box::new(PrngEntropy::new()),
            Box::new(TimeEntropy::default()),
            Box::new(FeedbackPool::default()),
        )
    }

    pub fn with_sources(
        crypto: Box<dyn EntropySource>,
        prng: Box<dyn EntropySource>,
        time: Box<dyn EntropySource>,
        feedback: Box<dyn EntropySource>,
    ) -> Self {
        Self { crypto, prng, time, feedback }
    }

    /// Every source follows the same script, so outputs reproduce it
    pub fn scripted(values: Vec<f64>) -> Self {
        Self::with_sources(
            Box::new(SequenceSource::new(values.clone())),
            Box::new(SequenceSource::new(values.clone())),
            Box::new(SequenceSource::new(values.clone())),
            Box::new(SequenceSource::new(values)),
        )
    }

    /// Constant output
    pub fn fixed(value: f64) -> Self {
        Self::scripted(vec![value])
    }

    /// Source labels in weight order
    pub fn source_names(&self) -> [&'static str; 4] {
        [self.crypto.name(), self.prng.name(), self.time.name(), self.feedback.name()]
    }

    /// Produce one combined sample in [0,1]
    pub fn next_value(&mut self) -> f64 {
        let combined = (sanitize(self.crypto.sample()) * WEIGHT_CRYPTO
            + sanitize(self.prng.sample()) * WEIGHT_PRNG
            + sanitize(self.time.sample()) * WEIGHT_TIME
            + sanitize(self.feedback.sample()) * WEIGHT_FEEDBACK)
            .clamp(0.0, 1.0);

        self.crypto.observe(combined);
        self.prng.observe(combined);
        self.time.observe(combined);
        self.feedback.observe(combined);

        combined
    }
}

/// Keep a misbehaving source from leaking NaN or out-of-range values
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        NEUTRAL
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_CRYPTO + WEIGHT_PRNG + WEIGHT_TIME + WEIGHT_FEEDBACK;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_live_sources_in_range() {
        let mut combiner = EntropyCombiner::new();
        for _ in 0..500 {
            let v = combiner.next_value();
            assert!((0.0..=1.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn test_individual_sources_in_range() {
        let mut sources: Vec<Box<dyn EntropySource>> = vec![
            Box::new(OsEntropy),
            Box::new(PrngEntropy::new()),
            Box::new(TimeEntropy::default()),
        ];
        for source in sources.iter_mut() {
            for _ in 0..200 {
                let v = source.sample();
                assert!((0.0..1.0).contains(&v), "{} out of range: {}", source.name(), v);
            }
        }
    }

    #[test]
    fn test_fixed_reproduces_value() {
        let mut combiner = EntropyCombiner::fixed(0.5);
        for _ in 0..10 {
            assert!((combiner.next_value() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scripted_follows_script() {
        let mut combiner = EntropyCombiner::scripted(vec![0.0, 1.0]);
        assert!(combiner.next_value() < 1e-12);
        assert!(combiner.next_value() > 1.0 - 1e-12);
        assert!(combiner.next_value() < 1e-12);
    }

    #[test]
    fn test_feedback_neutral_when_empty() {
        let mut pool = FeedbackPool::default();
        assert!(pool.is_empty());
        assert_eq!(pool.sample(), NEUTRAL);

        pool.observe(0.2);
        pool.observe(0.4);
        assert!((pool.sample() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_feedback_pool_bounded() {
        let mut pool = FeedbackPool::new(3);
        for v in [0.9, 0.9, 0.9, 0.0, 0.0, 0.0] {
            pool.observe(v);
        }
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.sample(), 0.0);
    }

    #[test]
    fn test_overshoot_and_nan_are_absorbed() {
        let mut combiner = EntropyCombiner::with_sources(
            Box::new(FixedSource(5.0)),
            Box::new(FixedSource(f64::NAN)),
            Box::new(FixedSource(-3.0)),
            Box::new(FeedbackPool::default()),
        );
        let v = combiner.next_value();
        // 0.4·1 + 0.3·0.5 + 0.2·0 + 0.1·0.5
        assert!((v - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_source_names() {
        let combiner = EntropyCombiner::new();
        assert_eq!(combiner.source_names(), ["os", "prng", "time", "feedback"]);
    }
}
