//! Core modules for the attunement engine

pub mod config;
pub mod entropy;
pub mod history;
pub mod analyzer;
pub mod classifier;
pub mod registry;
pub mod api;

pub use config::{EngineConfig, AnalyzerConfig, ClassifierConfig};
pub use entropy::{
    EntropySource, EntropyCombiner, OsEntropy, PrngEntropy, TimeEntropy, FeedbackPool,
    FixedSource, SequenceSource,
};
pub use history::{RingBuffer, SignalHistory};
pub use analyzer::SignalAnalyzer;
pub use classifier::{NeedleClassifier, Classification};
pub use registry::{SessionRegistry, tone_arm_for, needle_for};
pub use api::{create_router, router_with_registry, run_server};
