//! Core types for the attunement engine

mod needle;
mod reading;
mod summary;
mod error;

pub use needle::{NeedleState, SignalQuality};
pub use reading::{Reading, SignalMetrics, SessionEvent};
pub use summary::{SessionSummary, SessionListing, SessionStats, StateCounts};
pub use error::{EngineError, EngineResult};
