//! Session Registry: owns every live session
//!
//! Lifecycle: CREATED (active) → [get_reading]* → STOPPED (terminal).
//! Stopped sessions stay readable (summary, history) until removed.
//!
//! Locking: one RwLock over the id map, one Mutex per session. The map lock
//! is only held long enough to clone the session handle, so readings on
//! different sessions never wait on each other. Lock order is always
//! map → session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::{EngineConfig, EntropyCombiner, NeedleClassifier, SignalAnalyzer, SignalHistory};
use crate::types::{
    EngineError, EngineResult, Reading, SessionEvent, SessionListing, SessionStats, SessionSummary,
};
use crate::{NEEDLE_MAX, NEEDLE_SCALE, NEUTRAL, TONE_ARM_MAX, TONE_ARM_MIN};

/// Live-update buffer per session
const UPDATE_CHANNEL_CAPACITY: usize = 100;

type CombinerFactory = Box<dyn Fn() -> EntropyCombiner + Send + Sync>;

/// Map a raw sample to the tone arm, clamped to [0,10]
pub fn tone_arm_for(baseline: f64, raw: f64, sensitivity: f64, scale: f64) -> f64 {
    (baseline + (raw - NEUTRAL) * sensitivity * scale).clamp(TONE_ARM_MIN, TONE_ARM_MAX)
}

/// Map a raw sample to the needle, clamped to [-100,100]
pub fn needle_for(raw: f64, sensitivity: f64) -> f64 {
    ((raw - NEUTRAL) * NEEDLE_SCALE * sensitivity).clamp(-NEEDLE_MAX, NEEDLE_MAX)
}

/// Session state
#[derive(Debug)]
struct Session {
    id: String,
    baseline_tone_arm: f64,
    sensitivity: f64,
    history: SignalHistory,
    combiner: EntropyCombiner,
    stats: SessionStats,
    created_at: DateTime<Utc>,
    stopped_at: Option<DateTime<Utc>>,
    active: bool,
    next_sequence: u64,
    update_tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    fn summary(&self) -> SessionSummary {
        let last_reading = self.history.last().copied();
        let end = self
            .stopped_at
            .or_else(|| last_reading.map(|r| r.timestamp))
            .unwrap_or(self.created_at);
        let duration_secs = (end - self.created_at).num_milliseconds().max(0) as f64 / 1000.0;

        SessionSummary {
            session_id: self.id.clone(),
            active: self.active,
            baseline_tone_arm: self.baseline_tone_arm,
            sensitivity: self.sensitivity,
            created_at: self.created_at,
            stopped_at: self.stopped_at,
            duration_secs,
            total_readings: self.stats.total_readings,
            history_len: self.history.len(),
            state_counts: self.stats.state_counts,
            dominant_state: self.stats.state_counts.dominant(),
            mean_tone_arm: self.stats.mean_tone_arm(),
            peak_tone_arm: self.stats.peak_tone_arm,
            mean_coherence: self.stats.mean_coherence(),
            mean_floating_score: self.stats.mean_floating_score(),
            peak_floating_score: self.stats.peak_floating_score,
            floating_count: self.stats.state_counts.floating,
            last_reading,
        }
    }

    fn listing(&self) -> SessionListing {
        SessionListing {
            session_id: self.id.clone(),
            active: self.active,
            created_at: self.created_at,
            total_readings: self.stats.total_readings,
        }
    }
}

/// Registry of sessions; construct once and share behind an `Arc`
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    config: EngineConfig,
    analyzer: SignalAnalyzer,
    classifier: NeedleClassifier,
    combiner_factory: CombinerFactory,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl SessionRegistry {
    /// Registry with default configuration and live entropy sources
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), Box::new(EntropyCombiner::new))
    }

    /// Registry with custom configuration
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::build(config, Box::new(EntropyCombiner::new)))
    }

    /// Registry whose sessions draw from combiners built by `factory`
    pub fn with_combiner_factory<F>(config: EngineConfig, factory: F) -> EngineResult<Self>
    where
        F: Fn() -> EntropyCombiner + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self::build(config, Box::new(factory)))
    }

    fn build(config: EngineConfig, combiner_factory: CombinerFactory) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            analyzer: SignalAnalyzer::with_config(config.analyzer.clone()),
            classifier: NeedleClassifier::with_config(config.classifier.clone()),
            config,
            combiner_factory,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a session using the registry's combiner factory
    pub fn create_session(&self, baseline_tone_arm: f64, sensitivity: f64) -> EngineResult<String> {
        let combiner = (self.combiner_factory)();
        self.create_session_with(baseline_tone_arm, sensitivity, combiner)
    }

    /// Create a session drawing from a specific combiner
    pub fn create_session_with(
        &self,
        baseline_tone_arm: f64,
        sensitivity: f64,
        combiner: EntropyCombiner,
    ) -> EngineResult<String> {
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            warn!("rejected session: sensitivity={}", sensitivity);
            return Err(EngineError::invalid(format!(
                "sensitivity must be a finite number > 0, got {}",
                sensitivity
            )));
        }
        if !baseline_tone_arm.is_finite() {
            warn!("rejected session: baseline_tone_arm={}", baseline_tone_arm);
            return Err(EngineError::invalid("baseline_tone_arm must be finite"));
        }

        let id = Uuid::new_v4().to_string();
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        debug!("session {} sources: {:?}", id, combiner.source_names());

        let session = Session {
            id: id.clone(),
            baseline_tone_arm,
            sensitivity,
            history: SignalHistory::with_capacity(self.config.history_capacity),
            combiner,
            stats: SessionStats::default(),
            created_at: Utc::now(),
            stopped_at: None,
            active: true,
            next_sequence: 1,
            update_tx,
        };

        write_map(&self.sessions).insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(
            "session created: id={} baseline_tone_arm={} sensitivity={}",
            id, baseline_tone_arm, sensitivity
        );
        Ok(id)
    }

    fn handle(&self, id: &str) -> EngineResult<Arc<Mutex<Session>>> {
        read_map(&self.sessions)
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(id))
    }

    /// Take one reading: combine → map → analyze → classify → append
    pub fn get_reading(&self, id: &str) -> EngineResult<Reading> {
        let handle = self.handle(id)?;
        let mut session = lock(&handle);

        if !session.active {
            warn!("reading rejected, session stopped: {}", id);
            return Err(EngineError::Inactive { id: id.to_string() });
        }

        let raw_value = session.combiner.next_value();
        let tone_arm = tone_arm_for(
            session.baseline_tone_arm,
            raw_value,
            session.sensitivity,
            self.config.tone_arm_scale,
        );
        let needle_position = needle_for(raw_value, session.sensitivity);

        let prior = self.analyzer.window_size().saturating_sub(1);
        let mut raw_window: Vec<f64> = session.history.window(prior).map(|r| r.raw_value).collect();
        let mut needle_window: Vec<f64> = session.history.window(prior).map(|r| r.needle_position).collect();
        raw_window.push(raw_value);
        needle_window.push(needle_position);

        let metrics = self.analyzer.analyze(&raw_window, &needle_window);
        let verdict = self.classifier.classify(&raw_window, &needle_window, &metrics);

        let reading = Reading {
            sequence: session.next_sequence,
            timestamp: Utc::now(),
            raw_value,
            tone_arm,
            needle_position,
            needle_state: verdict.state,
            quality: verdict.quality,
            entropy: metrics.entropy,
            coherence: metrics.coherence,
            trend: metrics.trend,
            floating_needle_score: verdict.floating_needle_score,
        };

        session.next_sequence += 1;
        session.history.append(reading);
        session.stats.record(&reading);
        let _ = session.update_tx.send(SessionEvent::Reading { reading });

        debug!(
            "reading {}#{}: state={} fn={:.3}",
            id, reading.sequence, reading.needle_state, reading.floating_needle_score
        );
        Ok(reading)
    }

    /// Aggregate statistics; available after stop
    pub fn get_session_summary(&self, id: &str) -> EngineResult<SessionSummary> {
        let handle = self.handle(id)?;
        let summary = lock(&handle).summary();
        Ok(summary)
    }

    /// Most recent `limit` readings, oldest first; available after stop
    pub fn get_history(&self, id: &str, limit: usize) -> EngineResult<Vec<Reading>> {
        let handle = self.handle(id)?;
        let session = lock(&handle);
        Ok(session.history.window(limit).copied().collect())
    }

    /// Stop a session. Succeeds exactly once; returns the frozen summary.
    pub fn stop_session(&self, id: &str) -> EngineResult<SessionSummary> {
        let handle = self.handle(id)?;
        let mut session = lock(&handle);

        if !session.active {
            warn!("stop rejected, session already stopped: {}", id);
            return Err(EngineError::AlreadyStopped { id: id.to_string() });
        }

        session.active = false;
        session.stopped_at = Some(Utc::now());
        let summary = session.summary();
        let _ = session.update_tx.send(SessionEvent::Stopped { summary: summary.clone() });

        info!(
            "session stopped: id={} readings={} floating={}",
            id, summary.total_readings, summary.floating_count
        );
        Ok(summary)
    }

    /// Drop a session from the registry, returning its final summary
    pub fn remove_session(&self, id: &str) -> EngineResult<SessionSummary> {
        let handle = write_map(&self.sessions)
            .remove(id)
            .ok_or_else(|| EngineError::not_found(id))?;
        let summary = lock(&handle).summary();
        info!("session removed: id={}", id);
        Ok(summary)
    }

    /// Live feed of readings and the stop event
    pub fn subscribe(&self, id: &str) -> EngineResult<broadcast::Receiver<SessionEvent>> {
        let handle = self.handle(id)?;
        let rx = lock(&handle).update_tx.subscribe();
        Ok(rx)
    }

    /// Snapshot of every session, oldest first
    pub fn list_sessions(&self) -> Vec<SessionListing> {
        let handles: Vec<Arc<Mutex<Session>>> = read_map(&self.sessions).values().cloned().collect();
        let mut listings: Vec<SessionListing> = handles.iter().map(|h| lock(h).listing()).collect();
        listings.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        listings
    }

    pub fn len(&self) -> usize {
        read_map(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self) -> usize {
        self.list_sessions().iter().filter(|s| s.active).count()
    }
}

fn read_map(
    map: &RwLock<HashMap<String, Arc<Mutex<Session>>>>,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<Session>>>> {
    map.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_map(
    map: &RwLock<HashMap<String, Arc<Mutex<Session>>>>,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<Session>>>> {
    map.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// TESTS
// =============================================================================
