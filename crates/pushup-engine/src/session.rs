//! Session control: one engine per workout session, plus a host-side registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use pushup_core::{Error, FramePose, Result, SessionId, Timestamp};

use crate::config::EngineConfig;
use crate::engine::{EngineSnapshot, RepEngine};
use crate::state_machine::RepEvent;

/// Result of offering a frame to a session
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Processed(EngineSnapshot),
    /// Another ingest or reset was still running; the frame was discarded
    Dropped,
}

impl IngestOutcome {
    pub fn snapshot(&self) -> Option<&EngineSnapshot> {
        match self {
            IngestOutcome::Processed(snapshot) => Some(snapshot),
            IngestOutcome::Dropped => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, IngestOutcome::Dropped)
    }
}

/// In-memory session statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub frames_dropped: u64,
    pub rep_count: u32,
    /// Counted repetitions since the last reset
    pub reps: Vec<RepEvent>,
}

impl SessionSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

struct SessionState {
    engine: RepEngine,
    frames_accepted: u64,
    frames_rejected: u64,
    reps: Vec<RepEvent>,
}

/// Owns one engine and serializes access to it
pub struct SessionController {
    id: SessionId,
    started_at: DateTime<Utc>,
    clock: Instant,
    state: Mutex<SessionState>,
    frames_dropped: AtomicU64,
}

impl SessionController {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_id(SessionId::new(), config)
    }

    pub fn with_id(id: SessionId, config: EngineConfig) -> Result<Self> {
        let engine = RepEngine::new(config)?;

        Ok(Self {
            id,
            started_at: Utc::now(),
            clock: Instant::now(),
            state: Mutex::new(SessionState {
                engine,
                frames_accepted: 0,
                frames_rejected: 0,
                reps: Vec::new(),
            }),
            frames_dropped: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Run one frame through the engine, or drop it if the engine is busy
    pub fn ingest(&self, frame: &FramePose, now: Timestamp) -> IngestOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            let dropped = self.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(session = %self.id, dropped, "frame dropped, engine busy");
            return IngestOutcome::Dropped;
        };

        let report = state.engine.tick(frame, now);
        if report.rejection.is_some() {
            state.frames_rejected += 1;
        } else {
            state.frames_accepted += 1;
        }
        if let Some(rep) = report.rep {
            state.reps.push(rep);
        }

        IngestOutcome::Processed(report.snapshot)
    }

    /// Like [`ingest`](Self::ingest), stamped with time elapsed since the session started
    pub fn ingest_now(&self, frame: &FramePose) -> IngestOutcome {
        let elapsed = i64::try_from(self.clock.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.ingest(frame, Timestamp::from_nanos(elapsed))
    }

    /// Return the engine to its initial state. `None` if an ingest is in flight.
    pub fn reset(&self) -> Option<EngineSnapshot> {
        let mut state = self.state.try_lock().ok()?;
        state.engine.reset();
        state.reps.clear();
        tracing::info!(session = %self.id, "session reset");
        Some(state.engine.snapshot())
    }

    /// Current snapshot, waiting for any in-flight ingest
    pub async fn snapshot(&self) -> EngineSnapshot {
        self.state.lock().await.engine.snapshot()
    }

    pub async fn summary(&self) -> SessionSummary {
        let state = self.state.lock().await;
        SessionSummary {
            session_id: self.id,
            started_at: self.started_at,
            frames_accepted: state.frames_accepted,
            frames_rejected: state.frames_rejected,
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            rep_count: state.engine.state_machine().rep_count(),
            reps: state.reps.clone(),
        }
    }
}

/// Active sessions keyed by id
pub struct SessionRegistry {
    config: EngineConfig,
    sessions: RwLock<HashMap<SessionId, Arc<SessionController>>>,
}

impl SessionRegistry {
    /// Fails if `config` is invalid, so later session creation cannot
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Start a new session with the registry's configuration
    pub async fn create(&self) -> Result<SessionId> {
        let controller = SessionController::new(self.config.clone())?;
        let id = controller.id();

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(controller));
        tracing::info!(session = %id, active = sessions.len(), "session created");

        Ok(id)
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<SessionController>> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).cloned()
    }

    pub async fn ingest(
        &self,
        id: SessionId,
        frame: &FramePose,
        now: Timestamp,
    ) -> Result<IngestOutcome> {
        let controller = self.require(id).await?;
        Ok(controller.ingest(frame, now))
    }

    pub async fn reset(&self, id: SessionId) -> Result<Option<EngineSnapshot>> {
        let controller = self.require(id).await?;
        Ok(controller.reset())
    }

    /// Remove a session and return its final summary
    pub async fn end(&self, id: SessionId) -> Result<SessionSummary> {
        let controller = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| unknown_session(id))?;

        let summary = controller.summary().await;
        tracing::info!(
            session = %id,
            reps = summary.rep_count,
            accepted = summary.frames_accepted,
            rejected = summary.frames_rejected,
            dropped = summary.frames_dropped,
            "session ended"
        );
        Ok(summary)
    }

    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let sessions = self.sessions.read().await;
        sessions.keys().copied().collect()
    }

    async fn require(&self, id: SessionId) -> Result<Arc<SessionController>> {
        self.get(id).await.ok_or_else(|| unknown_session(id))
    }
}

fn unknown_session(id: SessionId) -> Error {
    Error::InvalidInput(format!("unknown session {id}"))
}
