//! The store adapter contract a host provides to drive `run_engine_tick`
//! (§6.2), plus one in-process reference implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use kindred_core::{EngineState, PersonaId};
use tokio::sync::RwLock;

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct EngineStateSnapshot {
    pub state: EngineState,
    pub cursor: usize,
}

#[derive(Debug, Clone)]
pub struct SaveEngineStateInput {
    pub state: EngineState,
    pub cursor: usize,
    pub last_run_at: DateTime<Utc>,
    pub last_run_duration_ms: i64,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SyncPersonasResult {
    pub state: EngineState,
    pub created_persona_ids: Vec<PersonaId>,
}

#[async_trait]
pub trait EngineStore: Send + Sync {
    /// Non-blocking; returns `false` if another tick already holds the lock.
    async fn acquire_engine_lock(&self, lock_ms: i64) -> Result<bool, PersistenceError>;

    async fn release_engine_lock(&self) -> Result<(), PersistenceError>;

    async fn load_engine_state(&self) -> Result<EngineStateSnapshot, PersistenceError>;

    async fn save_engine_state(&self, input: SaveEngineStateInput) -> Result<(), PersistenceError>;

    /// Idempotent persona creation from an external user directory.
    async fn sync_personas_from_users(
        &self,
        state: EngineState,
    ) -> Result<SyncPersonasResult, PersistenceError>;

    async fn list_priority_persona_ids(
        &self,
        window_hours: i64,
    ) -> Result<Vec<PersonaId>, PersistenceError>;

    async fn list_priority_schedule_persona_ids(
        &self,
        window_hours: i64,
    ) -> Result<Vec<PersonaId>, PersistenceError>;

    async fn list_filter_persona_ids(
        &self,
        window_hours: i64,
    ) -> Result<Vec<PersonaId>, PersistenceError>;
}

struct LockState {
    held: AtomicBool,
    expires_at: RwLock<Option<DateTime<Utc>>>,
}

impl Default for LockState {
    fn default() -> Self {
        Self {
            held: AtomicBool::new(false),
            expires_at: RwLock::new(None),
        }
    }
}

/// In-process reference implementation of `EngineStore`, sufficient for
/// tests and single-instance local runs. Not horizontally scaled: the lock
/// and the state live in this process's memory only.
pub struct InMemoryEngineStore {
    state: RwLock<EngineStateSnapshot>,
    lock: Arc<LockState>,
    credits: RwLock<HashMap<PersonaId, Vec<DateTime<Utc>>>>,
    schedule_due: RwLock<Vec<PersonaId>>,
    filter_targets: RwLock<Vec<PersonaId>>,
}

impl InMemoryEngineStore {
    pub fn new(state: EngineState) -> Self {
        Self {
            state: RwLock::new(EngineStateSnapshot { state, cursor: 0 }),
            lock: Arc::new(LockState::default()),
            credits: RwLock::new(HashMap::new()),
            schedule_due: RwLock::new(Vec::new()),
            filter_targets: RwLock::new(Vec::new()),
        }
    }

    /// Records a credit payment for `persona_id`, consumed by
    /// `list_priority_persona_ids`.
    pub async fn record_credit_payment(&self, persona_id: PersonaId, at: DateTime<Utc>) {
        self.credits.write().await.entry(persona_id).or_default().push(at);
    }

    /// Marks `persona_id` as due for auto-scheduling, consumed by
    /// `list_priority_schedule_persona_ids`.
    pub async fn mark_schedule_due(&self, persona_id: PersonaId) {
        let mut due = self.schedule_due.write().await;
        if !due.contains(&persona_id) {
            due.push(persona_id);
        }
    }

    /// Marks `persona_id` for relaxed-constraint re-evaluation, consumed by
    /// `list_filter_persona_ids`.
    pub async fn mark_filter_target(&self, persona_id: PersonaId) {
        let mut targets = self.filter_targets.write().await;
        if !targets.contains(&persona_id) {
            targets.push(persona_id);
        }
    }
}

#[async_trait]
impl EngineStore for InMemoryEngineStore {
    async fn acquire_engine_lock(&self, lock_ms: i64) -> Result<bool, PersistenceError> {
        let now = Utc::now();
        let mut expires_at = self.lock.expires_at.write().await;
        if let Some(existing) = *expires_at {
            if existing > now {
                return Ok(false);
            }
        }
        *expires_at = Some(now + Duration::milliseconds(lock_ms));
        self.lock.held.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn release_engine_lock(&self) -> Result<(), PersistenceError> {
        self.lock.held.store(false, Ordering::SeqCst);
        *self.lock.expires_at.write().await = None;
        Ok(())
    }

    async fn load_engine_state(&self) -> Result<EngineStateSnapshot, PersistenceError> {
        Ok(self.state.read().await.clone())
    }

    async fn save_engine_state(&self, input: SaveEngineStateInput) -> Result<(), PersistenceError> {
        let mut snapshot = self.state.write().await;
        snapshot.state = input.state;
        snapshot.cursor = input.cursor;
        Ok(())
    }

    async fn sync_personas_from_users(
        &self,
        state: EngineState,
    ) -> Result<SyncPersonasResult, PersistenceError> {
        // No external user directory backs this reference implementation;
        // the state already holds every known persona.
        Ok(SyncPersonasResult {
            state,
            created_persona_ids: Vec::new(),
        })
    }

    async fn list_priority_persona_ids(
        &self,
        window_hours: i64,
    ) -> Result<Vec<PersonaId>, PersistenceError> {
        let snapshot = self.state.read().await;
        let credits = self.credits.read().await;
        let cutoff = Utc::now() - Duration::hours(window_hours);

        let mut ranked: Vec<(PersonaId, u8, DateTime<Utc>)> = Vec::new();
        for persona in &snapshot.state.personas {
            let recent_credit = credits
                .get(&persona.id)
                .and_then(|payments| payments.iter().filter(|&&at| at >= cutoff).max().copied());
            let boost = persona.priority_boost;
            if boost.is_none() && recent_credit.is_none() {
                continue;
            }
            let recency = recent_credit.unwrap_or(persona.last_updated);
            ranked.push((persona.id, boost.unwrap_or(0), recency));
        }

        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
        Ok(ranked.into_iter().map(|(id, _, _)| id).collect())
    }

    async fn list_priority_schedule_persona_ids(
        &self,
        _window_hours: i64,
    ) -> Result<Vec<PersonaId>, PersistenceError> {
        Ok(self.schedule_due.read().await.clone())
    }

    async fn list_filter_persona_ids(
        &self,
        _window_hours: i64,
    ) -> Result<Vec<PersonaId>, PersistenceError> {
        Ok(self.filter_targets.read().await.clone())
    }
}
