//! Cron/trigger surface (§6.3): loads state through the store adapter, runs
//! the sub-tick/priority/filter sweeps described in §4.2, and saves the
//! result back.

use std::collections::HashSet;
use std::time::{Duration as StdDuration, Instant};

use chrono::Utc;
use kindred_config::Settings;
use kindred_core::{ConfigDomainRules, EngineDependencies, PersonaId};
use kindred_persistence::{EngineStore, SaveEngineStateInput};
use serde::Serialize;

use crate::metrics::{record_matches_created, record_tick_duration, record_tick_skipped};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineRunResponse {
    pub status: &'static str,
    pub ticks: u32,
    pub duration_ms: i64,
    pub matches_created: usize,
    pub personas_updated: usize,
    pub feedback_processed: usize,
    pub cursor: usize,
    pub persona_count: usize,
    pub created_persona_ids: Vec<PersonaId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EngineRunResponse {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: "skipped",
            ticks: 0,
            duration_ms: 0,
            matches_created: 0,
            personas_updated: 0,
            feedback_processed: 0,
            cursor: 0,
            persona_count: 0,
            created_persona_ids: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}

/// Tallies accumulated across every sweep of one cron invocation.
#[derive(Default)]
struct Tally {
    matches_created: usize,
    personas_updated: HashSet<PersonaId>,
    feedback_processed: usize,
}

impl Tally {
    fn absorb(&mut self, result: kindred_core::EngineRunResult) -> kindred_core::EngineState {
        self.matches_created += result.matches_created.len();
        self.personas_updated.extend(result.personas_updated);
        self.feedback_processed += result.feedback_processed.len();
        result.state
    }
}

/// Runs one cron invocation: acquire the process-wide lock, run the ordinary
/// sub-tick sweep up to `maxTicks`/`cronMaxMs`, then the auto-schedule sweep,
/// then the relaxed-constraint filter sweep, then persist.
pub async fn run_cron_tick(
    store: &dyn EngineStore,
    settings: &Settings,
    deps: &EngineDependencies,
) -> EngineRunResponse {
    let started = Instant::now();

    match store.acquire_engine_lock(settings.matching.lock_ms as i64).await {
        Ok(true) => {}
        Ok(false) => {
            record_tick_skipped("locked");
            return EngineRunResponse::skipped("locked");
        }
        Err(err) => {
            record_tick_skipped("lock_error");
            return EngineRunResponse::skipped(format!("lock error: {err}"));
        }
    }

    let response = run_locked(store, settings, deps, started).await;
    let _ = store.release_engine_lock().await;
    record_tick_duration("cron", response.duration_ms);
    if response.matches_created > 0 {
        record_matches_created(response.matches_created);
    }
    response
}

async fn run_locked(
    store: &dyn EngineStore,
    settings: &Settings,
    deps: &EngineDependencies,
    started: Instant,
) -> EngineRunResponse {
    let snapshot = match store.load_engine_state().await {
        Ok(snapshot) => snapshot,
        Err(err) => return EngineRunResponse::skipped(format!("load failed: {err}")),
    };

    let synced = match store.sync_personas_from_users(snapshot.state).await {
        Ok(synced) => synced,
        Err(err) => return EngineRunResponse::skipped(format!("sync failed: {err}")),
    };

    let mut state = synced.state;
    let mut cursor = snapshot.cursor;
    let mut ticks = 0u32;
    let mut tally = Tally::default();
    let rules = ConfigDomainRules::default();
    let budget = StdDuration::from_millis(settings.matching.cron_max_ms);

    let priority_ids = store
        .list_priority_persona_ids(settings.matching.priority_window_hours as i64)
        .await
        .unwrap_or_default();

    while ticks < settings.matching.max_ticks && started.elapsed() < budget {
        let active_ids = state.active_persona_ids_sorted();
        if active_ids.is_empty() {
            break;
        }
        let prioritized = prioritize(&active_ids, &priority_ids);
        let batch = select_batch(&prioritized, cursor, settings.matching.batch_size);
        if batch.is_empty() {
            break;
        }

        let options = settings
            .matching
            .to_engine_options(Utc::now(), Some(batch.iter().copied().collect()));

        let pre_sweep_state = state.clone();
        match kindred_engine::run_engine_tick(state, &options, deps, &rules).await {
            Ok(result) => state = tally.absorb(result),
            Err(err) => {
                tracing::warn!(error = %err, "engine tick sweep failed");
                state = pre_sweep_state;
                break;
            }
        }

        cursor = (cursor + batch.len()) % prioritized.len().max(1);
        ticks += 1;
    }

    if let Ok(ids) = store
        .list_priority_schedule_persona_ids(settings.matching.priority_window_hours as i64)
        .await
    {
        if !ids.is_empty() {
            let mut options = settings
                .matching
                .to_engine_options(Utc::now(), Some(ids.into_iter().collect()));
            options.auto_schedule_matches = true;
            let pre_sweep_state = state.clone();
            state = match kindred_engine::run_engine_tick(state, &options, deps, &rules).await {
                Ok(result) => tally.absorb(result),
                Err(err) => {
                    tracing::warn!(error = %err, "auto-schedule sweep failed");
                    pre_sweep_state
                }
            };
        }
    }

    if let Ok(ids) = store
        .list_filter_persona_ids(settings.matching.priority_window_hours as i64)
        .await
    {
        if !ids.is_empty() {
            let mut options = settings
                .matching
                .to_engine_options(Utc::now(), Some(ids.into_iter().collect()));
            options.require_same_city = false;
            options.require_shared_interests = false;
            let pre_sweep_state = state.clone();
            state = match kindred_engine::run_engine_tick(state, &options, deps, &rules).await {
                Ok(result) => tally.absorb(result),
                Err(err) => {
                    tracing::warn!(error = %err, "filter sweep failed");
                    pre_sweep_state
                }
            };
        }
    }

    let persona_count = state.personas.len();
    let duration_ms = started.elapsed().as_millis() as i64;

    if let Err(err) = store
        .save_engine_state(SaveEngineStateInput {
            state,
            cursor,
            last_run_at: Utc::now(),
            last_run_duration_ms: duration_ms,
            locked_until: None,
        })
        .await
    {
        tracing::error!(error = %err, "failed to save engine state after tick");
    }

    EngineRunResponse {
        status: "ok",
        ticks,
        duration_ms,
        matches_created: tally.matches_created,
        personas_updated: tally.personas_updated.len(),
        feedback_processed: tally.feedback_processed,
        cursor,
        persona_count,
        created_persona_ids: synced.created_persona_ids,
        reason: None,
    }
}

fn prioritize(active_ids: &[PersonaId], priority_ids: &[PersonaId]) -> Vec<PersonaId> {
    let active_set: HashSet<PersonaId> = active_ids.iter().copied().collect();
    let priority_set: HashSet<PersonaId> = priority_ids.iter().copied().collect();
    let mut ordered: Vec<PersonaId> = priority_ids
        .iter()
        .copied()
        .filter(|id| active_set.contains(id))
        .collect();
    ordered.extend(active_ids.iter().copied().filter(|id| !priority_set.contains(id)));
    ordered
}

fn select_batch(prioritized: &[PersonaId], cursor: usize, batch_size: usize) -> Vec<PersonaId> {
    if prioritized.is_empty() {
        return Vec::new();
    }
    let start = cursor % prioritized.len();
    prioritized
        .iter()
        .cycle()
        .skip(start)
        .take(batch_size.min(prioritized.len()))
        .copied()
        .collect()
}
