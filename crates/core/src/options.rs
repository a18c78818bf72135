use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::{Domain, MatchId, PersonaId};
use crate::traits::{IdFactory, LocationProvider, MatchingLlmProvider};

/// Inputs to a single `run_engine_tick` invocation. Mirrors the recognized
/// options table: every field has an explicit default supplied by the host's
/// configuration layer, not by this struct.
#[derive(Clone)]
pub struct EngineOptions {
    pub now: DateTime<Utc>,
    pub batch_size: usize,
    pub max_candidates: usize,
    pub small_pass_top_k: usize,
    pub large_pass_top_k: usize,
    pub graph_hops: usize,
    pub match_cooldown_days: i64,
    pub negative_feedback_cooldown_days: Option<i64>,
    pub recent_match_window: Option<usize>,
    pub reliability_weight: f64,
    pub min_availability_minutes: u32,
    pub match_domains: Vec<Domain>,
    pub target_persona_ids: Option<HashSet<PersonaId>>,
    pub auto_schedule_matches: bool,
    pub require_same_city: bool,
    pub require_shared_interests: bool,
    pub process_feedback_limit: usize,
    pub process_conversation_limit: Option<usize>,
}

impl EngineOptions {
    /// Validates the fields the orchestrator cannot safely default around.
    /// Returns `EngineError::InvalidInput` the way the tick contract requires:
    /// invalid options mean the tick does not run at all.
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        if self.match_domains.is_empty() {
            return Err(crate::error::EngineError::invalid(
                "matchDomains must be non-empty",
            ));
        }
        if self.batch_size == 0 {
            return Err(crate::error::EngineError::invalid(
                "batchSize must be positive",
            ));
        }
        if self.max_candidates == 0 {
            return Err(crate::error::EngineError::invalid(
                "maxCandidates must be positive",
            ));
        }
        if self.match_cooldown_days < 0 {
            return Err(crate::error::EngineError::invalid(
                "matchCooldownDays must not be negative",
            ));
        }
        Ok(())
    }
}

/// Injected collaborators for a tick. All are optional; absence selects the
/// default heuristic/no-op behavior described per component.
#[derive(Clone, Default)]
pub struct EngineDependencies {
    pub llm: Option<Arc<dyn MatchingLlmProvider>>,
    pub location_provider: Option<Arc<dyn LocationProvider>>,
    pub id_factory: Option<Arc<dyn IdFactory>>,
}

/// Result of one `run_engine_tick` call.
#[derive(Debug, Clone, Default)]
pub struct EngineRunResult {
    pub state: crate::model::EngineState,
    pub matches_created: Vec<MatchId>,
    pub personas_updated: Vec<PersonaId>,
    pub feedback_processed: Vec<crate::model::FeedbackId>,
}

/// The host-side target set for a sweep, computed per §4.2 batch selection.
/// Carried here (rather than in the engine crate) because it is part of the
/// orchestrator's public contract with the store adapter.
#[derive(Debug, Clone, Default)]
pub struct SweepTargets {
    pub persona_ids: Vec<PersonaId>,
    pub force_auto_schedule: bool,
    pub relax_city_and_interests: bool,
}
