//! Engine tick orchestration (§4.1) and host-facing batch selection (§4.2).

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use kindred_core::{
    Domain, DomainRules, EngineDependencies, EngineError, EngineOptions, EngineRunResult,
    EngineState, LargePassInput, PersonaId, SmallPassInput,
};
use tracing::{info, instrument, warn};

use crate::candidate_pool::build_candidate_pool;
use crate::large_pass::heuristic_large_pass;
use crate::match_recorder::{record_matches, PersonaMatchBudget};
use crate::small_pass::heuristic_small_pass;

const MAX_CONCURRENT_LLM_CALLS: usize = 8;

/// Runs one tick to completion against an owned `EngineState` snapshot,
/// returning the new state and the deltas produced (§4.1).
///
/// Per-persona and per-pair failures are logged and do not abort the tick;
/// only `options.validate()` failures and truly unexpected conditions
/// propagate as `Err`.
#[instrument(skip(state, deps, rules), fields(domains = ?options.match_domains))]
pub async fn run_engine_tick(
    mut state: EngineState,
    options: &EngineOptions,
    deps: &EngineDependencies,
    rules: &dyn DomainRules,
) -> Result<EngineRunResult, EngineError> {
    options.validate()?;

    let mut revisions_before: HashMap<PersonaId, u64> = state
        .personas
        .iter()
        .map(|p| (p.id, p.profile_revision))
        .collect();

    let feedback_processed =
        crate::feedback::process_feedback_queue(&mut state, options.now, options.process_feedback_limit);

    let target_ids = target_persona_ids(&state, options);
    let mut matches_created = Vec::new();

    for persona_id in target_ids {
        let mut budget = PersonaMatchBudget::default();
        for &domain in &options.match_domains {
            match run_persona_domain(&mut state, persona_id, domain, options, deps, rules, &mut budget).await
            {
                Ok(mut ids) => matches_created.append(&mut ids),
                Err(err) => {
                    warn!(persona_id, ?domain, error = %err, "skipping persona/domain after error");
                }
            }
        }
    }

    let personas_updated: Vec<PersonaId> = state
        .personas
        .iter()
        .filter(|p| revisions_before.remove(&p.id) != Some(p.profile_revision))
        .map(|p| p.id)
        .collect();

    info!(
        matches_created = matches_created.len(),
        personas_updated = personas_updated.len(),
        feedback_processed = feedback_processed.len(),
        "tick complete"
    );

    Ok(EngineRunResult {
        state,
        matches_created,
        personas_updated,
        feedback_processed,
    })
}

fn target_persona_ids(state: &EngineState, options: &EngineOptions) -> Vec<PersonaId> {
    let active = state.active_persona_ids_sorted();
    match &options.target_persona_ids {
        Some(targets) => active.into_iter().filter(|id| targets.contains(id)).collect(),
        None => active,
    }
}

async fn run_persona_domain(
    state: &mut EngineState,
    persona_id: PersonaId,
    domain: Domain,
    options: &EngineOptions,
    deps: &EngineDependencies,
    rules: &dyn DomainRules,
    budget: &mut PersonaMatchBudget,
) -> Result<Vec<kindred_core::MatchId>, EngineError> {
    let persona = state
        .persona(persona_id)
        .cloned()
        .ok_or_else(|| EngineError::invalid(format!("unknown target persona {persona_id}")))?;

    if !rules.domain_participates(&persona, domain) {
        return Ok(Vec::new());
    }

    let pool: Vec<kindred_core::Persona> =
        build_candidate_pool(state, &persona, domain, options, rules)
            .into_iter()
            .cloned()
            .collect();
    if pool.is_empty() {
        return Ok(Vec::new());
    }

    let distances = state.match_graph.bfs_distances(persona.id, options.graph_hops);
    let (small_pass_ids, small_pass_scores) =
        run_small_pass(&persona, &pool, domain, options, deps, rules, &distances).await?;
    let survivors: Vec<&kindred_core::Persona> = small_pass_ids
        .iter()
        .filter_map(|id| pool.iter().find(|p| p.id == *id))
        .collect();
    if survivors.is_empty() {
        return Ok(Vec::new());
    }

    let scored = run_large_pass(
        &persona,
        &survivors,
        domain,
        options,
        deps,
        rules,
        &small_pass_scores,
    )
    .await;
    let top_scored: Vec<_> = {
        let mut scored = scored;
        scored.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(options.large_pass_top_k);
        scored
    };

    let created = record_matches(
        state,
        persona_id,
        domain,
        top_scored,
        options,
        rules,
        deps.id_factory.as_deref(),
        deps.location_provider.as_deref(),
        budget,
    )
    .await;

    Ok(created)
}

async fn run_small_pass(
    persona: &kindred_core::Persona,
    pool: &[kindred_core::Persona],
    domain: Domain,
    options: &EngineOptions,
    deps: &EngineDependencies,
    rules: &dyn DomainRules,
    distances: &std::collections::HashMap<PersonaId, usize>,
) -> Result<(Vec<PersonaId>, std::collections::HashMap<PersonaId, f64>), EngineError> {
    if let Some(llm) = &deps.llm {
        let input = SmallPassInput {
            persona,
            candidates: pool,
            domain,
            notes: None,
        };
        match llm.small_pass(input).await {
            Ok(output) => {
                let pool_ids: std::collections::HashSet<PersonaId> = pool.iter().map(|p| p.id).collect();
                let filtered: Vec<PersonaId> = output
                    .ranked_ids
                    .into_iter()
                    .filter(|id| pool_ids.contains(id))
                    .take(options.small_pass_top_k)
                    .collect();
                // The LLM doesn't return a numeric score per candidate, only
                // a ranked id prefix, so no smallPassScore is available here.
                return Ok((filtered, std::collections::HashMap::new()));
            }
            Err(err) => {
                warn!(error = %err, "llm small pass failed, falling back to heuristic");
            }
        }
    }

    let refs: Vec<&kindred_core::Persona> = pool.iter().collect();
    let scored = heuristic_small_pass(
        persona,
        &refs,
        domain,
        options,
        rules,
        distances,
        options.small_pass_top_k,
    );
    let scores = scored.iter().map(|s| (s.persona_id, s.score)).collect();
    Ok((scored.into_iter().map(|s| s.persona_id).collect(), scores))
}

async fn run_large_pass(
    persona: &kindred_core::Persona,
    survivors: &[&kindred_core::Persona],
    domain: Domain,
    options: &EngineOptions,
    deps: &EngineDependencies,
    rules: &dyn DomainRules,
    small_pass_scores: &std::collections::HashMap<PersonaId, f64>,
) -> Vec<(PersonaId, kindred_core::Assessment)> {
    let bound = options.small_pass_top_k.min(MAX_CONCURRENT_LLM_CALLS).max(1);

    if let Some(llm) = &deps.llm {
        let results: Vec<(PersonaId, kindred_core::Assessment)> = stream::iter(survivors.iter().copied())
            .map(|candidate| {
                let llm = llm.clone();
                async move {
                    let input = LargePassInput {
                        persona,
                        candidate,
                        domain,
                        notes: None,
                    };
                    match llm.large_pass(input).await {
                        Ok(output) => {
                            let clamped = output.score.clamp(-100.0, 100.0);
                            let assessment = kindred_core::Assessment {
                                score: clamped,
                                small_pass_score: small_pass_scores.get(&candidate.id).copied(),
                                large_pass_score: Some(clamped),
                                positive_reasons: output.positive_reasons,
                                negative_reasons: output.negative_reasons,
                                red_flags: output.red_flags,
                            };
                            (candidate.id, assessment)
                        }
                        Err(err) => {
                            warn!(error = %err, candidate_id = candidate.id, "llm large pass failed, falling back to heuristic");
                            let mut assessment = heuristic_large_pass(persona, candidate, domain, options, rules);
                            assessment.small_pass_score = small_pass_scores.get(&candidate.id).copied();
                            assessment.negative_reasons.push("llm:fallback".to_string());
                            (candidate.id, assessment)
                        }
                    }
                }
            })
            .buffer_unordered(bound)
            .collect()
            .await;
        return results;
    }

    survivors
        .iter()
        .map(|candidate| {
            let mut assessment = heuristic_large_pass(persona, candidate, domain, options, rules);
            assessment.small_pass_score = small_pass_scores.get(&candidate.id).copied();
            (candidate.id, assessment)
        })
        .collect()
}
