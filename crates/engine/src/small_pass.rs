//! Heuristic small pass (§4.4): a cheap weighted-sum ranker that narrows a
//! persona's candidate pool down to the top K before the expensive large pass.

use std::collections::HashMap;

use kindred_core::{Domain, DomainRules, DomainRulesConfig, EngineOptions, Persona, PersonaId};

use crate::availability::weekly_overlap_minutes;

#[derive(Debug, Clone, Copy)]
pub struct SmallPassScore {
    pub persona_id: PersonaId,
    pub score: f64,
}

/// Scores and ranks `candidates` for `persona` in `domain`, returning the top
/// `top_k` ids in descending score order. Ties break by ascending persona id
/// for determinism. `distances` is the persona's graph-hop memo (§4.9),
/// keyed by candidate id.
pub fn heuristic_small_pass(
    persona: &Persona,
    candidates: &[&Persona],
    domain: Domain,
    options: &EngineOptions,
    rules: &dyn DomainRules,
    distances: &HashMap<PersonaId, usize>,
    top_k: usize,
) -> Vec<SmallPassScore> {
    let weights = &rules.config().small_pass_weights;
    let mut scored: Vec<SmallPassScore> = candidates
        .iter()
        .map(|candidate| SmallPassScore {
            persona_id: candidate.id,
            score: score_pair(
                persona,
                candidate,
                domain,
                options,
                weights,
                rules.config(),
                distances.get(&candidate.id).copied(),
            ),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.persona_id.cmp(&b.persona_id))
    });
    scored.truncate(top_k);
    scored
}

fn score_pair(
    persona: &Persona,
    candidate: &Persona,
    domain: Domain,
    options: &EngineOptions,
    weights: &kindred_core::traits::domain_rules::SmallPassWeights,
    config: &DomainRulesConfig,
    hops: Option<usize>,
) -> f64 {
    let interest_overlap = kindred_core::traits::domain_rules::jaccard(
        &persona.profile.interests,
        &candidate.profile.interests,
    );
    let city_match = if persona.general.location.city == candidate.general.location.city {
        1.0
    } else {
        0.0
    };
    let overlap_minutes = weekly_overlap_minutes(
        options.now,
        persona.profile.availability.as_ref(),
        &persona.general.location.time_zone,
        candidate.profile.availability.as_ref(),
        &candidate.general.location.time_zone,
    );
    let availability_overlap = (overlap_minutes as f64 / 480.0).min(1.0);
    let reliability = candidate.reliability.score.clamp(0.0, 1.0);
    let goal_alignment = kindred_core::traits::domain_rules::jaccard(
        &persona.profile.connection_goals,
        &candidate.profile.connection_goals,
    );
    let graph_proximity = match hops {
        Some(hops) if hops <= options.graph_hops => 1.0 / (1.0 + hops as f64),
        _ => 0.0,
    };

    let red_flag_count = candidate.red_flag_tags.len() as f64;
    let red_flag_penalty = (config.red_flag_penalty_per_flag * red_flag_count)
        .max(config.red_flag_penalty_cap);

    weights.interest_overlap * interest_overlap
        + weights.city_match * city_match
        + weights.availability_overlap * availability_overlap
        + weights.reliability * reliability * options.reliability_weight
        + weights.graph_proximity * graph_proximity
        + weights.goal_alignment * goal_alignment
        + red_flag_penalty
}
