//! Candidate pool construction (§4.3): filters active personas down to an
//! ordered, capped list of eligible matching candidates for one persona in
//! one domain.

use std::collections::HashSet;

use chrono::Duration;
use kindred_core::{Domain, DomainRules, EngineOptions, EngineState, Persona, PersonaId};

use crate::availability::weekly_overlap_minutes;

/// Returns the candidate pool for `persona` in `domain`, ordered by graph
/// proximity tier then descending reliability, truncated to
/// `options.max_candidates`.
pub fn build_candidate_pool<'a>(
    state: &'a EngineState,
    persona: &Persona,
    domain: Domain,
    options: &EngineOptions,
    rules: &dyn DomainRules,
) -> Vec<&'a Persona> {
    let mut pool: Vec<&Persona> = state
        .personas
        .iter()
        .filter(|candidate| is_eligible(state, persona, candidate, domain, options, rules))
        .collect();

    let distances = state.match_graph.bfs_distances(persona.id, options.graph_hops);

    pool.sort_by(|a, b| {
        let a_tier = distances.get(&a.id).copied().unwrap_or(usize::MAX);
        let b_tier = distances.get(&b.id).copied().unwrap_or(usize::MAX);
        let a_in_range = a_tier <= options.graph_hops;
        let b_in_range = b_tier <= options.graph_hops;
        match (a_in_range, b_in_range) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => b
                .reliability
                .score
                .partial_cmp(&a.reliability.score)
                .unwrap_or(std::cmp::Ordering::Equal),
        }
    });

    pool.truncate(options.max_candidates);
    pool
}

/// Exposed for the match recorder's re-check step (§4.7 step 1), which must
/// apply the same rejection rules against state as mutated earlier in the tick.
pub(crate) fn is_eligible(
    state: &EngineState,
    persona: &Persona,
    candidate: &Persona,
    domain: Domain,
    options: &EngineOptions,
    rules: &dyn DomainRules,
) -> bool {
    // Rule 1
    if candidate.id == persona.id {
        return false;
    }
    if candidate.status != kindred_core::PersonaStatus::Active {
        return false;
    }

    // Rule 2
    if !rules.domain_participates(candidate, domain) {
        return false;
    }

    // Rule 3
    if persona.match_preferences.blocked_persona_ids.contains(&candidate.id)
        || persona.match_preferences.excluded_persona_ids.contains(&candidate.id)
        || candidate.match_preferences.blocked_persona_ids.contains(&persona.id)
    {
        return false;
    }

    // Rule 4
    if has_recent_match(state, persona.id, candidate.id, options.now, options.match_cooldown_days) {
        return false;
    }

    // Rule 5
    if let Some(window) = options.recent_match_window {
        let recent_count = count_recent_matches(state, persona.id, options.now, options.match_cooldown_days);
        if recent_count >= window
            && matched_within(state, persona.id, candidate.id, options.now, options.match_cooldown_days)
        {
            return false;
        }
    }

    // Rule 6
    if let Some(days) = options.negative_feedback_cooldown_days {
        if has_negative_feedback(state, persona.id, candidate.id, options.now, days) {
            return false;
        }
    }

    // Rule 7
    let overlap = weekly_overlap_minutes(
        options.now,
        persona.profile.availability.as_ref(),
        &persona.general.location.time_zone,
        candidate.profile.availability.as_ref(),
        &candidate.general.location.time_zone,
    );
    if overlap < options.min_availability_minutes {
        return false;
    }

    // Rule 8
    if let Some(floor) = persona.match_preferences.reliability_min_score {
        if candidate.reliability.score < floor {
            return false;
        }
    }

    // Rule 9
    if options.require_same_city && persona.general.location.city != candidate.general.location.city {
        return false;
    }
    let require_shared_interests = options.require_shared_interests;
    if require_shared_interests && domain != Domain::Friendship {
        // friendship enforces its own stricter Jaccard floor below instead.
        let persona_interests: HashSet<&String> = persona.profile.interests.iter().collect();
        let shares_interest = candidate
            .profile
            .interests
            .iter()
            .any(|i| persona_interests.contains(i));
        if !shares_interest {
            return false;
        }
    }

    match domain {
        Domain::Dating => rules.dating_eligible(persona, candidate),
        Domain::Business => rules.business_eligible(persona, candidate),
        Domain::Friendship => rules.friendship_eligible(persona, candidate, require_shared_interests),
        Domain::General => true,
    }
}

fn pair_matches<'a>(
    state: &'a EngineState,
    a: PersonaId,
    b: PersonaId,
) -> impl Iterator<Item = &'a kindred_core::MatchRecord> {
    state
        .matches
        .iter()
        .filter(move |m| (m.persona_a == a && m.persona_b == b) || (m.persona_a == b && m.persona_b == a))
}

fn has_recent_match(
    state: &EngineState,
    a: PersonaId,
    b: PersonaId,
    now: chrono::DateTime<chrono::Utc>,
    cooldown_days: i64,
) -> bool {
    let cutoff = now - Duration::days(cooldown_days);
    pair_matches(state, a, b).any(|m| m.created_at >= cutoff)
}

fn matched_within(
    state: &EngineState,
    a: PersonaId,
    b: PersonaId,
    now: chrono::DateTime<chrono::Utc>,
    window_days: i64,
) -> bool {
    let cutoff = now - Duration::days(window_days);
    pair_matches(state, a, b).any(|m| m.created_at >= cutoff)
}

fn count_recent_matches(
    state: &EngineState,
    persona_id: PersonaId,
    now: chrono::DateTime<chrono::Utc>,
    window_days: i64,
) -> usize {
    let cutoff = now - Duration::days(window_days);
    state
        .matches
        .iter()
        .filter(|m| m.involves(persona_id) && m.created_at >= cutoff)
        .count()
}

fn has_negative_feedback(
    state: &EngineState,
    a: PersonaId,
    b: PersonaId,
    now: chrono::DateTime<chrono::Utc>,
    window_days: i64,
) -> bool {
    let cutoff = now - Duration::days(window_days);
    state.feedback_queue.iter().any(|f| {
        f.sentiment == kindred_core::FeedbackSentiment::Negative
            && f.created_at >= cutoff
            && ((f.from_persona_id == a && f.to_persona_id == b)
                || (f.from_persona_id == b && f.to_persona_id == a))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kindred_core::model::fixtures::bare_persona;
    use kindred_core::{Assessment, ConfigDomainRules, MatchRecord, MatchStatus};

    fn base_options(now: chrono::DateTime<Utc>) -> EngineOptions {
        EngineOptions {
            now,
            batch_size: 25,
            max_candidates: 60,
            small_pass_top_k: 12,
            large_pass_top_k: 6,
            graph_hops: 2,
            match_cooldown_days: 30,
            negative_feedback_cooldown_days: None,
            recent_match_window: None,
            reliability_weight: 1.0,
            min_availability_minutes: 0,
            match_domains: vec![Domain::General],
            target_persona_ids: None,
            auto_schedule_matches: false,
            require_same_city: false,
            require_shared_interests: false,
            process_feedback_limit: 50,
            process_conversation_limit: None,
        }
    }

    #[test]
    fn cooldown_excludes_recently_matched_pair() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.matches.push(MatchRecord {
            match_id: "m1".to_string(),
            domain: Domain::General,
            persona_a: 1,
            persona_b: 2,
            created_at: now - Duration::days(10),
            status: MatchStatus::Completed,
            assessment: Assessment::default(),
            reasoning: Vec::new(),
            scheduled_meeting_id: None,
        });

        let rules = ConfigDomainRules::default();
        let mut options = base_options(now);
        options.match_cooldown_days = 30;
        let persona = state.persona(1).unwrap().clone();
        let pool = build_candidate_pool(&state, &persona, Domain::General, &options, &rules);
        assert!(pool.iter().all(|c| c.id != 2));

        options.match_cooldown_days = 1;
        let pool = build_candidate_pool(&state, &persona, Domain::General, &options, &rules);
        assert!(pool.iter().any(|c| c.id == 2));
    }

    #[test]
    fn negative_feedback_cooldown_excludes_pair_across_domains() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.feedback_queue.push(kindred_core::FeedbackEntry {
            id: "f1".to_string(),
            from_persona_id: 1,
            to_persona_id: 2,
            meeting_id: None,
            rating: 1,
            sentiment: kindred_core::FeedbackSentiment::Negative,
            issues: Vec::new(),
            red_flags: Vec::new(),
            notes: String::new(),
            created_at: now - Duration::days(10),
            processed: false,
            processed_at: None,
            source: kindred_core::FeedbackSource::Meeting,
        });

        let rules = ConfigDomainRules::default();
        let mut options = base_options(now);
        options.negative_feedback_cooldown_days = Some(180);
        let persona = state.persona(1).unwrap().clone();
        let pool = build_candidate_pool(&state, &persona, Domain::General, &options, &rules);
        assert!(pool.iter().all(|c| c.id != 2));
    }
}
