//! Match creation and graph updates (§4.7).

use std::collections::HashSet;

use kindred_core::{
    Assessment, Domain, DomainRules, EdgeType, EngineOptions, EngineState, GraphEdge, IdFactory,
    LocationProvider, MatchId, MatchRecord, MatchStatus, Meeting, MeetingStatus, PersonaId,
};

/// Per-persona-per-tick bookkeeping so the orchestrator can enforce the
/// `largePassTopK` cap and the one-match-per-domain rule across sweeps.
#[derive(Debug, Default)]
pub struct PersonaMatchBudget {
    pub created: usize,
    pub domains_matched: HashSet<Domain>,
}

/// Records matches for one persona/domain from large-pass survivors, already
/// sorted or unsorted — this function re-sorts descending by score with
/// ascending-id tiebreak before committing, per the ordering guarantee.
///
/// Re-checks eligibility against `state` as mutated by matches already
/// created earlier in the same tick, then appends a `MatchRecord` and a
/// `match`-typed graph edge for every surviving pair, up to the persona's
/// remaining budget.
pub async fn record_matches(
    state: &mut EngineState,
    persona_id: PersonaId,
    domain: Domain,
    scored: Vec<(PersonaId, Assessment)>,
    options: &EngineOptions,
    rules: &dyn DomainRules,
    id_factory: Option<&dyn IdFactory>,
    location_provider: Option<&dyn LocationProvider>,
    budget: &mut PersonaMatchBudget,
) -> Vec<MatchId> {
    let mut created_ids = Vec::new();

    if budget.domains_matched.contains(&domain) {
        return created_ids;
    }

    let mut sorted = scored;
    sorted.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    for (candidate_id, assessment) in sorted {
        if budget.created >= options.large_pass_top_k {
            break;
        }
        if budget.domains_matched.contains(&domain) {
            break;
        }

        let Some(persona) = state.persona(persona_id).cloned() else {
            continue;
        };
        let Some(candidate) = state.persona(candidate_id).cloned() else {
            continue;
        };
        if !crate::candidate_pool::is_eligible(state, &persona, &candidate, domain, options, rules) {
            continue;
        }

        let match_id = id_factory
            .map(|f| f.next_match_id())
            .unwrap_or_else(default_match_id);

        let weight = (assessment.score / 100.0).max(0.0);
        let mut record = MatchRecord {
            match_id: match_id.clone(),
            domain,
            persona_a: persona_id.min(candidate_id),
            persona_b: persona_id.max(candidate_id),
            created_at: options.now,
            status: MatchStatus::Proposed,
            reasoning: reasoning_trail(&assessment),
            assessment,
            scheduled_meeting_id: None,
        };

        if options.auto_schedule_matches {
            if let Some(provider) = location_provider {
                if let Ok(resolved) = provider
                    .resolve_meeting(persona_id, candidate_id, &match_id)
                    .await
                {
                    let meeting_id = id_factory
                        .map(|f| f.next_meeting_id())
                        .unwrap_or_else(|| format!("meeting-{match_id}"));
                    state.meetings.push(Meeting {
                        meeting_id: meeting_id.clone(),
                        match_id: match_id.clone(),
                        status: MeetingStatus::Scheduled,
                        scheduled_at: Some(resolved.scheduled_at),
                        location: resolved.location,
                    });
                    record.status = MatchStatus::Scheduled;
                    record.scheduled_meeting_id = Some(meeting_id);
                }
            }
        }

        state.match_graph.push(GraphEdge {
            from: record.persona_a,
            to: record.persona_b,
            weight,
            edge_type: EdgeType::Match,
            created_at: options.now,
        });
        state.matches.push(record);

        created_ids.push(match_id);
        budget.created += 1;
        budget.domains_matched.insert(domain);
    }

    created_ids
}

fn reasoning_trail(assessment: &Assessment) -> Vec<String> {
    let mut trail: Vec<String> = assessment.positive_reasons.clone();
    trail.extend(assessment.negative_reasons.iter().cloned());
    trail
}

fn default_match_id() -> MatchId {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kindred_core::model::fixtures::bare_persona;
    use kindred_core::ConfigDomainRules;

    fn options(now: chrono::DateTime<Utc>) -> EngineOptions {
        EngineOptions {
            now,
            batch_size: 25,
            max_candidates: 60,
            small_pass_top_k: 12,
            large_pass_top_k: 1,
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

    #[tokio::test]
    async fn records_match_and_appends_graph_edge() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));

        let rules = ConfigDomainRules::default();
        let mut budget = PersonaMatchBudget::default();
        let scored = vec![(2, Assessment { score: 42.0, ..Default::default() })];

        let created = record_matches(
            &mut state,
            1,
            Domain::General,
            scored,
            &options(now),
            &rules,
            None,
            None,
            &mut budget,
        )
        .await;

        assert_eq!(created.len(), 1);
        assert_eq!(state.matches.len(), 1);
        assert_eq!(state.match_graph.match_edge_count(), 1);
        assert_eq!(budget.created, 1);
    }

    #[tokio::test]
    async fn caps_at_one_match_per_domain_per_persona() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.personas.push(bare_persona(3, "nyc"));

        let rules = ConfigDomainRules::default();
        let mut opts = options(now);
        opts.large_pass_top_k = 5;
        let mut budget = PersonaMatchBudget::default();

        let first = vec![(2, Assessment { score: 10.0, ..Default::default() })];
        record_matches(&mut state, 1, Domain::General, first, &opts, &rules, None, None, &mut budget)
            .await;

        let second = vec![(3, Assessment { score: 50.0, ..Default::default() })];
        let created = record_matches(&mut state, 1, Domain::General, second, &opts, &rules, None, None, &mut budget)
            .await;

        assert!(created.is_empty());
        assert_eq!(state.matches.len(), 1);
    }
}
