//! Trait-dispatch wrapper around the engine's default heuristic scoring
//! (§4.6: `Heuristic` mode exercises the trait-dispatch path with the same
//! formulas the engine falls back to when `deps.llm` is absent entirely).

use async_trait::async_trait;
use kindred_core::{
    ConfigDomainRules, EngineError, LargePassInput, LargePassOutput, MatchingLlmProvider,
    SmallPassInput, SmallPassOutput,
};
use kindred_engine::{heuristic_large_pass, heuristic_small_pass};

/// The default `EngineOptions` this provider uses to drive the availability
/// and reliability components of the heuristic formulas, since the LLM
/// provider interface does not carry `EngineOptions` through its inputs.
fn default_options(now: chrono::DateTime<chrono::Utc>) -> kindred_core::EngineOptions {
    kindred_core::EngineOptions {
        now,
        batch_size: 1,
        max_candidates: 1,
        small_pass_top_k: 1,
        large_pass_top_k: 1,
        graph_hops: 0,
        match_cooldown_days: 0,
        negative_feedback_cooldown_days: None,
        recent_match_window: None,
        reliability_weight: 1.0,
        min_availability_minutes: 0,
        match_domains: vec![],
        target_persona_ids: None,
        auto_schedule_matches: false,
        require_same_city: false,
        require_shared_interests: false,
        process_feedback_limit: 0,
        process_conversation_limit: None,
    }
}

pub struct HeuristicLlmProvider {
    rules: ConfigDomainRules,
}

impl HeuristicLlmProvider {
    pub fn new() -> Self {
        Self {
            rules: ConfigDomainRules::default(),
        }
    }
}

impl Default for HeuristicLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchingLlmProvider for HeuristicLlmProvider {
    async fn small_pass(&self, input: SmallPassInput<'_>) -> Result<SmallPassOutput, EngineError> {
        let now = chrono::Utc::now();
        let candidates: Vec<&kindred_core::Persona> = input.candidates.iter().collect();
        let options = default_options(now);
        // No EngineState/matchGraph reaches this interface, so graph
        // proximity never boosts candidates here.
        let ranked = heuristic_small_pass(
            input.persona,
            &candidates,
            input.domain,
            &options,
            &self.rules,
            &std::collections::HashMap::new(),
            input.candidates.len(),
        );
        Ok(SmallPassOutput {
            ranked_ids: ranked.into_iter().map(|s| s.persona_id).collect(),
            notes: Some("heuristic".to_string()),
        })
    }

    async fn large_pass(&self, input: LargePassInput<'_>) -> Result<LargePassOutput, EngineError> {
        let now = chrono::Utc::now();
        let options = default_options(now);
        let assessment =
            heuristic_large_pass(input.persona, input.candidate, input.domain, &options, &self.rules);
        Ok(LargePassOutput {
            score: assessment.score,
            positive_reasons: assessment.positive_reasons,
            negative_reasons: assessment.negative_reasons,
            red_flags: assessment.red_flags,
            notes: Some("heuristic".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_core::model::fixtures::bare_persona;
    use kindred_core::Domain;

    #[tokio::test]
    async fn small_pass_ranks_all_candidates_by_default() {
        let persona = bare_persona(1, "nyc");
        let candidates = vec![bare_persona(2, "nyc"), bare_persona(3, "nyc")];
        let provider = HeuristicLlmProvider::new();
        let output = provider
            .small_pass(SmallPassInput {
                persona: &persona,
                candidates: &candidates,
                domain: Domain::General,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(output.ranked_ids.len(), 2);
    }

    #[tokio::test]
    async fn large_pass_score_is_bounded() {
        let persona = bare_persona(1, "nyc");
        let candidate = bare_persona(2, "nyc");
        let provider = HeuristicLlmProvider::new();
        let output = provider
            .large_pass(LargePassInput {
                persona: &persona,
                candidate: &candidate,
                domain: Domain::General,
                notes: None,
            })
            .await
            .unwrap();
        assert!(output.score >= -100.0 && output.score <= 100.0);
    }
}
