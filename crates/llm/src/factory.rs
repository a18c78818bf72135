//! Provider selection by `kindred_config::LlmMode` (§4.6).
//!
//! Replaces the teacher's Claude/Ollama/Azure backend switch with a
//! three-way choice: no LLM dependency at all, the in-process heuristic
//! provider (same formulas the engine falls back to), or the OpenAI-backed
//! provider.

use std::sync::Arc;

use kindred_config::{LlmMode, Settings};
use kindred_core::MatchingLlmProvider;

use crate::heuristic::HeuristicLlmProvider;
use crate::openai::OpenAiLlmProvider;

pub struct LlmFactory;

impl LlmFactory {
    /// Builds the provider `deps.llm` should hold for this run, or `None`
    /// when `LlmMode::None` is configured.
    pub fn create(settings: &Settings) -> Option<Arc<dyn MatchingLlmProvider>> {
        match settings.llm.mode {
            LlmMode::None => None,
            LlmMode::Heuristic => Some(Arc::new(HeuristicLlmProvider::new())),
            LlmMode::OpenAi => {
                let api_key = settings.llm.openai_api_key.clone().unwrap_or_default();
                Some(Arc::new(OpenAiLlmProvider::new(
                    api_key,
                    settings.llm.openai_model.clone(),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_mode_yields_no_provider() {
        let settings = Settings::default();
        assert!(LlmFactory::create(&settings).is_none());
    }

    #[test]
    fn heuristic_mode_yields_a_provider() {
        let mut settings = Settings::default();
        settings.llm.mode = LlmMode::Heuristic;
        assert!(LlmFactory::create(&settings).is_some());
    }

    #[test]
    fn openai_mode_yields_a_provider() {
        let mut settings = Settings::default();
        settings.llm.mode = LlmMode::OpenAi;
        settings.llm.openai_api_key = Some("sk-test".to_string());
        assert!(LlmFactory::create(&settings).is_some());
    }
}
