use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Selects which `MatchingLlmProvider` implementation the host wires up for
/// `deps.llm`. `None` means the orchestrator runs with no LLM dependency at
/// all (pure heuristic path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    None,
    Heuristic,
    OpenAi,
}

impl Default for LlmMode {
    fn default() -> Self {
        LlmMode::None
    }
}

impl LlmMode {
    pub fn from_env(raw: Option<&str>) -> Result<Self, ConfigError> {
        match raw.map(|s| s.to_ascii_lowercase()) {
            None => Ok(LlmMode::None),
            Some(s) => match s.as_str() {
                "" | "none" => Ok(LlmMode::None),
                "heuristic" => Ok(LlmMode::Heuristic),
                "openai" => Ok(LlmMode::OpenAi),
                other => Err(ConfigError::InvalidValue {
                    field: "MATCHING_LLM_MODE".to_string(),
                    message: format!("unrecognized mode '{other}'"),
                }),
            },
        }
    }
}
