//! OpenAI-backed `MatchingLlmProvider` (§4.6, `MatchingLlmMode::OpenAi`).
//!
//! Sends a compact JSON description of the persona/candidates to the chat
//! completions endpoint and parses a structured response. Any failure
//! (network, non-2xx, malformed JSON) surfaces as
//! `EngineError::TransientDependency`; the orchestrator is responsible for
//! falling back to the heuristic path and annotating the match's reasoning
//! with "llm:fallback".

use async_trait::async_trait;
use kindred_core::{
    EngineError, LargePassInput, LargePassOutput, MatchingLlmProvider, Persona, SmallPassInput,
    SmallPassOutput,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::LlmError;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiLlmProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiLlmProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn chat(&self, system: &str, user: serde_json::Value) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user.to_string() },
            ],
        });

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::Network(format!(
                "openai returned status {}",
                response.status()
            )));
        }

        let parsed: ChatCompletion = response
            .json()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct PersonaSketch<'a> {
    id: i64,
    interests: &'a [String],
    goals: &'a [String],
    city: &'a str,
}

impl<'a> From<&'a Persona> for PersonaSketch<'a> {
    fn from(p: &'a Persona) -> Self {
        Self {
            id: p.id,
            interests: &p.profile.interests,
            goals: &p.profile.connection_goals,
            city: &p.general.location.city,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SmallPassReply {
    ranked_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct LargePassReply {
    score: f64,
    #[serde(default)]
    positive_reasons: Vec<String>,
    #[serde(default)]
    negative_reasons: Vec<String>,
    #[serde(default)]
    red_flags: Vec<String>,
}

#[async_trait]
impl MatchingLlmProvider for OpenAiLlmProvider {
    async fn small_pass(&self, input: SmallPassInput<'_>) -> Result<SmallPassOutput, EngineError> {
        let payload = json!({
            "persona": PersonaSketch::from(input.persona),
            "candidates": input.candidates.iter().map(PersonaSketch::from).collect::<Vec<_>>(),
            "domain": input.domain.as_str(),
            "instructions": "Return JSON {\"ranked_ids\": [ids...]} ranking candidates best-first for the persona.",
        });

        let raw = self
            .chat(
                "You rank social-matching candidates. Respond with strict JSON only.",
                payload,
            )
            .await
            .map_err(EngineError::from)?;
        let parsed: SmallPassReply = serde_json::from_str(&raw)
            .map_err(|err| EngineError::from(LlmError::InvalidResponse(err.to_string())))?;

        Ok(SmallPassOutput {
            ranked_ids: parsed.ranked_ids,
            notes: Some("openai".to_string()),
        })
    }

    async fn large_pass(&self, input: LargePassInput<'_>) -> Result<LargePassOutput, EngineError> {
        let payload = json!({
            "persona": PersonaSketch::from(input.persona),
            "candidate": PersonaSketch::from(input.candidate),
            "domain": input.domain.as_str(),
            "instructions": "Return JSON {\"score\": -100..100, \"positive_reasons\": [...], \"negative_reasons\": [...], \"red_flags\": [...]}.",
        });

        let raw = self
            .chat(
                "You assess one candidate pair for social matching. Respond with strict JSON only.",
                payload,
            )
            .await
            .map_err(EngineError::from)?;
        let parsed: LargePassReply = serde_json::from_str(&raw)
            .map_err(|err| EngineError::from(LlmError::InvalidResponse(err.to_string())))?;

        Ok(LargePassOutput {
            score: parsed.score.clamp(-100.0, 100.0),
            positive_reasons: parsed.positive_reasons,
            negative_reasons: parsed.negative_reasons,
            red_flags: parsed.red_flags,
            notes: Some("openai".to_string()),
        })
    }
}
