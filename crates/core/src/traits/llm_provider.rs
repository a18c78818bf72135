//! Optional LLM-backed replacement for the default heuristic small/large
//! pass. Both methods are declared pure from the engine's point of view: no
//! observable side effects on state, and failures are caught by the caller
//! and treated as `EngineError::TransientDependency`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{Domain, Persona, PersonaId};

#[derive(Debug, Clone)]
pub struct SmallPassInput<'a> {
    pub persona: &'a Persona,
    pub candidates: &'a [Persona],
    pub domain: Domain,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmallPassOutput {
    pub ranked_ids: Vec<PersonaId>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LargePassInput<'a> {
    pub persona: &'a Persona,
    pub candidate: &'a Persona,
    pub domain: Domain,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LargePassOutput {
    pub score: f64,
    #[serde(default)]
    pub positive_reasons: Vec<String>,
    #[serde(default)]
    pub negative_reasons: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[async_trait]
pub trait MatchingLlmProvider: Send + Sync {
    /// Must return a prefix of `input.candidates`' ids, in the order the
    /// provider ranked them. Ids not present in the input are filtered out by
    /// the caller rather than rejected here.
    async fn small_pass(&self, input: SmallPassInput<'_>) -> Result<SmallPassOutput, EngineError>;

    /// The returned score is clamped to `[-100, 100]` by the caller; reasons
    /// are used verbatim.
    async fn large_pass(&self, input: LargePassInput<'_>) -> Result<LargePassOutput, EngineError>;
}
