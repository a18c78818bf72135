//! Pluggable LLM integration for the matching engine (§4.6).
//!
//! Two concrete `MatchingLlmProvider` implementations: an in-process
//! heuristic provider reusing the engine's own scoring formulas, and an
//! OpenAI-backed provider for `MATCHING_LLM_MODE=openai`. `LlmFactory`
//! selects between them (or neither) from `kindred_config::Settings`.

pub mod error;
pub mod factory;
pub mod heuristic;
pub mod openai;

pub use error::LlmError;
pub use factory::LlmFactory;
pub use heuristic::HeuristicLlmProvider;
pub use openai::OpenAiLlmProvider;
