//! Environment-driven configuration for the matching engine: the §6.3
//! recognized-options table plus the ambient server/observability/LLM
//! settings a deployable binary needs.

pub mod constants;
pub mod error;
pub mod llm;
pub mod settings;

pub use error::ConfigError;
pub use llm::LlmMode;
pub use settings::{
    LlmConfig, MatchingConfig, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings,
};
