use std::env;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kindred_core::{Domain, EngineOptions};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{constants, llm::LlmMode};

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::ParseError {
            key: key.to_string(),
            message: format!("could not parse '{raw}'"),
        }),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseError {
                key: key.to_string(),
                message: format!("'{raw}' is not a recognized boolean"),
            }),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, RuntimeEnvironment::Production)
    }

    fn from_env(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "staging" => RuntimeEnvironment::Staging,
            "production" | "prod" => RuntimeEnvironment::Production,
            _ => RuntimeEnvironment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_json: bool,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub tracing_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            otlp_endpoint: None,
            tracing_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub mode: LlmMode,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: LlmMode::None,
            openai_api_key: None,
            openai_model: constants::DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

/// The §6.3 recognized-options table, one field per environment key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub batch_size: usize,
    pub max_candidates: usize,
    pub small_pass_top_k: usize,
    pub large_pass_top_k: usize,
    pub graph_hops: usize,
    pub cooldown_days: i64,
    pub reliability_weight: f64,
    pub min_availability_minutes: u32,
    pub domains: Vec<Domain>,
    pub auto_schedule: bool,
    pub require_same_city: bool,
    pub require_shared_interests: bool,
    pub max_ticks: u32,
    pub cron_max_ms: u64,
    pub lock_ms: u64,
    pub priority_window_hours: u32,
    pub process_feedback_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let cron_max_ms = constants::DEFAULT_CRON_MAX_MS;
        Self {
            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_candidates: constants::DEFAULT_MAX_CANDIDATES,
            small_pass_top_k: constants::DEFAULT_SMALL_PASS_TOP_K,
            large_pass_top_k: constants::DEFAULT_LARGE_PASS_TOP_K,
            graph_hops: constants::DEFAULT_GRAPH_HOPS,
            cooldown_days: constants::DEFAULT_COOLDOWN_DAYS,
            reliability_weight: constants::DEFAULT_RELIABILITY_WEIGHT,
            min_availability_minutes: constants::DEFAULT_MIN_AVAILABILITY_MINUTES,
            domains: vec![Domain::General],
            auto_schedule: constants::DEFAULT_AUTO_SCHEDULE,
            require_same_city: constants::DEFAULT_REQUIRE_SAME_CITY,
            require_shared_interests: constants::DEFAULT_REQUIRE_SHARED_INTERESTS,
            max_ticks: constants::DEFAULT_MAX_TICKS,
            cron_max_ms,
            lock_ms: cron_max_ms + constants::DEFAULT_LOCK_MS_SLACK,
            priority_window_hours: constants::DEFAULT_PRIORITY_WINDOW_HOURS,
            process_feedback_limit: constants::DEFAULT_PROCESS_FEEDBACK_LIMIT,
        }
    }
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let cron_max_ms = parse_env("MATCHING_CRON_MAX_MS", constants::DEFAULT_CRON_MAX_MS)?;
        let lock_ms = match env_var("MATCHING_LOCK_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::ParseError {
                key: "MATCHING_LOCK_MS".to_string(),
                message: format!("could not parse '{raw}'"),
            })?,
            None => cron_max_ms + constants::DEFAULT_LOCK_MS_SLACK,
        };

        let domains = match env_var("MATCH_DOMAINS") {
            None => vec![Domain::General],
            Some(raw) => {
                let mut parsed = Vec::new();
                for token in raw.split(',') {
                    let token = token.trim();
                    if token.is_empty() {
                        continue;
                    }
                    let domain = Domain::from_str_loose(token).ok_or_else(|| {
                        ConfigError::InvalidValue {
                            field: "MATCH_DOMAINS".to_string(),
                            message: format!("unrecognized domain '{token}'"),
                        }
                    })?;
                    parsed.push(domain);
                }
                if parsed.is_empty() {
                    vec![Domain::General]
                } else {
                    parsed
                }
            }
        };

        Ok(Self {
            batch_size: parse_env("MATCHING_BATCH_SIZE", constants::DEFAULT_BATCH_SIZE)?,
            max_candidates: parse_env("MATCHING_MAX_CANDIDATES", constants::DEFAULT_MAX_CANDIDATES)?,
            small_pass_top_k: parse_env("MATCHING_SMALL_TOPK", constants::DEFAULT_SMALL_PASS_TOP_K)?,
            large_pass_top_k: parse_env("MATCHING_LARGE_TOPK", constants::DEFAULT_LARGE_PASS_TOP_K)?,
            graph_hops: parse_env("MATCHING_GRAPH_HOPS", constants::DEFAULT_GRAPH_HOPS)?,
            cooldown_days: parse_env("MATCHING_COOLDOWN_DAYS", constants::DEFAULT_COOLDOWN_DAYS)?,
            reliability_weight: parse_env(
                "MATCHING_RELIABILITY_WEIGHT",
                constants::DEFAULT_RELIABILITY_WEIGHT,
            )?,
            min_availability_minutes: parse_env(
                "MATCHING_MIN_AVAIL_MIN",
                constants::DEFAULT_MIN_AVAILABILITY_MINUTES,
            )?,
            domains,
            auto_schedule: parse_bool_env("MATCHING_AUTO_SCHEDULE", constants::DEFAULT_AUTO_SCHEDULE)?,
            require_same_city: parse_bool_env(
                "MATCH_REQUIRE_SAME_CITY",
                constants::DEFAULT_REQUIRE_SAME_CITY,
            )?,
            require_shared_interests: parse_bool_env(
                "MATCH_REQUIRE_SHARED_INTERESTS",
                constants::DEFAULT_REQUIRE_SHARED_INTERESTS,
            )?,
            max_ticks: parse_env("MATCHING_MAX_TICKS", constants::DEFAULT_MAX_TICKS)?,
            cron_max_ms,
            lock_ms,
            priority_window_hours: parse_env(
                "PRIORITY_MATCH_WINDOW_HOURS",
                constants::DEFAULT_PRIORITY_WINDOW_HOURS,
            )?,
            process_feedback_limit: constants::DEFAULT_PROCESS_FEEDBACK_LIMIT,
        })
    }

    /// Builds the per-tick `EngineOptions` for a sweep at `now`, restricted to
    /// `target_persona_ids` when the host supplies an explicit batch.
    pub fn to_engine_options(
        &self,
        now: DateTime<Utc>,
        target_persona_ids: Option<std::collections::HashSet<kindred_core::PersonaId>>,
    ) -> EngineOptions {
        EngineOptions {
            now,
            batch_size: self.batch_size,
            max_candidates: self.max_candidates,
            small_pass_top_k: self.small_pass_top_k,
            large_pass_top_k: self.large_pass_top_k,
            graph_hops: self.graph_hops,
            match_cooldown_days: self.cooldown_days,
            negative_feedback_cooldown_days: None,
            recent_match_window: None,
            reliability_weight: self.reliability_weight,
            min_availability_minutes: self.min_availability_minutes,
            match_domains: self.domains.clone(),
            target_persona_ids,
            auto_schedule_matches: self.auto_schedule,
            require_same_city: self.require_same_city,
            require_shared_interests: self.require_shared_interests,
            process_feedback_limit: self.process_feedback_limit,
            process_conversation_limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub environment: RuntimeEnvironment,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
    pub matching: MatchingConfig,
    pub llm: LlmConfig,
}

impl Settings {
    /// Loads settings from environment variables, falling back to the
    /// documented defaults for every unset key. Unknown keys are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env_var("MATCHING_ENV")
            .map(|raw| RuntimeEnvironment::from_env(&raw))
            .unwrap_or_default();

        let server = ServerConfig {
            port: parse_env("MATCHING_PORT", constants::DEFAULT_PORT)?,
        };

        let observability = ObservabilityConfig {
            log_level: env_var("MATCHING_LOG_LEVEL")
                .unwrap_or_else(|| constants::DEFAULT_LOG_LEVEL.to_string()),
            log_json: parse_bool_env("MATCHING_LOG_JSON", false)?,
            otlp_endpoint: env_var("OTLP_ENDPOINT"),
            tracing_enabled: env_var("OTLP_ENDPOINT").is_some(),
        };

        let llm = LlmConfig {
            mode: LlmMode::from_env(env_var("MATCHING_LLM_MODE").as_deref())?,
            openai_api_key: env_var("OPENAI_API_KEY"),
            openai_model: env_var("OPENAI_MODEL")
                .unwrap_or_else(|| constants::DEFAULT_OPENAI_MODEL.to_string()),
        };

        let settings = Self {
            environment,
            server,
            observability,
            matching: MatchingConfig::from_env()?,
            llm,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matching.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MATCHING_BATCH_SIZE".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.matching.cooldown_days < 0 {
            return Err(ConfigError::InvalidValue {
                field: "MATCHING_COOLDOWN_DAYS".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        if self.matching.cron_max_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MATCHING_CRON_MAX_MS".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if matches!(self.llm.mode, LlmMode::OpenAi) && self.llm.openai_api_key.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "OPENAI_API_KEY".to_string(),
                message: "required when MATCHING_LLM_MODE=openai".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matching_config_matches_documented_defaults() {
        let config = MatchingConfig::default();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_candidates, 60);
        assert_eq!(config.lock_ms, config.cron_max_ms + 60_000);
        assert_eq!(config.domains, vec![Domain::General]);
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut settings = Settings::default();
        settings.matching.batch_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_requires_openai_key_for_openai_mode() {
        let mut settings = Settings::default();
        settings.llm.mode = LlmMode::OpenAi;
        settings.llm.openai_api_key = None;
        assert!(settings.validate().is_err());

        settings.llm.openai_api_key = Some("sk-test".to_string());
        assert!(settings.validate().is_ok());
    }
}
