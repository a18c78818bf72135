pub mod domain_rules;
pub mod llm_provider;
pub mod providers;

pub use domain_rules::{ConfigDomainRules, DomainRules, DomainRulesConfig, EligibilityConfig};
pub use llm_provider::{
    LargePassInput, LargePassOutput, MatchingLlmProvider, SmallPassInput, SmallPassOutput,
};
pub use providers::{IdFactory, LocationProvider, ResolvedMeeting};
