//! Domain-specific eligibility predicates and scoring weights, expressed as a
//! config-driven strategy so alternate weight tables can be swapped in without
//! touching the candidate pool builder or rankers that consume this trait.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Domain, Persona};

/// Small-pass component weights (§4.4). Values are fixed so independent
/// implementations score candidates identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmallPassWeights {
    pub interest_overlap: f64,
    pub city_match: f64,
    pub availability_overlap: f64,
    pub reliability: f64,
    pub graph_proximity: f64,
    pub goal_alignment: f64,
    pub red_flag_penalty: f64,
}

impl Default for SmallPassWeights {
    fn default() -> Self {
        Self {
            interest_overlap: 0.25,
            city_match: 0.15,
            availability_overlap: 0.15,
            reliability: 0.10,
            graph_proximity: 0.10,
            goal_alignment: 0.10,
            red_flag_penalty: -0.15,
        }
    }
}

/// Large-pass reliability boost thresholds (§4.5, "Reliability boost").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityBoost {
    pub high_threshold: f64,
    pub high_bonus: f64,
    pub low_threshold: f64,
    pub low_penalty: f64,
}

impl Default for ReliabilityBoost {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            high_bonus: 0.10,
            low_threshold: 0.25,
            low_penalty: -0.15,
        }
    }
}

/// Aggregate tunables for eligibility and scoring, loaded with their documented
/// defaults and overridable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRulesConfig {
    pub small_pass_weights: SmallPassWeights,
    pub reliability_boost: ReliabilityBoost,
    pub friendship_min_jaccard: f64,
    pub red_flag_penalty_per_flag: f64,
    pub red_flag_penalty_cap: f64,
}

impl Default for DomainRulesConfig {
    fn default() -> Self {
        Self {
            small_pass_weights: SmallPassWeights::default(),
            reliability_boost: ReliabilityBoost::default(),
            friendship_min_jaccard: 0.05,
            red_flag_penalty_per_flag: -0.25,
            red_flag_penalty_cap: -0.75,
        }
    }
}

/// Toggles that come from `EngineOptions` rather than static config, but are
/// needed by the same eligibility checks.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityConfig {
    pub require_same_city: bool,
    pub require_shared_interests: bool,
}

/// Domain eligibility and scoring strategy. `ConfigDomainRules` is the only
/// implementation shipped; the trait exists so tests can substitute stricter
/// or looser rules without touching the pool builder.
pub trait DomainRules: Send + Sync {
    fn config(&self) -> &DomainRulesConfig;

    /// §4.3.1 dating eligibility.
    fn dating_eligible(&self, persona: &Persona, candidate: &Persona) -> bool {
        let (Some(p_dating), Some(c_dating)) = (
            persona.domain_profiles.dating.as_ref().and_then(|d| d.preferences.as_ref()),
            candidate.domain_profiles.dating.as_ref().and_then(|d| d.preferences.as_ref()),
        ) else {
            return false;
        };

        if !p_dating.preferred_genders.is_empty()
            && !p_dating
                .preferred_genders
                .contains(&candidate.general.gender_identity)
        {
            return false;
        }
        if !c_dating.preferred_genders.is_empty()
            && !c_dating
                .preferred_genders
                .contains(&persona.general.gender_identity)
        {
            return false;
        }
        if let Some(orientation) = &p_dating.orientation {
            if orientation.eq_ignore_ascii_case("gay")
                && persona.general.gender_identity != candidate.general.gender_identity
            {
                return false;
            }
        }
        if let Some(orientation) = &c_dating.orientation {
            if orientation.eq_ignore_ascii_case("gay")
                && persona.general.gender_identity != candidate.general.gender_identity
            {
                return false;
            }
        }

        if let Some(min_age) = p_dating.min_age {
            if candidate.general.age < min_age {
                return false;
            }
        }
        if let Some(max_age) = p_dating.max_age {
            if candidate.general.age > max_age {
                return false;
            }
        }
        if let Some(min_age) = c_dating.min_age {
            if persona.general.age < min_age {
                return false;
            }
        }
        if let Some(max_age) = c_dating.max_age {
            if persona.general.age > max_age {
                return false;
            }
        }

        let candidate_text = format!(
            "{} {}",
            candidate.general.bio,
            candidate.profile.interests.join(" ")
        )
        .to_lowercase();
        for keyword in &p_dating.dealbreaker_keywords {
            if !keyword.is_empty() && candidate_text.contains(&keyword.to_lowercase()) {
                return false;
            }
        }
        let persona_text = format!(
            "{} {}",
            persona.general.bio,
            persona.profile.interests.join(" ")
        )
        .to_lowercase();
        for keyword in &c_dating.dealbreaker_keywords {
            if !keyword.is_empty() && persona_text.contains(&keyword.to_lowercase()) {
                return false;
            }
        }

        if !p_dating.preferred_builds.is_empty() {
            let build_ok = candidate
                .domain_profiles
                .dating
                .as_ref()
                .and_then(|d| d.attraction.build.as_ref())
                .map(|b| p_dating.preferred_builds.contains(b))
                .unwrap_or(false);
            if !build_ok {
                return false;
            }
        }

        true
    }

    /// §4.3.2 business eligibility.
    fn business_eligible(&self, persona: &Persona, candidate: &Persona) -> bool {
        let (Some(p_biz), Some(c_biz)) = (
            persona.domain_profiles.business.as_ref(),
            candidate.domain_profiles.business.as_ref(),
        ) else {
            return false;
        };

        if p_biz.seeking_roles.is_empty() && c_biz.seeking_roles.is_empty() {
            return true;
        }

        let p_seeks_c = p_biz.seeking_roles.iter().any(|role| c_biz.roles.contains(role));
        let c_seeks_p = c_biz.seeking_roles.iter().any(|role| p_biz.roles.contains(role));

        p_seeks_c || c_seeks_p
    }

    /// §4.3.3 friendship eligibility.
    fn friendship_eligible(
        &self,
        persona: &Persona,
        candidate: &Persona,
        require_shared_interests: bool,
    ) -> bool {
        if !require_shared_interests {
            return true;
        }
        jaccard(&persona.profile.interests, &candidate.profile.interests)
            >= self.config().friendship_min_jaccard
    }

    fn domain_participates(&self, persona: &Persona, domain: Domain) -> bool {
        match domain {
            Domain::General => true,
            Domain::Dating => persona.domain_profiles.dating.is_some(),
            Domain::Business => persona.domain_profiles.business.is_some(),
            Domain::Friendship => persona.domain_profiles.friendship.is_some(),
        }
    }
}

/// The only shipped implementation: reads all thresholds from
/// `DomainRulesConfig` and applies no logic beyond the trait defaults above.
pub struct ConfigDomainRules {
    config: DomainRulesConfig,
}

impl ConfigDomainRules {
    pub fn new(config: DomainRulesConfig) -> Self {
        Self { config }
    }
}

impl Default for ConfigDomainRules {
    fn default() -> Self {
        Self::new(DomainRulesConfig::default())
    }
}

impl DomainRules for ConfigDomainRules {
    fn config(&self) -> &DomainRulesConfig {
        &self.config
    }
}

/// Jaccard similarity of two string sets, treated as multisets-as-sets
/// (duplicates collapse). Returns 0 when both sides are empty.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&String> = a.iter().collect();
    let set_b: HashSet<&String> = b.iter().collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::bare_persona;
    use crate::model::{BusinessProfile, DatingPreferences, FriendshipProfile};

    #[test]
    fn business_eligible_requires_role_intersection() {
        let rules = ConfigDomainRules::default();
        let mut a = bare_persona(1, "nyc");
        a.domain_profiles.business = Some(BusinessProfile {
            roles: vec!["technical".to_string()],
            seeking_roles: vec!["product".to_string(), "design".to_string()],
            ..Default::default()
        });
        let mut b = bare_persona(2, "nyc");
        b.domain_profiles.business = Some(BusinessProfile {
            roles: vec!["product".to_string()],
            seeking_roles: vec!["technical".to_string()],
            ..Default::default()
        });

        assert!(rules.business_eligible(&a, &b));

        let mut c = bare_persona(3, "nyc");
        c.domain_profiles.business = Some(BusinessProfile {
            roles: vec!["sales".to_string()],
            seeking_roles: vec!["marketing".to_string()],
            ..Default::default()
        });
        assert!(!rules.business_eligible(&a, &c));
    }

    #[test]
    fn business_eligible_without_seeking_roles_does_not_reject() {
        let rules = ConfigDomainRules::default();
        let mut a = bare_persona(1, "nyc");
        a.domain_profiles.business = Some(BusinessProfile::default());
        let mut b = bare_persona(2, "nyc");
        b.domain_profiles.business = Some(BusinessProfile::default());
        assert!(rules.business_eligible(&a, &b));
    }

    #[test]
    fn friendship_eligible_enforces_jaccard_floor() {
        let rules = ConfigDomainRules::default();
        let mut a = bare_persona(1, "nyc");
        a.profile.interests = vec!["unique_a".to_string()];
        a.domain_profiles.friendship = Some(FriendshipProfile::default());
        let mut b = bare_persona(2, "nyc");
        b.profile.interests = vec!["unique_b".to_string()];
        b.domain_profiles.friendship = Some(FriendshipProfile::default());

        assert!(!rules.friendship_eligible(&a, &b, true));
        assert!(rules.friendship_eligible(&a, &b, false));
    }

    #[test]
    fn dating_eligible_rejects_gender_mismatch() {
        let rules = ConfigDomainRules::default();
        let mut a = bare_persona(1, "nyc");
        a.general.gender_identity = "man".to_string();
        a.domain_profiles.dating = Some(crate::model::DatingProfile {
            preferences: Some(DatingPreferences {
                preferred_genders: HashSet::from(["woman".to_string()]),
                orientation: Some("gay".to_string()),
                min_age: None,
                max_age: None,
                dealbreaker_keywords: Vec::new(),
                preferred_builds: HashSet::new(),
                attractiveness_importance: 5,
                relationship_goal: None,
            }),
            ..Default::default()
        });
        let mut b = bare_persona(2, "nyc");
        b.general.gender_identity = "man".to_string();
        b.domain_profiles.dating = Some(crate::model::DatingProfile {
            preferences: Some(DatingPreferences {
                preferred_genders: HashSet::from(["woman".to_string()]),
                orientation: Some("gay".to_string()),
                min_age: None,
                max_age: None,
                dealbreaker_keywords: Vec::new(),
                preferred_builds: HashSet::new(),
                attractiveness_importance: 5,
                relationship_goal: None,
            }),
            ..Default::default()
        });

        assert!(!rules.dating_eligible(&a, &b));
    }

    #[test]
    fn jaccard_handles_empty_sets() {
        assert_eq!(jaccard(&[], &[]), 0.0);
        let a = vec!["x".to_string()];
        assert_eq!(jaccard(&a, &[]), 0.0);
    }
}
