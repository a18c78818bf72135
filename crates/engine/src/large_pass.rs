//! Heuristic large pass (§4.5): per-domain component scoring plus the
//! reliability boost, producing the final assessment recorded on a match.

use kindred_core::{Assessment, Domain, DomainRules, Persona};

use crate::availability::weekly_overlap_minutes;
use kindred_core::EngineOptions;

/// Scores one persona/candidate pair in `domain`, producing a full
/// `Assessment` the way a match record stores it. The score is clamped to
/// `[-100, 100]`.
pub fn heuristic_large_pass(
    persona: &Persona,
    candidate: &Persona,
    domain: Domain,
    options: &EngineOptions,
    rules: &dyn DomainRules,
) -> Assessment {
    let mut positive_reasons = Vec::new();
    let mut negative_reasons = Vec::new();
    let mut score = 0.0f64;

    let interest_overlap = kindred_core::traits::domain_rules::jaccard(
        &persona.profile.interests,
        &candidate.profile.interests,
    );
    score += interest_overlap * 30.0;
    if interest_overlap > 0.3 {
        positive_reasons.push(format!("shares {:.0}% of interests", interest_overlap * 100.0));
    }

    if persona.general.location.city == candidate.general.location.city {
        score += 10.0;
        positive_reasons.push("same city".to_string());
    }

    let overlap_minutes = weekly_overlap_minutes(
        options.now,
        persona.profile.availability.as_ref(),
        &persona.general.location.time_zone,
        candidate.profile.availability.as_ref(),
        &candidate.general.location.time_zone,
    );
    if overlap_minutes > 0 {
        score += (overlap_minutes as f64 / 60.0).min(6.0) * 2.0;
        positive_reasons.push(format!("{overlap_minutes} minutes of overlapping availability"));
    } else {
        negative_reasons.push("no overlapping availability".to_string());
    }

    let goal_overlap = kindred_core::traits::domain_rules::jaccard(
        &persona.profile.connection_goals,
        &candidate.profile.connection_goals,
    );
    score += goal_overlap * 15.0;

    let mut domain_red_flags = Vec::new();
    let domain_component = match domain {
        Domain::Dating => dating_component(
            persona,
            candidate,
            &mut positive_reasons,
            &mut negative_reasons,
            &mut domain_red_flags,
        ),
        Domain::Business => business_component(persona, candidate, &mut positive_reasons, &mut negative_reasons),
        Domain::Friendship => {
            friendship_component(persona, candidate, &mut positive_reasons, &mut negative_reasons)
        }
        Domain::General => 0.0,
    };
    score += domain_component;

    let boost = &rules.config().reliability_boost;
    if candidate.reliability.score >= boost.high_threshold {
        score += boost.high_bonus * 100.0 * options.reliability_weight;
        positive_reasons.push("highly reliable".to_string());
    } else if candidate.reliability.score <= boost.low_threshold {
        score += boost.low_penalty * 100.0 * options.reliability_weight;
        negative_reasons.push("low reliability history".to_string());
    }

    let mut red_flags: Vec<String> = candidate.red_flag_tags.iter().cloned().collect();
    red_flags.extend(domain_red_flags);
    if !red_flags.is_empty() {
        let penalty = (rules.config().red_flag_penalty_per_flag * red_flags.len() as f64)
            .max(rules.config().red_flag_penalty_cap)
            * 100.0;
        score += penalty;
    }

    let clamped = score.clamp(-100.0, 100.0);

    Assessment {
        score: clamped,
        small_pass_score: None,
        large_pass_score: Some(clamped),
        positive_reasons,
        negative_reasons,
        red_flags,
    }
}

fn dating_component(
    persona: &Persona,
    candidate: &Persona,
    positive: &mut Vec<String>,
    negative: &mut Vec<String>,
    red_flags: &mut Vec<String>,
) -> f64 {
    let Some(p_dating) = persona.domain_profiles.dating.as_ref() else {
        return 0.0;
    };
    let Some(c_dating) = candidate.domain_profiles.dating.as_ref() else {
        return 0.0;
    };
    let p_pref = p_dating.preferences.as_ref();

    let mut component = 0.0;

    if let (Some(p_pref), Some(c_pref)) = (p_pref, &c_dating.preferences) {
        match (&p_pref.relationship_goal, &c_pref.relationship_goal) {
            (Some(p_goal), Some(c_goal)) if p_goal == c_goal => {
                component += 10.0;
                positive.push("aligned relationship goals".to_string());
            }
            (Some(_), Some(_)) => {
                component -= 10.0;
                negative.push("misaligned relationship goals".to_string());
            }
            _ => {}
        }
    }

    if p_dating.attraction.attractiveness > 0 && c_dating.attraction.attractiveness > 0 {
        let diff = (p_dating.attraction.attractiveness as i32 - c_dating.attraction.attractiveness as i32).abs();
        if diff >= 3 {
            let importance = p_pref.map(|p| p.attractiveness_importance).unwrap_or(0);
            component -= 10.0 * (importance as f64 / 10.0);
            if importance >= 7 {
                negative.push("attractiveness mismatch".to_string());
            }
        }
    }

    if let Some(p_pref) = p_pref {
        if !p_pref.preferred_builds.is_empty() {
            if let Some(build) = &c_dating.attraction.build {
                if p_pref.preferred_builds.contains(build) {
                    component += 5.0;
                } else {
                    component -= 5.0;
                    negative.push("build not a preferred match".to_string());
                }
            }
        }

        let bio = candidate.general.bio.to_lowercase();
        if !bio.is_empty() {
            if let Some(keyword) = p_pref
                .dealbreaker_keywords
                .iter()
                .find(|kw| !kw.is_empty() && bio.contains(&kw.to_lowercase()))
            {
                component -= 20.0;
                negative.push(format!("bio mentions dealbreaker '{keyword}'"));
                red_flags.push(format!("dealbreaker_in_bio:{keyword}"));
            }
        }
    }

    component
}

fn business_component(
    persona: &Persona,
    candidate: &Persona,
    positive: &mut Vec<String>,
    negative: &mut Vec<String>,
) -> f64 {
    let Some(p_biz) = persona.domain_profiles.business.as_ref() else {
        return 0.0;
    };
    let Some(c_biz) = candidate.domain_profiles.business.as_ref() else {
        return 0.0;
    };

    let mut component = 0.0;
    let role_match = p_biz.seeking_roles.iter().any(|r| c_biz.roles.contains(r))
        || c_biz.seeking_roles.iter().any(|r| p_biz.roles.contains(r));
    if role_match {
        component += 20.0;
        positive.push("complementary roles".to_string());
    }
    let skill_overlap = kindred_core::traits::domain_rules::jaccard(&p_biz.skills, &c_biz.skills);
    component += skill_overlap * 10.0;
    if p_biz.company_stage.is_some() && p_biz.company_stage == c_biz.company_stage {
        component += 5.0;
    }
    if !role_match && skill_overlap < 0.05 {
        negative.push("little professional overlap".to_string());
    }
    component
}

fn friendship_component(
    persona: &Persona,
    candidate: &Persona,
    positive: &mut Vec<String>,
    _negative: &mut Vec<String>,
) -> f64 {
    let Some(p_friend) = persona.domain_profiles.friendship.as_ref() else {
        return 0.0;
    };
    let Some(c_friend) = candidate.domain_profiles.friendship.as_ref() else {
        return 0.0;
    };

    let mut component = 0.0;
    let interest_overlap =
        kindred_core::traits::domain_rules::jaccard(&p_friend.interests, &c_friend.interests);
    component += interest_overlap * 10.0;
    if p_friend.vibe.is_some() && p_friend.vibe == c_friend.vibe {
        component += 8.0;
        positive.push("matching social vibe".to_string());
    }
    component
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kindred_core::model::fixtures::bare_persona;
    use kindred_core::{BusinessProfile, ConfigDomainRules};

    fn options(now: chrono::DateTime<Utc>) -> EngineOptions {
        EngineOptions {
            now,
            batch_size: 25,
            max_candidates: 60,
            small_pass_top_k: 12,
            large_pass_top_k: 6,
            graph_hops: 2,
            match_cooldown_days: 30,
            negative_feedback_cooldown_days: None,
            recent_match_window: None,
            reliability_weight: 1.0,
            min_availability_minutes: 0,
            match_domains: vec![Domain::General],
            target_persona_ids: None,
            auto_schedule_matches: false,
            require_same_city: false,
            require_shared_interests: false,
            process_feedback_limit: 50,
            process_conversation_limit: None,
        }
    }

    #[test]
    fn complementary_business_roles_score_higher_than_unrelated() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut a = bare_persona(1, "nyc");
        a.domain_profiles.business = Some(BusinessProfile {
            roles: vec!["technical".to_string()],
            seeking_roles: vec!["design".to_string()],
            ..Default::default()
        });
        let mut b = bare_persona(2, "nyc");
        b.domain_profiles.business = Some(BusinessProfile {
            roles: vec!["design".to_string()],
            seeking_roles: vec!["technical".to_string()],
            ..Default::default()
        });
        let mut c = bare_persona(3, "nyc");
        c.domain_profiles.business = Some(BusinessProfile::default());

        let rules = ConfigDomainRules::default();
        let good = heuristic_large_pass(&a, &b, Domain::Business, &options(now), &rules);
        let bad = heuristic_large_pass(&a, &c, Domain::Business, &options(now), &rules);
        assert!(good.score > bad.score);
    }

    #[test]
    fn low_reliability_candidate_is_penalized() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let a = bare_persona(1, "nyc");
        let mut low = bare_persona(2, "nyc");
        low.reliability.score = 0.1;
        let mut high = bare_persona(3, "nyc");
        high.reliability.score = 0.95;

        let rules = ConfigDomainRules::default();
        let low_score = heuristic_large_pass(&a, &low, Domain::General, &options(now), &rules);
        let high_score = heuristic_large_pass(&a, &high, Domain::General, &options(now), &rules);
        assert!(high_score.score > low_score.score);
    }
}
