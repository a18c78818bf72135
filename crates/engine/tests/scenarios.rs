//! End-to-end tick scenarios (§8) exercised against `run_engine_tick`
//! directly, bypassing any store adapter.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use kindred_core::model::fixtures::bare_persona;
use kindred_core::{
    Assessment, BusinessProfile, ConfigDomainRules, DatingPreferences, DatingProfile, Domain,
    EngineDependencies, EngineOptions, EngineState, FeedbackEntry, FeedbackIssue, FeedbackSentiment,
    FeedbackSource, FriendshipProfile, MatchRecord, MatchStatus,
};
use kindred_engine::run_engine_tick;

fn base_options(now: chrono::DateTime<Utc>, domain: Domain) -> EngineOptions {
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
        match_domains: vec![domain],
        target_persona_ids: None,
        auto_schedule_matches: false,
        require_same_city: false,
        require_shared_interests: false,
        process_feedback_limit: 50,
        process_conversation_limit: None,
    }
}

#[tokio::test]
async fn dating_gender_mismatch_creates_no_match() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
    let mut state = EngineState::default();

    let mut a = bare_persona(1, "nyc");
    a.domains = HashSet::from([Domain::Dating]);
    a.general.gender_identity = "man".to_string();
    a.domain_profiles.dating = Some(DatingProfile {
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
    b.domains = HashSet::from([Domain::Dating]);
    b.general.gender_identity = "man".to_string();
    b.domain_profiles.dating = a.domain_profiles.dating.clone();

    state.personas.push(a);
    state.personas.push(b);

    let rules = ConfigDomainRules::default();
    let options = base_options(now, Domain::Dating);
    let result = run_engine_tick(state, &options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();

    assert!(result.matches_created.is_empty());
}

#[tokio::test]
async fn business_complementarity_creates_a_positive_match() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
    let mut state = EngineState::default();

    let mut a = bare_persona(1, "nyc");
    a.domains = HashSet::from([Domain::Business]);
    a.domain_profiles.business = Some(BusinessProfile {
        roles: vec!["technical".to_string()],
        seeking_roles: vec!["product".to_string(), "design".to_string()],
        ..Default::default()
    });

    let mut b = bare_persona(2, "nyc");
    b.domains = HashSet::from([Domain::Business]);
    b.domain_profiles.business = Some(BusinessProfile {
        roles: vec!["product".to_string()],
        seeking_roles: vec!["technical".to_string()],
        ..Default::default()
    });

    state.personas.push(a);
    state.personas.push(b);

    let rules = ConfigDomainRules::default();
    let options = base_options(now, Domain::Business);
    let result = run_engine_tick(state, &options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();

    assert_eq!(result.matches_created.len(), 1);
    let created = &result.state.matches[0];
    assert!(created.assessment.score > 0.0);
    assert!(created
        .assessment
        .positive_reasons
        .iter()
        .any(|r| r.contains("complementary")));
}

#[tokio::test]
async fn friendship_interest_floor_gates_the_pool() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();

    let mut a = bare_persona(1, "nyc");
    a.domains = HashSet::from([Domain::Friendship]);
    a.profile.interests = vec!["unique_a".to_string()];
    a.domain_profiles.friendship = Some(FriendshipProfile::default());

    let mut b = bare_persona(2, "nyc");
    b.domains = HashSet::from([Domain::Friendship]);
    b.profile.interests = vec!["unique_b".to_string()];
    b.domain_profiles.friendship = Some(FriendshipProfile::default());

    let rules = ConfigDomainRules::default();

    let mut state_strict = EngineState::default();
    state_strict.personas.push(a.clone());
    state_strict.personas.push(b.clone());
    let mut strict_options = base_options(now, Domain::Friendship);
    strict_options.require_shared_interests = true;
    let strict_result = run_engine_tick(state_strict, &strict_options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();
    assert!(strict_result.matches_created.is_empty());

    let mut state_relaxed = EngineState::default();
    state_relaxed.personas.push(a);
    state_relaxed.personas.push(b);
    let mut relaxed_options = base_options(now, Domain::Friendship);
    relaxed_options.require_shared_interests = false;
    let relaxed_result = run_engine_tick(state_relaxed, &relaxed_options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();
    assert_eq!(relaxed_result.matches_created.len(), 1);
}

#[tokio::test]
async fn cooldown_enforcement_blocks_recently_matched_pair() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();

    let mut state = EngineState::default();
    state.personas.push(bare_persona(1, "nyc"));
    state.personas.push(bare_persona(2, "nyc"));
    state.matches.push(MatchRecord {
        match_id: "seed".to_string(),
        domain: Domain::General,
        persona_a: 1,
        persona_b: 2,
        created_at: now - Duration::days(10),
        status: MatchStatus::Completed,
        assessment: Assessment::default(),
        reasoning: Vec::new(),
        scheduled_meeting_id: None,
    });

    let rules = ConfigDomainRules::default();
    let mut strict_options = base_options(now, Domain::General);
    strict_options.match_cooldown_days = 30;
    let result = run_engine_tick(state.clone(), &strict_options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();
    assert!(result.matches_created.is_empty());

    let mut relaxed_options = base_options(now, Domain::General);
    relaxed_options.match_cooldown_days = 1;
    let result = run_engine_tick(state, &relaxed_options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();
    assert_eq!(result.matches_created.len(), 1);
}

#[tokio::test]
async fn negative_feedback_cooldown_blocks_pair_regardless_of_domain() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();

    let mut state = EngineState::default();
    state.personas.push(bare_persona(1, "nyc"));
    state.personas.push(bare_persona(2, "nyc"));
    state.feedback_queue.push(FeedbackEntry {
        id: "f1".to_string(),
        from_persona_id: 1,
        to_persona_id: 2,
        meeting_id: None,
        rating: 1,
        sentiment: FeedbackSentiment::Negative,
        issues: Vec::new(),
        red_flags: Vec::new(),
        notes: String::new(),
        created_at: now - Duration::days(10),
        processed: true,
        processed_at: Some(now - Duration::days(10)),
        source: FeedbackSource::Meeting,
    });

    let rules = ConfigDomainRules::default();
    let mut options = base_options(now, Domain::General);
    options.negative_feedback_cooldown_days = Some(180);
    let result = run_engine_tick(state, &options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();

    assert!(result.matches_created.is_empty());
}

#[tokio::test]
async fn ghost_report_boosts_rater_and_lowers_ratee_reliability() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();

    let mut state = EngineState::default();
    state.personas.push(bare_persona(1, "nyc"));
    state.personas.push(bare_persona(2, "nyc"));
    let rater_start = state.persona(1).unwrap().reliability.score;
    let ratee_start = state.persona(2).unwrap().reliability.score;

    state.feedback_queue.push(FeedbackEntry {
        id: "f1".to_string(),
        from_persona_id: 1,
        to_persona_id: 2,
        meeting_id: None,
        rating: 1,
        sentiment: FeedbackSentiment::Negative,
        issues: vec![FeedbackIssue {
            code: "no_show".to_string(),
            severity: 5,
            notes: None,
            red_flag: false,
        }],
        red_flags: Vec::new(),
        notes: String::new(),
        created_at: now,
        processed: false,
        processed_at: None,
        source: FeedbackSource::Meeting,
    });

    let rules = ConfigDomainRules::default();
    let options = base_options(now, Domain::General);
    let result = run_engine_tick(state, &options, &EngineDependencies::default(), &rules)
        .await
        .unwrap();

    assert_eq!(result.feedback_processed.len(), 1);
    let rater = result.state.persona(1).unwrap();
    let ratee = result.state.persona(2).unwrap();
    assert!(rater.reliability.score > rater_start);
    assert!(rater.match_preferences.reliability_min_score.is_some());
    assert!(ratee.reliability.score < ratee_start);
    assert_eq!(ratee.reliability.no_show_count, 1);
}

#[tokio::test]
async fn parallel_ticks_with_disjoint_targets_do_not_duplicate_matches() {
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();

    let mut state = EngineState::default();
    for i in 1..=6 {
        state.personas.push(bare_persona(i, "nyc"));
    }

    let rules = ConfigDomainRules::default();

    let mut opts_a = base_options(now, Domain::General);
    opts_a.target_persona_ids = Some(HashSet::from([1, 2]));
    let mut opts_b = base_options(now, Domain::General);
    opts_b.target_persona_ids = Some(HashSet::from([3, 4]));
    let mut opts_c = base_options(now, Domain::General);
    opts_c.target_persona_ids = Some(HashSet::from([5, 6]));

    let (result_a, result_b, result_c) = tokio::join!(
        run_engine_tick(state.clone(), &opts_a, &EngineDependencies::default(), &rules),
        run_engine_tick(state.clone(), &opts_b, &EngineDependencies::default(), &rules),
        run_engine_tick(state.clone(), &opts_c, &EngineDependencies::default(), &rules),
    );

    let mut all_match_ids: HashSet<String> = HashSet::new();
    for result in [result_a.unwrap(), result_b.unwrap(), result_c.unwrap()] {
        for id in result.matches_created {
            assert!(all_match_ids.insert(id), "duplicate match id across disjoint ticks");
        }
    }
}
