//! Feedback processing (§4.8): folds rater→ratee observations into the
//! ratee's reliability and feedback summary, and the rater's bias stats.

use kindred_core::{
    Fact, FactStatus, FeedbackEntry, FeedbackId, FeedbackSentiment, PersonaId, ReliabilityEvent,
    ReliabilityEventType,
};
use kindred_core::EngineState;

/// Processes up to `limit` unprocessed entries from `state.feedback_queue`, in
/// FIFO order, returning the ids of entries processed this call.
///
/// Re-running with the same input after a prior run processes zero further
/// entries (P2): every entry this function touches is marked `processed=true`
/// before it returns, and already-processed entries are skipped.
pub fn process_feedback_queue(state: &mut EngineState, now: chrono::DateTime<chrono::Utc>, limit: usize) -> Vec<FeedbackId> {
    let pending_ids: Vec<FeedbackId> = state
        .feedback_queue
        .iter()
        .filter(|f| !f.processed)
        .take(limit)
        .map(|f| f.id.clone())
        .collect();

    let mut processed = Vec::new();
    for id in pending_ids {
        if process_one(state, &id, now) {
            processed.push(id);
        }
    }
    processed
}

fn process_one(state: &mut EngineState, entry_id: &FeedbackId, now: chrono::DateTime<chrono::Utc>) -> bool {
    let Some(index) = state.feedback_queue.iter().position(|f| &f.id == entry_id) else {
        return false;
    };
    let entry = state.feedback_queue[index].clone();

    let rater_exists = state.persona(entry.from_persona_id).is_some();
    let ratee_exists = state.persona(entry.to_persona_id).is_some();
    if !rater_exists || !ratee_exists {
        mark_processed(state, index, now);
        return true;
    }

    let rater_bias = state.persona(entry.from_persona_id).unwrap().feedback_bias.clone();
    let bias_weight = bias_weight(&rater_bias);
    let adjusted_rating = adjusted_rating(entry.rating as f64, &rater_bias);

    apply_to_ratee(state, &entry, adjusted_rating, bias_weight, now);
    apply_ghost_reverse_boost(state, &entry, bias_weight, now);
    apply_to_rater(state, &entry, now);

    mark_processed(state, index, now);
    true
}

fn mark_processed(state: &mut EngineState, index: usize, now: chrono::DateTime<chrono::Utc>) {
    let entry = &mut state.feedback_queue[index];
    entry.processed = true;
    entry.processed_at = Some(now);
}

fn bias_weight(bias: &kindred_core::FeedbackBias) -> f64 {
    (1.0 - 0.5 * (bias.harshness_score - 0.5).abs() - 0.5 * (bias.positivity_bias - 0.5).abs())
        .clamp(0.6, 1.2)
}

fn adjusted_rating(rating: f64, bias: &kindred_core::FeedbackBias) -> f64 {
    (rating + (bias.harshness_score - 0.5) * 0.9 - (bias.positivity_bias - 0.5) * 0.9).clamp(1.0, 5.0)
}

fn effective_sentiment(adjusted_rating: f64) -> FeedbackSentiment {
    if adjusted_rating >= 4.0 {
        FeedbackSentiment::Positive
    } else if adjusted_rating <= 2.0 {
        FeedbackSentiment::Negative
    } else {
        FeedbackSentiment::Neutral
    }
}

fn apply_to_ratee(
    state: &mut EngineState,
    entry: &FeedbackEntry,
    adjusted_rating: f64,
    bias_weight: f64,
    now: chrono::DateTime<chrono::Utc>,
) {
    let sentiment = effective_sentiment(adjusted_rating);

    let base_delta = if entry.rating >= 5 {
        0.08
    } else if entry.rating >= 4 {
        0.04
    } else if entry.rating <= 2 {
        -0.06
    } else {
        0.0
    };

    let mut issue_delta = 0.0f64;
    let mut event_type = ReliabilityEventType::Attended;
    for issue in &entry.issues {
        let code = issue.code.to_ascii_lowercase();
        if code.contains("ghost") || code.contains("no_show") {
            issue_delta += -0.25;
            event_type = if code.contains("ghost") {
                ReliabilityEventType::Ghost
            } else {
                ReliabilityEventType::NoShow
            };
        } else if code.contains("late_cancel") || code.contains("late") {
            issue_delta += -0.12;
            event_type = ReliabilityEventType::LateCancel;
        } else if code.contains("on_time") || code.contains("attended") {
            issue_delta += 0.08;
            event_type = if code.contains("on_time") {
                ReliabilityEventType::OnTime
            } else {
                ReliabilityEventType::Attended
            };
        }
    }

    let total_delta = (base_delta + issue_delta) * bias_weight;

    let Some(ratee) = state.persona_mut(entry.to_persona_id) else {
        return;
    };

    let prior_count = (ratee.profile.feedback_summary.positive_count
        + ratee.profile.feedback_summary.neutral_count
        + ratee.profile.feedback_summary.negative_count) as f64;
    ratee.profile.feedback_summary.sentiment_score = weighted_mean(
        ratee.profile.feedback_summary.sentiment_score,
        prior_count,
        adjusted_rating,
        bias_weight,
    );
    match sentiment {
        FeedbackSentiment::Positive => ratee.profile.feedback_summary.positive_count += 1,
        FeedbackSentiment::Neutral => ratee.profile.feedback_summary.neutral_count += 1,
        FeedbackSentiment::Negative => ratee.profile.feedback_summary.negative_count += 1,
    }
    for issue in &entry.issues {
        ratee.profile.feedback_summary.issue_tags.insert(issue.code.clone());
        if issue.red_flag {
            ratee.red_flag_tags.insert(issue.code.clone());
        }
    }
    for flag in &entry.red_flags {
        ratee.profile.feedback_summary.red_flag_tags.insert(flag.clone());
        ratee.red_flag_tags.insert(flag.clone());
    }

    let new_score = (ratee.reliability.score + total_delta).clamp(0.0, 1.0);
    ratee.reliability.score = new_score;
    match event_type {
        ReliabilityEventType::NoShow => ratee.reliability.no_show_count += 1,
        ReliabilityEventType::Ghost => ratee.reliability.ghost_count += 1,
        ReliabilityEventType::LateCancel => ratee.reliability.late_cancel_count += 1,
        ReliabilityEventType::Attended | ReliabilityEventType::OnTime => {
            ratee.reliability.attended_count += 1
        }
    }
    ratee.reliability.history.push(ReliabilityEvent {
        event_type,
        impact: total_delta,
        at: now,
    });

    for issue in &entry.issues {
        ratee.facts.push(Fact {
            key: format!("feedback_issue:{}", issue.code),
            value: issue.notes.clone().unwrap_or_default(),
            confidence: entry.rating as f64 / 5.0,
            status: FactStatus::Active,
            recorded_at: now,
        });
    }
    for flag in &entry.red_flags {
        ratee.facts.push(Fact {
            key: format!("feedback_red_flag:{flag}"),
            value: String::new(),
            confidence: entry.rating as f64 / 5.0,
            status: FactStatus::Active,
            recorded_at: now,
        });
    }

    ratee.touch(now);
}

/// Running mean of `sample` into `running`, where `running` already
/// aggregates `prior_count` equally-weighted observations and `sample` is
/// weighted by `weight` relative to them.
fn weighted_mean(running: f64, prior_count: f64, sample: f64, weight: f64) -> f64 {
    (running * prior_count + sample * weight) / (prior_count + weight)
}

/// §4.8 step 7: if the entry reports a ghost/no-show against the ratee,
/// reward the rater for reporting it honestly and raise their reliability floor.
fn apply_ghost_reverse_boost(
    state: &mut EngineState,
    entry: &FeedbackEntry,
    bias_weight: f64,
    now: chrono::DateTime<chrono::Utc>,
) {
    let reports_ghost = entry
        .issues
        .iter()
        .any(|i| i.code.to_ascii_lowercase().contains("ghost") || i.code.to_ascii_lowercase().contains("no_show"));
    if !reports_ghost {
        return;
    }

    let Some(rater) = state.persona_mut(entry.from_persona_id) else {
        return;
    };

    rater.reliability.score = (rater.reliability.score + 0.05 * bias_weight).clamp(0.0, 1.0);
    let raised_floor = (rater.reliability.score + 0.15).clamp(0.0, 0.85);
    rater.match_preferences.reliability_min_score = Some(
        rater
            .match_preferences
            .reliability_min_score
            .map(|current| current.max(raised_floor))
            .unwrap_or(raised_floor),
    );
    rater.facts.push(Fact {
        key: "feedback_experience:ghosted".to_string(),
        value: String::new(),
        confidence: 1.0,
        status: FactStatus::Active,
        recorded_at: now,
    });
}

fn apply_to_rater(state: &mut EngineState, entry: &FeedbackEntry, now: chrono::DateTime<chrono::Utc>) {
    let Some(rater) = state.persona_mut(entry.from_persona_id) else {
        return;
    };

    rater.feedback_bias.ratings_given_count += 1;
    rater.feedback_bias.ratings_given_sum += entry.rating as f64;
    if entry.rating <= 2 {
        rater.feedback_bias.negative_given_count += 1;
    }
    let gave_red_flag = !entry.red_flags.is_empty() || entry.issues.iter().any(|i| i.red_flag);
    if gave_red_flag {
        rater.feedback_bias.red_flag_given_count += 1;
    }

    let avg = rater.feedback_bias.average_rating();
    let negative_rate = rater.feedback_bias.negative_rate();
    let red_flag_rate = rater.feedback_bias.red_flag_rate();

    rater.feedback_bias.harshness_score = (1.0 - avg / 5.0).clamp(0.0, 1.0);
    rater.feedback_bias.positivity_bias = (1.0 - negative_rate).clamp(0.0, 1.0);
    rater.feedback_bias.red_flag_frequency = red_flag_rate.clamp(0.0, 1.0);

    rater.touch(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kindred_core::model::fixtures::bare_persona;
    use kindred_core::{FeedbackIssue, FeedbackSource};

    fn entry(id: &str, from: PersonaId, to: PersonaId, rating: u8, issues: Vec<FeedbackIssue>, created_at: chrono::DateTime<chrono::Utc>) -> FeedbackEntry {
        FeedbackEntry {
            id: id.to_string(),
            from_persona_id: from,
            to_persona_id: to,
            meeting_id: None,
            rating,
            sentiment: effective_sentiment(rating as f64),
            issues,
            red_flags: Vec::new(),
            notes: String::new(),
            created_at,
            processed: false,
            processed_at: None,
            source: FeedbackSource::Meeting,
        }
    }

    #[test]
    fn processing_marks_entries_processed_and_is_idempotent() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.feedback_queue.push(entry("f1", 1, 2, 5, vec![], now));

        let first = process_feedback_queue(&mut state, now, 50);
        assert_eq!(first, vec!["f1".to_string()]);
        assert!(state.feedback_queue[0].processed);

        let second = process_feedback_queue(&mut state, now, 50);
        assert!(second.is_empty());
    }

    #[test]
    fn no_show_lowers_ratee_reliability_and_boosts_rater() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        let ratee_start = state.persona(2).unwrap().reliability.score;
        let rater_start = state.persona(1).unwrap().reliability.score;

        state.feedback_queue.push(entry(
            "f1",
            1,
            2,
            1,
            vec![FeedbackIssue {
                code: "no_show".to_string(),
                severity: 5,
                notes: None,
                red_flag: false,
            }],
            now,
        ));

        process_feedback_queue(&mut state, now, 50);

        assert!(state.persona(2).unwrap().reliability.score < ratee_start);
        assert_eq!(state.persona(2).unwrap().reliability.no_show_count, 1);
        assert!(state.persona(1).unwrap().reliability.score > rater_start);
        assert!(state.persona(1).unwrap().match_preferences.reliability_min_score.is_some());
    }

    #[test]
    fn each_processed_entry_bumps_both_profile_revisions_once() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.feedback_queue.push(entry("f1", 1, 2, 5, vec![], now));

        process_feedback_queue(&mut state, now, 50);

        assert_eq!(state.persona(1).unwrap().profile_revision, 1);
        assert_eq!(state.persona(2).unwrap().profile_revision, 1);
    }

    #[test]
    fn ghost_report_bumps_rater_revision_exactly_once() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.feedback_queue.push(entry(
            "f1",
            1,
            2,
            1,
            vec![FeedbackIssue {
                code: "ghost".to_string(),
                severity: 5,
                notes: None,
                red_flag: false,
            }],
            now,
        ));

        process_feedback_queue(&mut state, now, 50);

        assert_eq!(state.persona(1).unwrap().profile_revision, 1);
    }

    #[test]
    fn red_flag_issue_increments_raters_red_flag_rate() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let mut state = EngineState::default();
        state.personas.push(bare_persona(1, "nyc"));
        state.personas.push(bare_persona(2, "nyc"));
        state.feedback_queue.push(entry(
            "f1",
            1,
            2,
            1,
            vec![FeedbackIssue {
                code: "unsafe_behavior".to_string(),
                severity: 5,
                notes: None,
                red_flag: true,
            }],
            now,
        ));

        process_feedback_queue(&mut state, now, 50);

        assert_eq!(state.persona(1).unwrap().feedback_bias.red_flag_given_count, 1);
        assert!(state.persona(1).unwrap().feedback_bias.red_flag_frequency > 0.0);
    }
}
