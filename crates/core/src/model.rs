//! Entities shared across the matching engine: personas, matches, the match
//! graph, feedback, and the aggregate engine state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PersonaId = i64;
pub type MatchId = String;
pub type FeedbackId = String;
pub type MeetingId = String;

/// A matching context. Each domain carries its own eligibility and scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    General,
    Business,
    Dating,
    Friendship,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::General => "general",
            Domain::Business => "business",
            Domain::Dating => "dating",
            Domain::Friendship => "friendship",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Some(Domain::General),
            "business" => Some(Domain::Business),
            "dating" => Some(Domain::Dating),
            "friendship" => Some(Domain::Friendship),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaStatus {
    Active,
    Paused,
    Blocked,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralProfile {
    pub name: String,
    pub age: u32,
    pub gender_identity: String,
    pub pronouns: String,
    pub location: Location,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub bio: String,
}

/// A single weekly availability window, e.g. Monday 18:00-21:00 local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u8,
    pub start_minute: u16,
    pub end_minute: u16,
}

/// A one-off exception (vacation, blackout date) overriding the weekly pattern
/// for the week containing `date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub date: chrono::NaiveDate,
    pub available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub windows: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub exceptions: Vec<AvailabilityException>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub sentiment_score: f64,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
    #[serde(default)]
    pub issue_tags: HashSet<String>,
    #[serde(default)]
    pub red_flag_tags: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub meeting_cadence: Option<String>,
    #[serde(default)]
    pub connection_goals: Vec<String>,
    #[serde(default)]
    pub feedback_summary: FeedbackSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatingPreferences {
    #[serde(default)]
    pub preferred_genders: HashSet<String>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub dealbreaker_keywords: Vec<String>,
    #[serde(default)]
    pub preferred_builds: HashSet<String>,
    #[serde(default)]
    pub attractiveness_importance: u8,
    #[serde(default)]
    pub relationship_goal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttractionProfile {
    pub attractiveness: u8,
    #[serde(default)]
    pub build: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatingProfile {
    #[serde(default)]
    pub preferences: Option<DatingPreferences>,
    #[serde(default)]
    pub attraction: AttractionProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessProfile {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub seeking_roles: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub commitment: Option<String>,
    #[serde(default)]
    pub company_stage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendshipProfile {
    #[serde(default)]
    pub vibe: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainProfiles {
    #[serde(default)]
    pub dating: Option<DatingProfile>,
    #[serde(default)]
    pub business: Option<BusinessProfile>,
    #[serde(default)]
    pub friendship: Option<FriendshipProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchPreferences {
    #[serde(default)]
    pub blocked_persona_ids: HashSet<PersonaId>,
    #[serde(default)]
    pub excluded_persona_ids: HashSet<PersonaId>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub gender_constraint: Option<String>,
    #[serde(default)]
    pub body_constraint: Option<HashSet<String>>,
    #[serde(default)]
    pub reliability_min_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityEventType {
    Attended,
    OnTime,
    LateCancel,
    NoShow,
    Ghost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityEvent {
    pub event_type: ReliabilityEventType,
    pub impact: f64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reliability {
    pub score: f64,
    pub attended_count: u32,
    pub late_cancel_count: u32,
    pub no_show_count: u32,
    pub ghost_count: u32,
    pub ghosted_by_others_count: u32,
    #[serde(default)]
    pub history: Vec<ReliabilityEvent>,
}

impl Reliability {
    pub fn with_default_score() -> Self {
        Self {
            score: 0.75,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackBias {
    pub harshness_score: f64,
    pub positivity_bias: f64,
    pub red_flag_frequency: f64,
    pub ratings_given_count: u32,
    pub ratings_given_sum: f64,
    pub negative_given_count: u32,
    pub red_flag_given_count: u32,
}

impl FeedbackBias {
    pub fn neutral() -> Self {
        Self {
            harshness_score: 0.5,
            positivity_bias: 0.5,
            red_flag_frequency: 0.0,
            ..Default::default()
        }
    }

    pub fn average_rating(&self) -> f64 {
        if self.ratings_given_count == 0 {
            3.0
        } else {
            self.ratings_given_sum / self.ratings_given_count as f64
        }
    }

    pub fn negative_rate(&self) -> f64 {
        if self.ratings_given_count == 0 {
            0.0
        } else {
            self.negative_given_count as f64 / self.ratings_given_count as f64
        }
    }

    pub fn red_flag_rate(&self) -> f64 {
        if self.ratings_given_count == 0 {
            0.0
        } else {
            self.red_flag_given_count as f64 / self.ratings_given_count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactStatus {
    Active,
    Superseded,
    Retracted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub status: FactStatus,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub status: PersonaStatus,
    pub domains: HashSet<Domain>,
    pub general: GeneralProfile,
    pub profile: PersonaProfile,
    #[serde(default)]
    pub domain_profiles: DomainProfiles,
    #[serde(default)]
    pub match_preferences: MatchPreferences,
    #[serde(default = "Reliability::with_default_score")]
    pub reliability: Reliability,
    #[serde(default = "FeedbackBias::neutral")]
    pub feedback_bias: FeedbackBias,
    #[serde(default)]
    pub facts: Vec<Fact>,
    pub profile_revision: u64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub priority_boost: Option<u8>,
    #[serde(default)]
    pub red_flag_tags: HashSet<String>,
}

impl Persona {
    /// Bumps the revision counter and timestamp. Call exactly once per logical mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.profile_revision += 1;
        self.last_updated = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Proposed,
    Accepted,
    Scheduled,
    Completed,
    Canceled,
    Expired,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assessment {
    pub score: f64,
    #[serde(default)]
    pub small_pass_score: Option<f64>,
    #[serde(default)]
    pub large_pass_score: Option<f64>,
    #[serde(default)]
    pub positive_reasons: Vec<String>,
    #[serde(default)]
    pub negative_reasons: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub domain: Domain,
    pub persona_a: PersonaId,
    pub persona_b: PersonaId,
    pub created_at: DateTime<Utc>,
    pub status: MatchStatus,
    pub assessment: Assessment,
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub scheduled_meeting_id: Option<MeetingId>,
}

impl MatchRecord {
    pub fn involves(&self, persona_id: PersonaId) -> bool {
        self.persona_a == persona_id || self.persona_b == persona_id
    }

    pub fn other(&self, persona_id: PersonaId) -> Option<PersonaId> {
        if self.persona_a == persona_id {
            Some(self.persona_b)
        } else if self.persona_b == persona_id {
            Some(self.persona_a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Match,
    FeedbackPositive,
    FeedbackNegative,
    Met,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: PersonaId,
    pub to: PersonaId,
    pub weight: f64,
    pub edge_type: EdgeType,
    pub created_at: DateTime<Utc>,
}

/// Undirected weighted multigraph of personas. Every `MatchRecord` produces
/// exactly one edge of type `Match`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchGraph {
    pub edges: Vec<GraphEdge>,
}

impl MatchGraph {
    pub fn push(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
    }

    pub fn match_edge_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Match)
            .count()
    }

    /// BFS distance from `origin` to every reachable persona, treating edges as
    /// undirected and ignoring edge type. Capped at `max_hops`.
    pub fn bfs_distances(&self, origin: PersonaId, max_hops: usize) -> HashMap<PersonaId, usize> {
        let mut adjacency: HashMap<PersonaId, Vec<PersonaId>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.from).or_default().push(edge.to);
            adjacency.entry(edge.to).or_default().push(edge.from);
        }

        let mut distances = HashMap::new();
        distances.insert(origin, 0usize);
        let mut frontier = vec![origin];
        let mut hop = 0usize;
        while hop < max_hops && !frontier.is_empty() {
            hop += 1;
            let mut next = Vec::new();
            for node in frontier {
                if let Some(neighbors) = adjacency.get(&node) {
                    for &neighbor in neighbors {
                        if !distances.contains_key(&neighbor) {
                            distances.insert(neighbor, hop);
                            next.push(neighbor);
                        }
                    }
                }
            }
            frontier = next;
        }
        distances
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    Meeting,
    GroupEvent,
    Conversation,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackIssue {
    pub code: String,
    pub severity: u8,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub red_flag: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: FeedbackId,
    pub from_persona_id: PersonaId,
    pub to_persona_id: PersonaId,
    #[serde(default)]
    pub meeting_id: Option<MeetingId>,
    pub rating: u8,
    pub sentiment: FeedbackSentiment,
    #[serde(default)]
    pub issues: Vec<FeedbackIssue>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    pub source: FeedbackSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Scheduled,
    Confirmed,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub meeting_id: MeetingId,
    pub match_id: MatchId,
    pub status: MeetingStatus,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Aggregate engine state. Matches, feedback, and graph edges are append-only
/// within a tick; persona mutation bumps `profile_revision`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub personas: Vec<Persona>,
    pub matches: Vec<MatchRecord>,
    pub meetings: Vec<Meeting>,
    pub feedback_queue: Vec<FeedbackEntry>,
    pub match_graph: MatchGraph,
}

impl EngineState {
    pub fn persona(&self, id: PersonaId) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn persona_mut(&mut self, id: PersonaId) -> Option<&mut Persona> {
        self.personas.iter_mut().find(|p| p.id == id)
    }

    pub fn active_persona_ids_sorted(&self) -> Vec<PersonaId> {
        let mut ids: Vec<PersonaId> = self
            .personas
            .iter()
            .filter(|p| p.status == PersonaStatus::Active)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Minimal persona builders shared by test suites across crates.
pub mod fixtures {
    use super::*;

    pub fn bare_persona(id: PersonaId, city: &str) -> Persona {
        Persona {
            id,
            status: PersonaStatus::Active,
            domains: HashSet::from([Domain::General]),
            general: GeneralProfile {
                name: format!("persona-{id}"),
                age: 30,
                gender_identity: "unspecified".to_string(),
                pronouns: "they/them".to_string(),
                location: Location {
                    city: city.to_string(),
                    country: "country".to_string(),
                    time_zone: "UTC".to_string(),
                    geo: None,
                },
                values: Vec::new(),
                bio: String::new(),
            },
            profile: PersonaProfile {
                availability: None,
                interests: Vec::new(),
                meeting_cadence: None,
                connection_goals: Vec::new(),
                feedback_summary: FeedbackSummary::default(),
            },
            domain_profiles: DomainProfiles::default(),
            match_preferences: MatchPreferences::default(),
            reliability: Reliability::with_default_score(),
            feedback_bias: FeedbackBias::neutral(),
            facts: Vec::new(),
            profile_revision: 0,
            last_updated: Utc::now(),
            priority_boost: None,
            red_flag_tags: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::bare_persona;
    use super::*;

    #[test]
    fn bfs_distances_respects_max_hops() {
        let mut graph = MatchGraph::default();
        graph.push(GraphEdge {
            from: 1,
            to: 2,
            weight: 1.0,
            edge_type: EdgeType::Match,
            created_at: Utc::now(),
        });
        graph.push(GraphEdge {
            from: 2,
            to: 3,
            weight: 1.0,
            edge_type: EdgeType::FeedbackPositive,
            created_at: Utc::now(),
        });

        let distances = graph.bfs_distances(1, 2);
        assert_eq!(distances.get(&1), Some(&0));
        assert_eq!(distances.get(&2), Some(&1));
        assert_eq!(distances.get(&3), Some(&2));

        let capped = graph.bfs_distances(1, 1);
        assert_eq!(capped.get(&3), None);
    }

    #[test]
    fn match_record_involves_and_other() {
        let record = MatchRecord {
            match_id: "m1".to_string(),
            domain: Domain::General,
            persona_a: 1,
            persona_b: 2,
            created_at: Utc::now(),
            status: MatchStatus::Proposed,
            assessment: Assessment::default(),
            reasoning: Vec::new(),
            scheduled_meeting_id: None,
        };
        assert!(record.involves(1));
        assert!(record.involves(2));
        assert!(!record.involves(3));
        assert_eq!(record.other(1), Some(2));
        assert_eq!(record.other(3), None);
    }

    #[test]
    fn active_persona_ids_sorted_filters_and_sorts() {
        let mut state = EngineState::default();
        let mut paused = bare_persona(5, "city");
        paused.status = PersonaStatus::Paused;
        state.personas.push(paused);
        state.personas.push(bare_persona(3, "city"));
        state.personas.push(bare_persona(1, "city"));

        assert_eq!(state.active_persona_ids_sorted(), vec![1, 3]);
    }
}
