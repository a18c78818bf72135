//! Core types and traits for the matching engine: the persona/match/feedback
//! data model, the tick contract, and the trait seams (domain rules, LLM
//! provider, location provider, id factory) that the engine and its host
//! plug into.

pub mod error;
pub mod model;
pub mod options;
pub mod traits;

pub use error::EngineError;
pub use model::{
    Assessment, AttractionProfile, Availability, AvailabilityException, AvailabilityWindow,
    BusinessProfile, DatingPreferences, DatingProfile, Domain, DomainProfiles, EdgeType,
    EngineState, Fact, FactStatus, FeedbackBias, FeedbackEntry, FeedbackId, FeedbackIssue,
    FeedbackSentiment, FeedbackSource, FeedbackSummary, FriendshipProfile, GeneralProfile,
    GraphEdge, Location, MatchGraph, MatchId, MatchPreferences, MatchRecord, MatchStatus, Meeting,
    MeetingId, MeetingStatus, Persona, PersonaId, PersonaProfile, PersonaStatus, Reliability,
    ReliabilityEvent, ReliabilityEventType,
};
pub use options::{EngineDependencies, EngineOptions, EngineRunResult, SweepTargets};
pub use traits::{
    ConfigDomainRules, DomainRules, DomainRulesConfig, EligibilityConfig, IdFactory,
    LargePassInput, LargePassOutput, LocationProvider, MatchingLlmProvider, ResolvedMeeting,
    SmallPassInput, SmallPassOutput,
};
