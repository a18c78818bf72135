use async_trait::async_trait;

use crate::error::EngineError;
use crate::model::{MatchId, MeetingId, PersonaId};

/// Deterministic or random id generation, injected so ticks can be made
/// byte-for-byte reproducible in tests (P6).
pub trait IdFactory: Send + Sync {
    fn next_match_id(&self) -> MatchId;
    fn next_meeting_id(&self) -> MeetingId;
}

/// Resolves time/location for an auto-scheduled meeting. Called at most once
/// per created match; failures are non-fatal and leave `scheduled_meeting_id`
/// unset.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn resolve_meeting(
        &self,
        persona_a: PersonaId,
        persona_b: PersonaId,
        match_id: &MatchId,
    ) -> Result<ResolvedMeeting, EngineError>;
}

#[derive(Debug, Clone)]
pub struct ResolvedMeeting {
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub location: Option<String>,
}
