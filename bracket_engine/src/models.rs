//! Identifiers and shared records used across the engine.

use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Stage ID type. A stage owns at most one bracket, so the bracket shares its id.
pub type StageId = i64;

/// Pipeline ID type
pub type PipelineId = i64;

/// Participant (team or player) ID, owned by the registration subsystem
pub type ParticipantId = i64;

/// Index of a node inside its bracket's node arena
pub type NodeId = u32;

/// Index of a match inside its bracket
pub type MatchId = u32;

/// Index of a group inside its bracket
pub type GroupId = u32;

/// Who is invoking a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "participant_id", rename_all = "snake_case")]
pub enum Actor {
    /// A competitor acting on their own matches
    Participant(ParticipantId),
    /// Tournament operator running the lifecycle
    Operator,
    /// Operator with override rights (force reset, dispute resolution)
    Admin,
}

impl Actor {
    /// Operators and admins may run lifecycle actions
    pub fn is_operator(&self) -> bool {
        matches!(self, Actor::Operator | Actor::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }

    pub fn participant_id(&self) -> Option<ParticipantId> {
        match self {
            Actor::Participant(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_roles() {
        assert!(Actor::Admin.is_operator());
        assert!(Actor::Admin.is_admin());
        assert!(Actor::Operator.is_operator());
        assert!(!Actor::Operator.is_admin());
        assert!(!Actor::Participant(7).is_operator());
        assert_eq!(Actor::Participant(7).participant_id(), Some(7));
    }

    #[test]
    fn test_actor_serde() {
        let json = serde_json::to_string(&Actor::Participant(3)).unwrap();
        assert_eq!(json, r#"{"role":"participant","participant_id":3}"#);
        let admin: Actor = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(admin, Actor::Admin);
    }
}
