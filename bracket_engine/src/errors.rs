//! Engine error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::bracket::MatchState;
use crate::models::{GroupId, MatchId, NodeId, ParticipantId, PipelineId, StageId};

/// Machine-readable error kind surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidState,
    AlreadyGenerated,
    Finalized,
    IncompleteNode,
    InvalidTransition,
    StageIncomplete,
    NotFound,
    InvalidInput,
    Forbidden,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::AlreadyGenerated => "already_generated",
            ErrorKind::Finalized => "finalized",
            ErrorKind::IncompleteNode => "incomplete_node",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::StageIncomplete => "stage_incomplete",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Storage => "storage",
        };
        write!(f, "{repr}")
    }
}

/// Reference to the entity an error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityRef {
    Stage { id: StageId },
    Node { stage: StageId, id: NodeId },
    Match { stage: StageId, id: MatchId },
    Group { stage: StageId, id: GroupId },
    Pipeline { id: PipelineId },
    Participant { id: ParticipantId },
}

impl EntityRef {
    pub fn stage(id: StageId) -> Self {
        Self::Stage { id }
    }

    pub fn pipeline(id: PipelineId) -> Self {
        Self::Pipeline { id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage { id } => write!(f, "stage {id}"),
            Self::Node { stage, id } => write!(f, "node {id} of stage {stage}"),
            Self::Match { stage, id } => write!(f, "match {id} of stage {stage}"),
            Self::Group { stage, id } => write!(f, "group {id} of stage {stage}"),
            Self::Pipeline { id } => write!(f, "pipeline {id}"),
            Self::Participant { id } => write!(f, "participant {id}"),
        }
    }
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity}: operation not allowed: {reason}")]
    InvalidState { entity: EntityRef, reason: String },

    #[error("{entity} has already been generated")]
    AlreadyGenerated { entity: EntityRef },

    #[error("{entity} is published; reset requires force")]
    Finalized { entity: EntityRef },

    #[error("{entity} does not have both participants yet")]
    IncompleteNode { entity: EntityRef },

    #[error("{entity}: illegal transition {from} -> {to}")]
    InvalidTransition {
        entity: EntityRef,
        from: MatchState,
        to: MatchState,
    },

    #[error("{entity} still has {open} unfinished matches")]
    StageIncomplete { entity: EntityRef, open: usize },

    #[error("{entity} not found")]
    NotFound { entity: EntityRef },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not allowed to {action}")]
    Forbidden { action: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid_state(entity: EntityRef, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            entity,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Kind of the failure, independent of the entity involved
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidState { .. } => ErrorKind::InvalidState,
            EngineError::AlreadyGenerated { .. } => ErrorKind::AlreadyGenerated,
            EngineError::Finalized { .. } => ErrorKind::Finalized,
            EngineError::IncompleteNode { .. } => ErrorKind::IncompleteNode,
            EngineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            EngineError::StageIncomplete { .. } => ErrorKind::StageIncomplete,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::Forbidden { .. } => ErrorKind::Forbidden,
            EngineError::Database(_) | EngineError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Entity the failure is about, when there is one
    pub fn entity(&self) -> Option<EntityRef> {
        match self {
            EngineError::InvalidState { entity, .. }
            | EngineError::AlreadyGenerated { entity }
            | EngineError::Finalized { entity }
            | EngineError::IncompleteNode { entity }
            | EngineError::InvalidTransition { entity, .. }
            | EngineError::StageIncomplete { entity, .. }
            | EngineError::NotFound { entity } => Some(*entity),
            _ => None,
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage errors are collapsed so SQL details never reach a client.
    pub fn client_message(&self) -> String {
        match self {
            EngineError::Database(_) | EngineError::Serialization(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_entity() {
        let err = EngineError::IncompleteNode {
            entity: EntityRef::Node { stage: 4, id: 9 },
        };
        assert_eq!(err.kind(), ErrorKind::IncompleteNode);
        assert_eq!(err.entity(), Some(EntityRef::Node { stage: 4, id: 9 }));
        assert_eq!(err.to_string(), "node 9 of stage 4 does not have both participants yet");
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = EngineError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.entity().is_none());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::StageIncomplete).unwrap();
        assert_eq!(json, "\"stage_incomplete\"");
    }
}
