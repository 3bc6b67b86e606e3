//! Group, standing and group configuration records.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::models::{GroupId, ParticipantId, StageId};

/// Points awarded per result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointScheme {
    pub win: i32,
    pub draw: i32,
    pub loss: i32,
}

impl Default for PointScheme {
    fn default() -> Self {
        Self {
            win: 3,
            draw: 1,
            loss: 0,
        }
    }
}

impl PointScheme {
    /// Most points a single match can still yield
    pub fn best(&self) -> i32 {
        self.win.max(self.draw).max(self.loss)
    }
}

/// Round robin configuration of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub group_count: u32,
    /// Participants per group that advance
    pub advancement_count: u32,
    /// 1 for single round robin, 2 for double
    pub legs: u32,
    pub points: PointScheme,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            group_count: 1,
            advancement_count: 2,
            legs: 1,
            points: PointScheme::default(),
        }
    }
}

impl GroupConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.group_count == 0 {
            return Err(EngineError::invalid_input("group_count must be at least 1"));
        }
        if !(1..=2).contains(&self.legs) {
            return Err(EngineError::invalid_input(format!(
                "legs must be 1 or 2, got {}",
                self.legs
            )));
        }
        Ok(())
    }
}

/// Round robin group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub bracket_id: Option<StageId>,
    pub name: String,
    pub member_ids: Vec<ParticipantId>,
    /// Derived; recomputed wholesale after every result in the group
    pub standings: Vec<Standing>,
}

impl Group {
    pub(crate) fn new(
        id: GroupId,
        bracket_id: Option<StageId>,
        name: String,
        member_ids: Vec<ParticipantId>,
    ) -> Self {
        Self {
            id,
            bracket_id,
            name,
            member_ids,
            standings: Vec::new(),
        }
    }
}

/// A participant's row in a group table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub group_id: GroupId,
    pub participant_id: ParticipantId,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub score_for: u32,
    pub score_against: u32,
    pub points: i32,
    /// 1-indexed, unique within the group
    pub rank: u32,
    pub is_advancing: bool,
    pub is_eliminated: bool,
}

impl Standing {
    pub(crate) fn empty(group_id: GroupId, participant_id: ParticipantId) -> Self {
        Self {
            group_id,
            participant_id,
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            score_for: 0,
            score_against: 0,
            points: 0,
            rank: 0,
            is_advancing: false,
            is_eliminated: false,
        }
    }

    pub fn score_differential(&self) -> i64 {
        i64::from(self.score_for) - i64::from(self.score_against)
    }
}
