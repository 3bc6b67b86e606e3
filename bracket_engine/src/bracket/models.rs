//! Bracket, node and match records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::groups::{Group, GroupConfig};
use crate::models::{Actor, GroupId, MatchId, NodeId, ParticipantId, StageId};

/// Competition format of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketFormat {
    #[serde(rename = "single_elim")]
    SingleElimination,
    #[serde(rename = "double_elim")]
    DoubleElimination,
    #[serde(rename = "round_robin")]
    RoundRobin,
}

impl BracketFormat {
    pub fn is_elimination(&self) -> bool {
        !matches!(self, BracketFormat::RoundRobin)
    }
}

impl fmt::Display for BracketFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketFormat::SingleElimination => write!(f, "single_elim"),
            BracketFormat::DoubleElimination => write!(f, "double_elim"),
            BracketFormat::RoundRobin => write!(f, "round_robin"),
        }
    }
}

/// Where the seed order used at generation comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedingMethod {
    /// Order saved in the seed registry
    #[default]
    Manual,
    /// Seed numbers supplied by the registration subsystem
    Registration,
    /// Shuffled at generation
    Random,
}

/// Which tree a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketSide {
    #[serde(rename = "winners")]
    Winners,
    #[serde(rename = "losers")]
    Losers,
    /// Grand final (and its lazily created reset) sits outside both trees
    #[serde(rename = "none")]
    GrandFinal,
}

/// Where a node slot gets its participant from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum SlotSource {
    /// Placed at generation; `None` is an empty bye slot
    Seed(Option<ParticipantId>),
    WinnerOf(NodeId),
    LoserOf(NodeId),
}

/// Bracket record, one per stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: StageId,
    pub format: BracketFormat,
    pub seeding_method: SeedingMethod,
    pub total_rounds: u32,
    pub total_matches: u32,
    pub is_finalized: bool,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// A match slot position in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketNode {
    pub id: NodeId,
    pub bracket_id: StageId,
    pub bracket_side: BracketSide,
    /// 1-indexed
    pub round_number: u32,
    /// 0-indexed
    pub position_in_round: u32,
    pub participant1_id: Option<ParticipantId>,
    pub participant2_id: Option<ParticipantId>,
    pub winner_id: Option<ParticipantId>,
    pub is_bye: bool,
    /// Set when the node's match was cancelled and no outcome assigned yet
    pub is_void: bool,
    pub match_id: Option<MatchId>,
    pub sources: [SlotSource; 2],
}

impl BracketNode {
    pub(crate) fn new(
        id: NodeId,
        bracket_id: StageId,
        side: BracketSide,
        round_number: u32,
        position_in_round: u32,
        sources: [SlotSource; 2],
    ) -> Self {
        Self {
            id,
            bracket_id,
            bracket_side: side,
            round_number,
            position_in_round,
            participant1_id: None,
            participant2_id: None,
            winner_id: None,
            is_bye: false,
            is_void: false,
            match_id: None,
            sources,
        }
    }

    pub fn participants(&self) -> [Option<ParticipantId>; 2] {
        [self.participant1_id, self.participant2_id]
    }

    pub fn has_participant(&self, participant_id: ParticipantId) -> bool {
        self.participant1_id == Some(participant_id) || self.participant2_id == Some(participant_id)
    }

    /// Both slots populated
    pub fn is_complete(&self) -> bool {
        self.participant1_id.is_some() && self.participant2_id.is_some()
    }

    /// Winner decided, or resolved as a bye (possibly with nobody in it)
    pub fn is_decided(&self) -> bool {
        self.winner_id.is_some() || self.is_bye
    }

    /// The participant who lost this node, once decided by a real match
    pub fn loser_id(&self) -> Option<ParticipantId> {
        let winner = self.winner_id?;
        if self.is_bye {
            return None;
        }
        if self.participant1_id == Some(winner) {
            self.participant2_id
        } else {
            self.participant1_id
        }
    }
}

/// Match state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Scheduled,
    Live,
    PendingResult,
    Completed,
    Disputed,
    Forfeit,
    Cancelled,
}

impl MatchState {
    /// No further play is expected for the match
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            MatchState::Completed | MatchState::Forfeit | MatchState::Cancelled
        )
    }

    /// Result counts toward standings and propagation
    pub fn has_result(&self) -> bool {
        matches!(self, MatchState::Completed | MatchState::Forfeit)
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            MatchState::Scheduled => "scheduled",
            MatchState::Live => "live",
            MatchState::PendingResult => "pending_result",
            MatchState::Completed => "completed",
            MatchState::Disputed => "disputed",
            MatchState::Forfeit => "forfeit",
            MatchState::Cancelled => "cancelled",
        };
        write!(f, "{repr}")
    }
}

/// What a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchSlot {
    Node { node_id: NodeId },
    Group { group_id: GroupId, round: u32 },
}

/// Scores and winner submitted for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReport {
    pub participant1_score: u32,
    pub participant2_score: u32,
    /// Claimed winner; derived from the scores when omitted
    pub winner_id: Option<ParticipantId>,
}

impl ResultReport {
    pub fn new(participant1_score: u32, participant2_score: u32) -> Self {
        Self {
            participant1_score,
            participant2_score,
            winner_id: None,
        }
    }

    pub fn with_winner(mut self, winner_id: ParticipantId) -> Self {
        self.winner_id = Some(winner_id);
        self
    }
}

/// A reported but unconfirmed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultClaim {
    pub reported_by: Actor,
    pub report: ResultReport,
    pub reported_at: DateTime<Utc>,
}

/// Match record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub slot: MatchSlot,
    pub participant1_id: ParticipantId,
    pub participant2_id: ParticipantId,
    pub participant1_score: Option<u32>,
    pub participant2_score: Option<u32>,
    pub winner_id: Option<ParticipantId>,
    pub state: MatchState,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub claim: Option<ResultClaim>,
    pub forfeited_by: Option<ParticipantId>,
    pub dispute_reason: Option<String>,
}

impl Match {
    pub(crate) fn new(
        id: MatchId,
        slot: MatchSlot,
        participant1_id: ParticipantId,
        participant2_id: ParticipantId,
    ) -> Self {
        Self {
            id,
            slot,
            participant1_id,
            participant2_id,
            participant1_score: None,
            participant2_score: None,
            winner_id: None,
            state: MatchState::Scheduled,
            scheduled_time: None,
            started_at: None,
            completed_at: None,
            claim: None,
            forfeited_by: None,
            dispute_reason: None,
        }
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self.slot {
            MatchSlot::Node { node_id } => Some(node_id),
            MatchSlot::Group { .. } => None,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match self.slot {
            MatchSlot::Group { group_id, .. } => Some(group_id),
            MatchSlot::Node { .. } => None,
        }
    }

    pub fn has_participant(&self, participant_id: ParticipantId) -> bool {
        self.participant1_id == participant_id || self.participant2_id == participant_id
    }

    pub fn opponent_of(&self, participant_id: ParticipantId) -> Option<ParticipantId> {
        if self.participant1_id == participant_id {
            Some(self.participant2_id)
        } else if self.participant2_id == participant_id {
            Some(self.participant1_id)
        } else {
            None
        }
    }

    /// Score for and against the given participant, if scores are recorded
    pub fn scores_for(&self, participant_id: ParticipantId) -> Option<(u32, u32)> {
        let (s1, s2) = (self.participant1_score?, self.participant2_score?);
        if self.participant1_id == participant_id {
            Some((s1, s2))
        } else if self.participant2_id == participant_id {
            Some((s2, s1))
        } else {
            None
        }
    }
}

/// Everything "generate" creates for a stage; "reset" discards it as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketState {
    pub bracket: Bracket,
    pub nodes: Vec<BracketNode>,
    pub matches: Vec<Match>,
    pub groups: Vec<Group>,
    pub group_config: Option<GroupConfig>,
    /// Seed order the bracket was generated from
    pub seed_order: Vec<ParticipantId>,
}

impl BracketState {
    pub fn stage_id(&self) -> StageId {
        self.bracket.id
    }

    /// Seed number per participant, as used at generation
    pub fn seed_numbers(&self) -> HashMap<ParticipantId, u32> {
        self.seed_order
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx as u32 + 1))
            .collect()
    }

    pub fn node(&self, node_id: NodeId) -> Option<&BracketNode> {
        self.nodes.get(node_id as usize)
    }

    pub fn match_by_id(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.get(match_id as usize)
    }

    /// Look a node up by its tree coordinates
    pub fn node_at(&self, side: BracketSide, round: u32, position: u32) -> Option<&BracketNode> {
        self.nodes.iter().find(|node| {
            node.bracket_side == side
                && node.round_number == round
                && node.position_in_round == position
        })
    }

    /// Number of rounds in the winners tree
    pub fn winners_rounds(&self) -> u32 {
        self.nodes
            .iter()
            .filter(|node| node.bracket_side == BracketSide::Winners)
            .map(|node| node.round_number)
            .max()
            .unwrap_or(0)
    }

    /// Matches that still need play or a decision
    pub fn open_matches(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| !m.state.is_settled())
            .count()
    }

    /// Void nodes still waiting for an assigned outcome
    pub fn void_nodes(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.is_void && node.winner_id.is_none())
            .count()
    }

    /// Open matches plus void nodes; zero once the stage can be advanced
    pub fn unfinished(&self) -> usize {
        self.open_matches() + self.void_nodes()
    }
}
