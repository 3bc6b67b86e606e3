//! Read-only projections of stages and pipelines for rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::StageState;
use crate::bracket::{Bracket, BracketNode, BracketSide, Match, MatchSlot, MatchState};
use crate::groups::Standing;
use crate::models::{GroupId, MatchId, NodeId, ParticipantId, PipelineId, StageId};
use crate::pipeline::{AdvancementRule, Pipeline, PipelineStatus};

/// Participant id with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: ParticipantId,
    pub display_name: String,
}

impl ParticipantRef {
    fn lookup(stage: &StageState, id: ParticipantId) -> Self {
        Self {
            id,
            display_name: stage
                .display_name(id)
                .map_or_else(|| format!("#{id}"), str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub id: MatchId,
    pub state: MatchState,
    pub participant1_score: Option<u32>,
    pub participant2_score: Option<u32>,
    pub winner_id: Option<ParticipantId>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl From<&Match> for MatchView {
    fn from(m: &Match) -> Self {
        Self {
            id: m.id,
            state: m.state,
            participant1_score: m.participant1_score,
            participant2_score: m.participant2_score,
            winner_id: m.winner_id,
            scheduled_time: m.scheduled_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub bracket_side: BracketSide,
    pub round_number: u32,
    pub position_in_round: u32,
    pub participant1: Option<ParticipantRef>,
    pub participant2: Option<ParticipantRef>,
    pub winner_id: Option<ParticipantId>,
    pub is_bye: bool,
    pub is_void: bool,
    #[serde(rename = "match")]
    pub match_view: Option<MatchView>,
}

/// `GET bracket(stage_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub exists: bool,
    pub bracket: Option<Bracket>,
    pub champion: Option<ParticipantRef>,
    pub nodes: Vec<NodeView>,
}

impl BracketView {
    pub fn from_stage(stage: &StageState) -> Self {
        let Some(state) = stage.bracket.as_ref() else {
            return Self {
                exists: false,
                bracket: None,
                champion: None,
                nodes: Vec::new(),
            };
        };

        let slot = |id: Option<ParticipantId>| id.map(|id| ParticipantRef::lookup(stage, id));
        let nodes = state
            .nodes
            .iter()
            .map(|node: &BracketNode| NodeView {
                id: node.id,
                bracket_side: node.bracket_side,
                round_number: node.round_number,
                position_in_round: node.position_in_round,
                participant1: slot(node.participant1_id),
                participant2: slot(node.participant2_id),
                winner_id: node.winner_id,
                is_bye: node.is_bye,
                is_void: node.is_void,
                match_view: node
                    .match_id
                    .and_then(|id| state.match_by_id(id))
                    .map(MatchView::from),
            })
            .collect();

        Self {
            exists: true,
            bracket: Some(state.bracket.clone()),
            champion: slot(state.champion()),
            nodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingView {
    pub participant: ParticipantRef,
    #[serde(flatten)]
    pub standing: Standing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMatchView {
    pub round: u32,
    pub participant1: ParticipantRef,
    pub participant2: ParticipantRef,
    #[serde(flatten)]
    pub result: MatchView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: GroupId,
    pub name: String,
    pub standings: Vec<StandingView>,
    pub matches: Vec<GroupMatchView>,
}

/// `GET groups(stage_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsView {
    pub exists: bool,
    pub groups: Vec<GroupView>,
}

impl GroupsView {
    pub fn from_stage(stage: &StageState) -> Self {
        let Some(state) = stage.bracket.as_ref().filter(|state| !state.groups.is_empty()) else {
            return Self {
                exists: false,
                groups: Vec::new(),
            };
        };

        let groups = state
            .groups
            .iter()
            .map(|group| GroupView {
                id: group.id,
                name: group.name.clone(),
                standings: group
                    .standings
                    .iter()
                    .map(|standing| StandingView {
                        participant: ParticipantRef::lookup(stage, standing.participant_id),
                        standing: standing.clone(),
                    })
                    .collect(),
                matches: state
                    .matches
                    .iter()
                    .filter_map(|m| match m.slot {
                        MatchSlot::Group { group_id, round } if group_id == group.id => {
                            Some(GroupMatchView {
                                round,
                                participant1: ParticipantRef::lookup(stage, m.participant1_id),
                                participant2: ParticipantRef::lookup(stage, m.participant2_id),
                                result: MatchView::from(m),
                            })
                        }
                        _ => None,
                    })
                    .collect(),
            })
            .collect();

        Self {
            exists: true,
            groups,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStageView {
    pub stage_id: StageId,
    pub name: Option<String>,
    pub advancement_rule: AdvancementRule,
    pub auto_generate: bool,
    pub advanced: bool,
    pub generated: bool,
    pub complete: bool,
}

/// One entry of `GET pipelines(tournament_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineView {
    pub id: PipelineId,
    pub name: String,
    pub status: PipelineStatus,
    pub stages: Vec<PipelineStageView>,
}

impl PipelineView {
    /// Combine a pipeline with snapshots of its stages (`None` if a stage is gone)
    pub fn build(pipeline: &Pipeline, stages: &[Option<StageState>]) -> Self {
        let stages = pipeline
            .stages
            .iter()
            .zip(stages.iter())
            .map(|(entry, stage)| PipelineStageView {
                stage_id: entry.stage_id,
                name: stage.as_ref().map(|s| s.config.name.clone()),
                advancement_rule: entry.advancement_rule,
                auto_generate: entry.auto_generate,
                advanced: entry.advanced,
                generated: stage.as_ref().is_some_and(StageState::is_generated),
                complete: stage.as_ref().is_some_and(StageState::is_complete),
            })
            .collect();

        Self {
            id: pipeline.id,
            name: pipeline.name.clone(),
            status: pipeline.status,
            stages,
        }
    }
}
