//! Winner and loser propagation through the node arena.
//!
//! Slot sources always point at lower node ids, so one pass in id order
//! settles every node whose feeders are decided. Every decision runs that
//! pass, which is how bye cascades and grand-final resets complete inside the
//! action that triggered them.

use chrono::{DateTime, Utc};

use crate::bracket::{
    BracketFormat, BracketNode, BracketSide, BracketState, Match, MatchSlot, SlotSource,
};
use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::models::{MatchId, NodeId, ParticipantId};

/// Settled value of a slot source: `Some(None)` is a settled empty slot
fn source_value(nodes: &[BracketNode], source: SlotSource) -> Option<Option<ParticipantId>> {
    match source {
        SlotSource::Seed(participant) => Some(participant),
        SlotSource::WinnerOf(id) => {
            let feeder = nodes.get(id as usize)?;
            feeder.is_decided().then_some(feeder.winner_id)
        }
        SlotSource::LoserOf(id) => {
            let feeder = nodes.get(id as usize)?;
            if feeder.is_bye {
                Some(None)
            } else if feeder.winner_id.is_some() {
                Some(feeder.loser_id())
            } else {
                None
            }
        }
    }
}

/// Copy settled feeders into every node and resolve the ones now full
///
/// A node with two participants gets a scheduled match, one participant is a
/// bye won immediately, none is an empty bye.
pub(crate) fn settle_all(state: &mut BracketState, now: DateTime<Utc>) {
    let stage_id = state.stage_id();

    for idx in 0..state.nodes.len() {
        let node = &state.nodes[idx];
        if node.is_decided() || node.match_id.is_some() || node.is_void {
            continue;
        }

        let values = [
            source_value(&state.nodes, node.sources[0]),
            source_value(&state.nodes, node.sources[1]),
        ];

        let node = &mut state.nodes[idx];
        if let Some(participant) = values[0] {
            node.participant1_id = participant;
        }
        if let Some(participant) = values[1] {
            node.participant2_id = participant;
        }

        let [Some(first), Some(second)] = values else {
            continue;
        };

        match (first, second) {
            (Some(p1), Some(p2)) => {
                let match_id = state.matches.len() as MatchId;
                let mut scheduled =
                    Match::new(match_id, MatchSlot::Node { node_id: node.id }, p1, p2);
                scheduled.scheduled_time = Some(now);
                node.match_id = Some(match_id);
                state.matches.push(scheduled);
                log::debug!(
                    "Stage {}: node {} ready, match {} scheduled ({} vs {})",
                    stage_id,
                    idx,
                    match_id,
                    p1,
                    p2
                );
            }
            (Some(only), None) | (None, Some(only)) => {
                node.is_bye = true;
                node.winner_id = Some(only);
                log::debug!("Stage {}: node {} is a bye for {}", stage_id, idx, only);
            }
            (None, None) => {
                node.is_bye = true;
            }
        }
    }
}

/// Set the winner of a node and propagate
///
/// Returns `false` when the same winner was already recorded.
pub(crate) fn decide_node(
    state: &mut BracketState,
    node_id: NodeId,
    winner: ParticipantId,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    let stage_id = state.stage_id();
    let entity = EntityRef::Node {
        stage: stage_id,
        id: node_id,
    };
    let node = state
        .nodes
        .get_mut(node_id as usize)
        .ok_or(EngineError::NotFound { entity })?;

    if let Some(existing) = node.winner_id {
        if existing == winner {
            log::debug!("Stage {}: node {} already won by {}", stage_id, node_id, winner);
            return Ok(false);
        }
        return Err(EngineError::invalid_state(
            entity,
            format!("winner {existing} already decided"),
        ));
    }
    if !node.has_participant(winner) {
        return Err(EngineError::invalid_input(format!(
            "participant {winner} is not in node {node_id}"
        )));
    }

    node.winner_id = Some(winner);
    node.is_void = false;
    let losers_champion_won = node.bracket_side == BracketSide::GrandFinal
        && node.round_number == 1
        && node.participant2_id == Some(winner);

    log::debug!("Stage {}: node {} won by {}", stage_id, node_id, winner);

    if losers_champion_won && state.bracket.format == BracketFormat::DoubleElimination {
        create_reset_final(state, node_id);
    }

    settle_all(state, now);
    Ok(true)
}

/// Add the second grand final once the losers champion takes the first
fn create_reset_final(state: &mut BracketState, grand_final: NodeId) {
    let exists = state
        .nodes
        .iter()
        .any(|node| node.bracket_side == BracketSide::GrandFinal && node.round_number == 2);
    if exists {
        return;
    }

    let id = state.nodes.len() as NodeId;
    state.nodes.push(BracketNode::new(
        id,
        state.stage_id(),
        BracketSide::GrandFinal,
        2,
        0,
        [SlotSource::LoserOf(grand_final), SlotSource::WinnerOf(grand_final)],
    ));
    state.bracket.total_matches += 1;
    state.bracket.total_rounds += 1;

    log::info!(
        "Stage {}: losers champion won the grand final, reset match created",
        state.stage_id()
    );
}

/// Number of nodes that will need a real match, given the seeded slots
pub(crate) fn structural_match_count(nodes: &[BracketNode]) -> u32 {
    // Per node: whether each slot can ever hold a participant
    let mut potential: Vec<[bool; 2]> = Vec::with_capacity(nodes.len());

    let slot_potential = |potential: &[[bool; 2]], source: SlotSource| match source {
        SlotSource::Seed(participant) => participant.is_some(),
        SlotSource::WinnerOf(id) => potential
            .get(id as usize)
            .is_some_and(|slots| slots[0] || slots[1]),
        SlotSource::LoserOf(id) => potential
            .get(id as usize)
            .is_some_and(|slots| slots[0] && slots[1]),
    };

    for node in nodes {
        let slots = [
            slot_potential(&potential, node.sources[0]),
            slot_potential(&potential, node.sources[1]),
        ];
        potential.push(slots);
    }

    potential
        .iter()
        .filter(|slots| slots[0] && slots[1])
        .count() as u32
}
