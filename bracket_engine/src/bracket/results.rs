//! Champion and final placements of elimination brackets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::models::{BracketFormat, BracketNode, BracketSide, BracketState};
use crate::models::ParticipantId;

/// Final (or current) place of a participant in an elimination bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub participant_id: ParticipantId,
    /// 1-indexed; participants knocked out at the same depth share a place
    pub place: u32,
}

impl BracketState {
    /// Winner of the whole bracket, once decided
    ///
    /// Round robin stages have no single champion and return `None`.
    pub fn champion(&self) -> Option<ParticipantId> {
        match self.bracket.format {
            BracketFormat::RoundRobin => None,
            BracketFormat::SingleElimination => {
                let rounds = self.winners_rounds();
                self.node_at(BracketSide::Winners, rounds, 0)?.winner_id
            }
            BracketFormat::DoubleElimination => {
                let last = self
                    .nodes
                    .iter()
                    .filter(|node| node.bracket_side == BracketSide::GrandFinal)
                    .max_by_key(|node| node.round_number)?;
                let winner = last.winner_id?;
                // A losers-side win in the first grand final forces a reset match
                if last.round_number == 1 && last.participant2_id == Some(winner) {
                    return None;
                }
                Some(winner)
            }
        }
    }

    /// Places for every participant in the tree, best first
    ///
    /// Depth is the furthest node a participant lost in, or is still waiting
    /// in. Ties at the same depth share a place and are listed by seed.
    pub fn placements(&self, seeds: &HashMap<ParticipantId, u32>) -> Vec<Placement> {
        let winners_rounds = self.winners_rounds();
        let mut depth: BTreeMap<ParticipantId, u32> = BTreeMap::new();
        let mut reach = |participant_id: ParticipantId, key: u32| {
            let entry = depth.entry(participant_id).or_insert(0);
            *entry = (*entry).max(key);
        };

        for node in &self.nodes {
            let key = depth_key(node, winners_rounds);
            if node.is_decided() {
                if let Some(loser) = node.loser_id() {
                    reach(loser, key);
                }
                if let Some(winner) = node.winner_id {
                    reach(winner, key);
                }
            } else {
                for participant_id in node.participants().into_iter().flatten() {
                    reach(participant_id, key);
                }
            }
        }

        if let Some(champion) = self.champion() {
            depth.insert(champion, u32::MAX);
        }

        let mut ordered: Vec<(ParticipantId, u32)> = depth.into_iter().collect();
        ordered.sort_by(|a, b| {
            b.1.cmp(&a.1).then_with(|| {
                let seed_a = seeds.get(&a.0).copied().unwrap_or(u32::MAX);
                let seed_b = seeds.get(&b.0).copied().unwrap_or(u32::MAX);
                seed_a.cmp(&seed_b).then(a.0.cmp(&b.0))
            })
        });

        let mut placements = Vec::with_capacity(ordered.len());
        let mut place = 0;
        let mut previous_key = None;
        for (idx, (participant_id, key)) in ordered.into_iter().enumerate() {
            if previous_key != Some(key) {
                place = idx as u32 + 1;
                previous_key = Some(key);
            }
            placements.push(Placement {
                participant_id,
                place,
            });
        }
        placements
    }
}

/// Elimination depth of a node
///
/// A winners round `r` loser in double elimination drops to losers round
/// `2(r-1)` (or round 1), which is never shallower, so the round number works
/// as depth on both sides. Grand-final nodes sit past the losers final.
fn depth_key(node: &BracketNode, winners_rounds: u32) -> u32 {
    match node.bracket_side {
        BracketSide::Winners | BracketSide::Losers => node.round_number,
        BracketSide::GrandFinal => 2 * winners_rounds.saturating_sub(1) + node.round_number,
    }
}
