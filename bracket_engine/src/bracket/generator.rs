//! Bracket generation for each competition format.
//!
//! Each format is a generator type implementing [`GenerateBracket`]; the
//! [`Generator`] enum dispatches to them without boxing. Elimination
//! generators only lay out the node arena and its slot sources; bye
//! resolution and round-1 match creation are done by the same propagation
//! code that handles results, so a bye cascade at generation behaves exactly
//! like one triggered later.

use chrono::{DateTime, Utc};
use enum_dispatch::enum_dispatch;

use super::models::{
    Bracket, BracketFormat, BracketNode, BracketSide, BracketState, Match, MatchSlot,
    SeedingMethod, SlotSource,
};
use super::placement::{drop_position, round_one_pairs};
use crate::errors::{EngineError, EngineResult};
use crate::groups::{self, Group, GroupConfig};
use crate::models::{GroupId, MatchId, NodeId, ParticipantId, StageId};
use crate::progression::propagation;

/// Inputs shared by every generator
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub stage_id: StageId,
    pub seeding_method: SeedingMethod,
    /// Participants in seed order (seed 1 first)
    pub seeds: &'a [ParticipantId],
    pub now: DateTime<Utc>,
}

/// Trait implemented by every format generator
#[enum_dispatch]
pub trait GenerateBracket {
    fn format(&self) -> BracketFormat;

    /// Build the full generated state for a stage
    fn generate(&self, input: &GenerationInput<'_>) -> EngineResult<BracketState>;
}

/// Format generator
#[enum_dispatch(GenerateBracket)]
#[derive(Debug, Clone)]
pub enum Generator {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl Generator {
    /// Pick the generator for a stage format
    pub fn for_format(format: BracketFormat, group_config: Option<GroupConfig>) -> Self {
        match format {
            BracketFormat::SingleElimination => SingleElimination.into(),
            BracketFormat::DoubleElimination => DoubleElimination.into(),
            BracketFormat::RoundRobin => RoundRobin {
                config: group_config.unwrap_or_default(),
            }
            .into(),
        }
    }
}

/// Single elimination tree
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleElimination;

/// Winners tree, losers tree and a grand final
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleElimination;

/// Round robin groups scheduled with the circle method
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    pub config: GroupConfig,
}

impl GenerateBracket for SingleElimination {
    fn format(&self) -> BracketFormat {
        BracketFormat::SingleElimination
    }

    fn generate(&self, input: &GenerationInput<'_>) -> EngineResult<BracketState> {
        require_two(input.seeds)?;

        let mut nodes = Vec::new();
        let winners = build_winners(input.stage_id, input.seeds, &mut nodes);
        let total_rounds = winners.len() as u32;

        finish_elimination(input, self.format(), nodes, total_rounds)
    }
}

impl GenerateBracket for DoubleElimination {
    fn format(&self) -> BracketFormat {
        BracketFormat::DoubleElimination
    }

    fn generate(&self, input: &GenerationInput<'_>) -> EngineResult<BracketState> {
        require_two(input.seeds)?;

        let mut nodes = Vec::new();
        let winners = build_winners(input.stage_id, input.seeds, &mut nodes);
        let losers = build_losers(input.stage_id, &winners, &mut nodes);

        let winners_final = *winners.last().and_then(|round| round.first()).ok_or_else(|| {
            EngineError::invalid_input("winners bracket has no final")
        })?;
        let losers_champion = match losers.last().and_then(|round| round.first()) {
            Some(&losers_final) => SlotSource::WinnerOf(losers_final),
            // Two entrants: the winners final loser goes straight to the grand final
            None => SlotSource::LoserOf(winners_final),
        };
        push_node(
            &mut nodes,
            input.stage_id,
            BracketSide::GrandFinal,
            1,
            0,
            [SlotSource::WinnerOf(winners_final), losers_champion],
        );

        let total_rounds = (winners.len() + losers.len() + 1) as u32;
        finish_elimination(input, self.format(), nodes, total_rounds)
    }
}

impl GenerateBracket for RoundRobin {
    fn format(&self) -> BracketFormat {
        BracketFormat::RoundRobin
    }

    fn generate(&self, input: &GenerationInput<'_>) -> EngineResult<BracketState> {
        require_two(input.seeds)?;
        self.config.validate()?;

        let group_count = self.config.group_count as usize;
        if input.seeds.len() < group_count * 2 {
            return Err(EngineError::invalid_input(format!(
                "{} participants cannot fill {} groups of at least two",
                input.seeds.len(),
                group_count
            )));
        }

        let mut groups = Vec::with_capacity(group_count);
        let mut matches: Vec<Match> = Vec::new();
        let mut total_rounds = 0;

        for (idx, members) in groups::snake_draw(input.seeds, group_count)
            .into_iter()
            .enumerate()
        {
            let group_id = idx as GroupId;
            let schedule = groups::circle_schedule(&members, self.config.legs);
            total_rounds = total_rounds.max(schedule.len() as u32);

            for (round_idx, pairings) in schedule.iter().enumerate() {
                for &(home, away) in pairings {
                    let slot = MatchSlot::Group {
                        group_id,
                        round: round_idx as u32 + 1,
                    };
                    matches.push(Match::new(matches.len() as MatchId, slot, home, away));
                }
            }

            groups.push(Group::new(
                group_id,
                Some(input.stage_id),
                groups::group_name(idx),
                members,
            ));
        }

        let mut state = BracketState {
            bracket: Bracket {
                id: input.stage_id,
                format: self.format(),
                seeding_method: input.seeding_method,
                total_rounds,
                total_matches: matches.len() as u32,
                is_finalized: false,
                created_at: input.now,
                finalized_at: None,
            },
            nodes: Vec::new(),
            matches,
            groups,
            group_config: Some(self.config.clone()),
            seed_order: input.seeds.to_vec(),
        };

        for group_id in 0..state.groups.len() as GroupId {
            groups::refresh_group(&mut state, group_id);
        }

        Ok(state)
    }
}

fn require_two(seeds: &[ParticipantId]) -> EngineResult<()> {
    if seeds.len() < 2 {
        return Err(EngineError::invalid_input(format!(
            "need at least 2 participants, have {}",
            seeds.len()
        )));
    }
    Ok(())
}

fn push_node(
    nodes: &mut Vec<BracketNode>,
    stage_id: StageId,
    side: BracketSide,
    round: u32,
    position: u32,
    sources: [SlotSource; 2],
) -> NodeId {
    let id = nodes.len() as NodeId;
    nodes.push(BracketNode::new(id, stage_id, side, round, position, sources));
    id
}

/// Lay out the winners tree, returning node ids per round
fn build_winners(
    stage_id: StageId,
    seeds: &[ParticipantId],
    nodes: &mut Vec<BracketNode>,
) -> Vec<Vec<NodeId>> {
    let first: Vec<NodeId> = round_one_pairs(seeds)
        .into_iter()
        .enumerate()
        .map(|(position, [a, b])| {
            push_node(
                nodes,
                stage_id,
                BracketSide::Winners,
                1,
                position as u32,
                [SlotSource::Seed(a), SlotSource::Seed(b)],
            )
        })
        .collect();

    let mut rounds = vec![first];
    let mut previous = rounds[0].clone();
    while previous.len() > 1 {
        let round = rounds.len() as u32 + 1;
        let next: Vec<NodeId> = previous
            .chunks_exact(2)
            .enumerate()
            .map(|(position, pair)| {
                push_node(
                    nodes,
                    stage_id,
                    BracketSide::Winners,
                    round,
                    position as u32,
                    [SlotSource::WinnerOf(pair[0]), SlotSource::WinnerOf(pair[1])],
                )
            })
            .collect();
        rounds.push(next.clone());
        previous = next;
    }

    rounds
}

/// Lay out the losers tree fed by the winners rounds
///
/// With `k` winners rounds the losers tree has `2(k-1)` rounds: round 1 pairs
/// the winners round-1 losers, even rounds take the drops from winners round
/// `r`, odd rounds after that halve the field.
fn build_losers(
    stage_id: StageId,
    winners: &[Vec<NodeId>],
    nodes: &mut Vec<BracketNode>,
) -> Vec<Vec<NodeId>> {
    let mut rounds: Vec<Vec<NodeId>> = Vec::new();
    if winners.len() < 2 {
        return rounds;
    }

    let first: Vec<NodeId> = winners[0]
        .chunks_exact(2)
        .enumerate()
        .map(|(position, pair)| {
            push_node(
                nodes,
                stage_id,
                BracketSide::Losers,
                1,
                position as u32,
                [SlotSource::LoserOf(pair[0]), SlotSource::LoserOf(pair[1])],
            )
        })
        .collect();
    let mut previous = first.clone();
    rounds.push(first);

    for (idx, dropping) in winners.iter().enumerate().skip(1) {
        let winners_round = idx as u32 + 1;
        let count = dropping.len() as u32;

        let mut drops = dropping.clone();
        for (position, &node_id) in dropping.iter().enumerate() {
            drops[drop_position(winners_round, position as u32, count) as usize] = node_id;
        }

        let drop_round_number = rounds.len() as u32 + 1;
        let drop_round: Vec<NodeId> = previous
            .iter()
            .zip(drops.iter())
            .enumerate()
            .map(|(position, (&survivor, &dropped))| {
                push_node(
                    nodes,
                    stage_id,
                    BracketSide::Losers,
                    drop_round_number,
                    position as u32,
                    [SlotSource::WinnerOf(survivor), SlotSource::LoserOf(dropped)],
                )
            })
            .collect();
        rounds.push(drop_round.clone());
        previous = drop_round;

        if previous.len() > 1 {
            let round_number = rounds.len() as u32 + 1;
            let halved: Vec<NodeId> = previous
                .chunks_exact(2)
                .enumerate()
                .map(|(position, pair)| {
                    push_node(
                        nodes,
                        stage_id,
                        BracketSide::Losers,
                        round_number,
                        position as u32,
                        [SlotSource::WinnerOf(pair[0]), SlotSource::WinnerOf(pair[1])],
                    )
                })
                .collect();
            rounds.push(halved.clone());
            previous = halved;
        }
    }

    rounds
}

fn finish_elimination(
    input: &GenerationInput<'_>,
    format: BracketFormat,
    nodes: Vec<BracketNode>,
    total_rounds: u32,
) -> EngineResult<BracketState> {
    let mut state = BracketState {
        bracket: Bracket {
            id: input.stage_id,
            format,
            seeding_method: input.seeding_method,
            total_rounds,
            total_matches: 0,
            is_finalized: false,
            created_at: input.now,
            finalized_at: None,
        },
        nodes,
        matches: Vec::new(),
        groups: Vec::new(),
        group_config: None,
        seed_order: input.seeds.to_vec(),
    };

    state.bracket.total_matches = propagation::structural_match_count(&state.nodes);
    propagation::settle_all(&mut state, input.now);

    log::debug!(
        "Generated {} bracket for stage {}: {} nodes, {} matches expected",
        format,
        input.stage_id,
        state.nodes.len(),
        state.bracket.total_matches
    );

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::MatchState;

    fn input(seeds: &[ParticipantId]) -> GenerationInput<'_> {
        GenerationInput {
            stage_id: 1,
            seeding_method: SeedingMethod::Manual,
            seeds,
            now: Utc::now(),
        }
    }

    fn round(state: &BracketState, side: BracketSide, round: u32) -> Vec<&BracketNode> {
        state
            .nodes
            .iter()
            .filter(|n| n.bracket_side == side && n.round_number == round)
            .collect()
    }

    #[test]
    fn test_single_elim_five_entrants() {
        let seeds = [1, 2, 3, 4, 5];
        let state = SingleElimination.generate(&input(&seeds)).unwrap();

        assert_eq!(state.bracket.total_rounds, 3);
        assert_eq!(state.bracket.total_matches, 4);

        let first = round(&state, BracketSide::Winners, 1);
        assert_eq!(first.len(), 4);
        let byes: Vec<_> = first.iter().filter(|n| n.is_bye).collect();
        assert_eq!(byes.len(), 3);
        let mut bye_winners: Vec<_> = byes.iter().filter_map(|n| n.winner_id).collect();
        bye_winners.sort_unstable();
        assert_eq!(bye_winners, vec![1, 2, 3]);
        assert!(byes.iter().all(|n| n.match_id.is_none()));

        let live: Vec<_> = first.iter().filter(|n| !n.is_bye).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].participants(), [Some(4), Some(5)]);
        assert!(live[0].match_id.is_some());

        assert_eq!(round(&state, BracketSide::Winners, 2).len(), 2);
        assert_eq!(round(&state, BracketSide::Winners, 3).len(), 1);
    }

    #[test]
    fn test_single_elim_bye_cascade_creates_round_two_match() {
        let seeds = [1, 2, 3, 4, 5];
        let state = SingleElimination.generate(&input(&seeds)).unwrap();

        // Seeds 2 and 3 both had byes and meet immediately in round 2
        let second = state.node_at(BracketSide::Winners, 2, 1).unwrap();
        assert_eq!(second.participants(), [Some(2), Some(3)]);
        let m = state.match_by_id(second.match_id.unwrap()).unwrap();
        assert_eq!(m.state, MatchState::Scheduled);

        // Seed 1 waits for the winner of 4 vs 5
        let top = state.node_at(BracketSide::Winners, 2, 0).unwrap();
        assert_eq!(top.participants(), [Some(1), None]);
        assert!(top.match_id.is_none());
    }

    #[test]
    fn test_single_elim_two_entrants() {
        let state = SingleElimination.generate(&input(&[8, 9])).unwrap();
        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.bracket.total_rounds, 1);
        assert_eq!(state.matches.len(), 1);
    }

    #[test]
    fn test_rejects_single_entrant() {
        let err = SingleElimination.generate(&input(&[1])).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_double_elim_eight_layout() {
        let seeds: Vec<ParticipantId> = (1..=8).collect();
        let state = DoubleElimination.generate(&input(&seeds)).unwrap();

        assert_eq!(round(&state, BracketSide::Winners, 1).len(), 4);
        assert_eq!(round(&state, BracketSide::Losers, 1).len(), 2);
        assert_eq!(round(&state, BracketSide::Losers, 2).len(), 2);
        assert_eq!(round(&state, BracketSide::Losers, 3).len(), 1);
        assert_eq!(round(&state, BracketSide::Losers, 4).len(), 1);
        assert_eq!(round(&state, BracketSide::GrandFinal, 1).len(), 1);
        // No lazily created reset node yet
        assert!(round(&state, BracketSide::GrandFinal, 2).is_empty());
        // 7 winners + 6 losers + grand final
        assert_eq!(state.bracket.total_matches, 14);
        assert_eq!(state.bracket.total_rounds, 3 + 4 + 1);
    }

    #[test]
    fn test_double_elim_two_entrants_feeds_loser_to_grand_final() {
        let state = DoubleElimination.generate(&input(&[1, 2])).unwrap();
        let grand_final = state.node_at(BracketSide::GrandFinal, 1, 0).unwrap();
        assert_eq!(
            grand_final.sources,
            [SlotSource::WinnerOf(0), SlotSource::LoserOf(0)]
        );
        assert_eq!(state.bracket.total_matches, 2);
    }

    #[test]
    fn test_round_robin_groups() {
        let seeds: Vec<ParticipantId> = (1..=8).collect();
        let generator = RoundRobin {
            config: GroupConfig {
                group_count: 2,
                ..GroupConfig::default()
            },
        };
        let state = generator.generate(&input(&seeds)).unwrap();

        assert_eq!(state.groups.len(), 2);
        assert_eq!(state.groups[0].name, "Group A");
        assert_eq!(state.groups[0].member_ids, vec![1, 4, 5, 8]);
        assert_eq!(state.groups[1].member_ids, vec![2, 3, 6, 7]);
        // 6 matches per group of 4
        assert_eq!(state.matches.len(), 12);
        assert_eq!(state.bracket.total_rounds, 3);
        assert!(state.nodes.is_empty());
        assert_eq!(state.groups[0].standings.len(), 4);
    }

    #[test]
    fn test_round_robin_too_many_groups() {
        let seeds: Vec<ParticipantId> = (1..=5).collect();
        let generator = RoundRobin {
            config: GroupConfig {
                group_count: 3,
                ..GroupConfig::default()
            },
        };
        assert!(generator.generate(&input(&seeds)).is_err());
    }

    #[test]
    fn test_generator_dispatch() {
        let generator = Generator::for_format(BracketFormat::DoubleElimination, None);
        assert_eq!(generator.format(), BracketFormat::DoubleElimination);
        let generator = Generator::for_format(BracketFormat::RoundRobin, None);
        assert_eq!(generator.format(), BracketFormat::RoundRobin);
    }
}
