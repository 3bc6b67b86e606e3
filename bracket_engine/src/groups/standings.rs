//! Group standings.
//!
//! [`compute_standings`] is a pure function of the group members and the
//! group's matches: it tallies every match that has a result, so the outcome
//! does not depend on the order results were entered.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::models::{Group, GroupConfig, Standing};
use crate::bracket::{BracketState, Match};
use crate::models::{GroupId, ParticipantId};

/// Compute a group's table from its matches
///
/// Ranking order: points, then head-to-head points among the participants
/// tied on points, then score differential, then seed (lowest first).
pub fn compute_standings(
    group_id: GroupId,
    members: &[ParticipantId],
    matches: &[&Match],
    config: &GroupConfig,
    seeds: &HashMap<ParticipantId, u32>,
) -> Vec<Standing> {
    let points = config.points;
    let mut table: HashMap<ParticipantId, Standing> = members
        .iter()
        .map(|&id| (id, Standing::empty(group_id, id)))
        .collect();
    let mut remaining: HashMap<ParticipantId, i32> = HashMap::new();

    for m in matches {
        if !m.state.has_result() {
            // Cancelled matches will never be played
            if !m.state.is_settled() {
                *remaining.entry(m.participant1_id).or_default() += 1;
                *remaining.entry(m.participant2_id).or_default() += 1;
            }
            continue;
        }

        for (participant_id, opponent_id) in [
            (m.participant1_id, m.participant2_id),
            (m.participant2_id, m.participant1_id),
        ] {
            let Some(row) = table.get_mut(&participant_id) else {
                continue;
            };
            let (score_for, score_against) = m.scores_for(participant_id).unwrap_or((0, 0));
            row.played += 1;
            row.score_for += score_for;
            row.score_against += score_against;
            match m.winner_id {
                Some(winner) if winner == participant_id => {
                    row.wins += 1;
                    row.points += points.win;
                }
                Some(winner) if winner == opponent_id => {
                    row.losses += 1;
                    row.points += points.loss;
                }
                _ => {
                    row.draws += 1;
                    row.points += points.draw;
                }
            }
        }
    }

    let mut rows: Vec<Standing> = table.into_values().collect();
    rows.sort_by(|a, b| b.points.cmp(&a.points));

    // Break ties tier by tier, where a tier shares the same points
    let mut ordered = Vec::with_capacity(rows.len());
    let mut start = 0;
    while start < rows.len() {
        let tier_points = rows[start].points;
        let end = rows[start..]
            .iter()
            .position(|row| row.points != tier_points)
            .map_or(rows.len(), |offset| start + offset);

        let mut tier: Vec<Standing> = rows[start..end].to_vec();
        if tier.len() > 1 {
            let tied: HashSet<ParticipantId> = tier.iter().map(|row| row.participant_id).collect();
            let head_to_head = head_to_head_points(&tied, matches, config);
            tier.sort_by(|a, b| {
                let h2h_a = head_to_head.get(&a.participant_id).copied().unwrap_or(0);
                let h2h_b = head_to_head.get(&b.participant_id).copied().unwrap_or(0);
                h2h_b
                    .cmp(&h2h_a)
                    .then_with(|| b.score_differential().cmp(&a.score_differential()))
                    .then_with(|| by_seed(a.participant_id, b.participant_id, seeds))
            });
        }
        ordered.extend(tier);
        start = end;
    }

    let advancement = config.advancement_count as usize;
    let complete = remaining.values().all(|&count| count == 0);
    let best = points.best();

    let current: Vec<i32> = ordered.iter().map(|row| row.points).collect();
    for (idx, row) in ordered.iter_mut().enumerate() {
        row.rank = idx as u32 + 1;
        row.is_advancing = idx < advancement;
        row.is_eliminated = if complete {
            !row.is_advancing
        } else {
            let max_points =
                row.points + remaining.get(&row.participant_id).copied().unwrap_or(0) * best;
            let out_of_reach = current
                .iter()
                .enumerate()
                .filter(|&(other, &points)| other != idx && points > max_points)
                .count();
            out_of_reach >= advancement
        };
    }

    ordered
}

/// Points each tied participant earned in matches among the tied set
fn head_to_head_points(
    tied: &HashSet<ParticipantId>,
    matches: &[&Match],
    config: &GroupConfig,
) -> HashMap<ParticipantId, i32> {
    let mut points: HashMap<ParticipantId, i32> = HashMap::new();
    for m in matches {
        if !m.state.has_result()
            || !tied.contains(&m.participant1_id)
            || !tied.contains(&m.participant2_id)
        {
            continue;
        }
        match m.winner_id {
            Some(winner) => {
                let loser = if winner == m.participant1_id {
                    m.participant2_id
                } else {
                    m.participant1_id
                };
                *points.entry(winner).or_default() += config.points.win;
                *points.entry(loser).or_default() += config.points.loss;
            }
            None => {
                *points.entry(m.participant1_id).or_default() += config.points.draw;
                *points.entry(m.participant2_id).or_default() += config.points.draw;
            }
        }
    }
    points
}

fn by_seed(a: ParticipantId, b: ParticipantId, seeds: &HashMap<ParticipantId, u32>) -> Ordering {
    let seed_a = seeds.get(&a).copied().unwrap_or(u32::MAX);
    let seed_b = seeds.get(&b).copied().unwrap_or(u32::MAX);
    seed_a.cmp(&seed_b).then(a.cmp(&b))
}

/// Recompute one group's standings inside a generated state
pub(crate) fn refresh_group(state: &mut BracketState, group_id: GroupId) {
    let Some(config) = state.group_config.clone() else {
        return;
    };
    let Some(idx) = state.groups.iter().position(|group| group.id == group_id) else {
        return;
    };

    let seeds = state.seed_numbers();
    let matches: Vec<&Match> = state
        .matches
        .iter()
        .filter(|m| m.group_id() == Some(group_id))
        .collect();
    let standings = compute_standings(
        group_id,
        &state.groups[idx].member_ids,
        &matches,
        &config,
        &seeds,
    );
    state.groups[idx].standings = standings;
}

/// Participants ordered across groups by rank, then points, differential and seed
///
/// With `per_group` set only the top `per_group` of each group are included,
/// so the result lists every group winner before any runner-up.
pub fn rank_across_groups(
    groups: &[Group],
    per_group: Option<u32>,
    seeds: &HashMap<ParticipantId, u32>,
) -> Vec<ParticipantId> {
    let mut rows: Vec<&Standing> = groups
        .iter()
        .flat_map(|group| group.standings.iter())
        .filter(|row| per_group.is_none_or(|limit| row.rank <= limit))
        .collect();

    rows.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| b.points.cmp(&a.points))
            .then_with(|| b.score_differential().cmp(&a.score_differential()))
            .then_with(|| by_seed(a.participant_id, b.participant_id, seeds))
    });

    rows.into_iter().map(|row| row.participant_id).collect()
}
