//! Seed placement arithmetic for elimination trees.

use crate::models::ParticipantId;

/// Number of round-1 slots for `participants` entrants (at least 2)
pub fn bracket_slots(participants: usize) -> usize {
    participants.max(2).next_power_of_two()
}

/// Standard bracket order of seed numbers for `slots` positions
///
/// Built by repeated halving: each seed `s` in the previous order is followed
/// by its complement `size + 1 - s`, so seed 1 meets the lowest seed and the
/// top two seeds can only meet in the final.
///
/// ```
/// use bracket_engine::bracket::placement::seed_order;
///
/// assert_eq!(seed_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
/// ```
pub fn seed_order(slots: usize) -> Vec<usize> {
    let mut order = vec![1];
    let mut size = 1;
    while size < slots {
        size *= 2;
        order = order
            .iter()
            .flat_map(|&seed| [seed, size + 1 - seed])
            .collect();
    }
    order
}

/// Round-1 pairings for seeds given in seed order
///
/// Seeds beyond the participant count are byes, so the highest seeds
/// receive byes first.
pub fn round_one_pairs(seeds: &[ParticipantId]) -> Vec<[Option<ParticipantId>; 2]> {
    let slots = bracket_slots(seeds.len());
    let at = |seed: usize| seeds.get(seed - 1).copied();

    seed_order(slots)
        .chunks_exact(2)
        .map(|pair| [at(pair[0]), at(pair[1])])
        .collect()
}

/// Losers-bracket position for the loser of winners round `round`, node `position`
///
/// Round 1 losers pair up in order. Even rounds drop in reversed order, odd
/// rounds in order, so a dropped player lands in the half of the losers tree
/// away from the players it beat on the winners side.
///
/// ```
/// use bracket_engine::bracket::placement::drop_position;
///
/// assert_eq!(drop_position(2, 0, 4), 3);
/// assert_eq!(drop_position(3, 0, 2), 0);
/// ```
pub fn drop_position(round: u32, position: u32, nodes_in_round: u32) -> u32 {
    if round % 2 == 0 && nodes_in_round > 1 {
        nodes_in_round - 1 - position
    } else {
        position
    }
}
