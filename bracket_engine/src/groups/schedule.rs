//! Round robin scheduling with the circle method.

use crate::models::ParticipantId;

/// One round of `(home, away)` pairings
pub type Round = Vec<(ParticipantId, ParticipantId)>;

/// Schedule every pair of `members` once per leg
///
/// The first member stays fixed while the others rotate one place per round.
/// An odd group gets a placeholder, and whoever meets it sits the round out.
/// The second leg replays the first with home and away swapped.
pub fn circle_schedule(members: &[ParticipantId], legs: u32) -> Vec<Round> {
    if members.len() < 2 {
        return Vec::new();
    }

    let mut circle: Vec<Option<ParticipantId>> = members.iter().copied().map(Some).collect();
    if circle.len() % 2 == 1 {
        circle.push(None);
    }
    let n = circle.len();

    let mut first_leg = Vec::with_capacity(n - 1);
    for round in 0..n - 1 {
        let mut pairings = Vec::with_capacity(n / 2);
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (circle[i], circle[n - 1 - i]) {
                // Alternate the fixed member's side so home games spread out
                if i == 0 && round % 2 == 1 {
                    pairings.push((b, a));
                } else {
                    pairings.push((a, b));
                }
            }
        }
        first_leg.push(pairings);
        circle[1..].rotate_right(1);
    }

    let mut rounds = first_leg.clone();
    if legs >= 2 {
        rounds.extend(
            first_leg
                .into_iter()
                .map(|round| round.into_iter().map(|(home, away)| (away, home)).collect()),
        );
    }
    rounds
}
