//! Random seeding for stages configured with the `random` seeding method.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::models::ParticipantId;

/// Seed shuffler
pub struct SeedShuffler {
    rng: StdRng,
}

impl SeedShuffler {
    /// Create a shuffler seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible shuffler
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Return the participants in a random seed order
    pub fn shuffle(&mut self, participant_ids: &[ParticipantId]) -> Vec<ParticipantId> {
        let mut order = participant_ids.to_vec();
        order.shuffle(&mut self.rng);
        order
    }
}

impl Default for SeedShuffler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut shuffler = SeedShuffler::new();
        let ids: Vec<ParticipantId> = (1..=16).collect();
        let mut shuffled = shuffler.shuffle(&ids);
        assert_eq!(shuffled.len(), ids.len());
        shuffled.sort_unstable();
        assert_eq!(shuffled, ids);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let ids: Vec<ParticipantId> = (1..=32).collect();
        let first = SeedShuffler::with_seed(42).shuffle(&ids);
        let second = SeedShuffler::with_seed(42).shuffle(&ids);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let mut shuffler = SeedShuffler::with_seed(1);
        assert!(shuffler.shuffle(&[]).is_empty());
    }
}
