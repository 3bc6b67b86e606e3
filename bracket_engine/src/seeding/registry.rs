//! Ordered seed list with dense renumbering.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{EngineError, EngineResult};
use crate::models::ParticipantId;

/// A participant's seed within a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub participant_id: ParticipantId,
    /// 1-indexed, dense
    pub seed_number: u32,
}

/// Seed registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRegistry {
    seeds: Vec<Seed>,
}

impl SeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an ordered list of participants
    pub fn from_order(participant_ids: &[ParticipantId]) -> EngineResult<Self> {
        let mut registry = Self::new();
        registry.set_seed_order(participant_ids)?;
        Ok(registry)
    }

    /// Replace the seed list, numbering participants 1..N in list order
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a participant appears more than once.
    pub fn set_seed_order(&mut self, participant_ids: &[ParticipantId]) -> EngineResult<()> {
        let mut seen = HashSet::with_capacity(participant_ids.len());
        for id in participant_ids {
            if !seen.insert(*id) {
                return Err(EngineError::invalid_input(format!(
                    "participant {id} appears more than once in the seed order"
                )));
            }
        }

        self.seeds = participant_ids
            .iter()
            .enumerate()
            .map(|(idx, &participant_id)| Seed {
                participant_id,
                seed_number: idx as u32 + 1,
            })
            .collect();
        Ok(())
    }

    /// Move the seed at `from_index` to `to_index` and renumber
    ///
    /// Indices are 0-based positions in the current order.
    pub fn reorder(&mut self, from_index: usize, to_index: usize) -> EngineResult<()> {
        let len = self.seeds.len();
        if from_index >= len || to_index >= len {
            return Err(EngineError::invalid_input(format!(
                "reorder {from_index} -> {to_index} out of bounds for {len} seeds"
            )));
        }

        let moved = self.seeds.remove(from_index);
        self.seeds.insert(to_index, moved);
        self.renumber();
        Ok(())
    }

    fn renumber(&mut self) {
        for (idx, seed) in self.seeds.iter_mut().enumerate() {
            seed.seed_number = idx as u32 + 1;
        }
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }

    /// Participant ids ordered by seed number
    pub fn ordered_ids(&self) -> Vec<ParticipantId> {
        self.seeds.iter().map(|seed| seed.participant_id).collect()
    }

    pub fn seed_of(&self, participant_id: ParticipantId) -> Option<u32> {
        self.seeds
            .iter()
            .find(|seed| seed.participant_id == participant_id)
            .map(|seed| seed.seed_number)
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}
