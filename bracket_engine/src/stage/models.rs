//! Stage aggregate.
//!
//! A stage owns its seed registry and, once generated, its [`BracketState`].
//! Every method here is synchronous and works on a working copy; the manager
//! commits the copy only when the method succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bracket::{
    BracketFormat, BracketState, GenerateBracket, GenerationInput, Generator, SeedingMethod,
};
use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::groups::GroupConfig;
use crate::models::{Actor, ParticipantId, StageId, TournamentId};
use crate::progression::TransitionOutcome;
use crate::registration::{Registrant, registration_order};
use crate::seeding::{SeedRegistry, SeedShuffler};

/// Request to create a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStage {
    pub tournament_id: TournamentId,
    pub name: String,
    pub format: BracketFormat,
    #[serde(default)]
    pub seeding_method: SeedingMethod,
    /// Round robin only
    #[serde(default)]
    pub groups: Option<GroupConfig>,
}

/// Immutable stage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: StageId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub format: BracketFormat,
    pub seeding_method: SeedingMethod,
    pub groups: GroupConfig,
    pub created_at: DateTime<Utc>,
}

/// Stage aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub config: StageConfig,
    pub seeds: SeedRegistry,
    /// Display names of everyone the stage has seen
    pub participants: BTreeMap<ParticipantId, String>,
    /// Entrants written by a pipeline; replaces the registration roster
    pub entrants: Option<Vec<Registrant>>,
    pub bracket: Option<BracketState>,
    pub updated_at: DateTime<Utc>,
}

impl StageState {
    pub fn new(id: StageId, request: NewStage, now: DateTime<Utc>) -> EngineResult<Self> {
        if request.name.trim().is_empty() {
            return Err(EngineError::invalid_input("stage name must not be empty"));
        }
        let groups = request.groups.unwrap_or_default();
        groups.validate()?;

        Ok(Self {
            config: StageConfig {
                id,
                tournament_id: request.tournament_id,
                name: request.name,
                format: request.format,
                seeding_method: request.seeding_method,
                groups,
                created_at: now,
            },
            seeds: SeedRegistry::new(),
            participants: BTreeMap::new(),
            entrants: None,
            bracket: None,
            updated_at: now,
        })
    }

    pub fn id(&self) -> StageId {
        self.config.id
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::stage(self.config.id)
    }

    pub fn is_generated(&self) -> bool {
        self.bracket.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.bracket
            .as_ref()
            .is_some_and(|state| state.bracket.is_finalized)
    }

    /// Generated, every match settled and no void node left without an outcome
    pub fn is_complete(&self) -> bool {
        self.bracket
            .as_ref()
            .is_some_and(|state| state.unfinished() == 0)
    }

    pub fn bracket(&self) -> EngineResult<&BracketState> {
        self.bracket
            .as_ref()
            .ok_or_else(|| EngineError::invalid_state(self.entity(), "bracket not generated"))
    }

    pub fn bracket_mut(&mut self) -> EngineResult<&mut BracketState> {
        let entity = self.entity();
        self.bracket
            .as_mut()
            .ok_or_else(|| EngineError::invalid_state(entity, "bracket not generated"))
    }

    pub fn display_name(&self, participant_id: ParticipantId) -> Option<&str> {
        self.participants.get(&participant_id).map(String::as_str)
    }

    /// Remember registrant display names
    pub fn record_names(&mut self, registrants: &[Registrant]) {
        for registrant in registrants {
            self.participants
                .insert(registrant.participant_id, registrant.display_name.clone());
        }
    }

    fn ensure_seeds_editable(&self) -> EngineResult<()> {
        if self.is_finalized() {
            return Err(EngineError::invalid_state(
                self.entity(),
                "seeds cannot change once the bracket is published",
            ));
        }
        Ok(())
    }

    /// Replace the seed order; every id must be a known registrant
    pub fn save_seed_order(
        &mut self,
        participant_ids: &[ParticipantId],
        registrants: &[Registrant],
    ) -> EngineResult<()> {
        self.ensure_seeds_editable()?;
        if let Some(unknown) = participant_ids
            .iter()
            .find(|id| !registrants.iter().any(|r| r.participant_id == **id))
        {
            return Err(EngineError::invalid_input(format!(
                "participant {unknown} is not a finalized registrant of stage {}",
                self.id()
            )));
        }

        self.seeds.set_seed_order(participant_ids)?;
        self.record_names(registrants);
        Ok(())
    }

    /// Move one seed and renumber
    pub fn reorder_seed(&mut self, from_index: usize, to_index: usize) -> EngineResult<()> {
        self.ensure_seeds_editable()?;
        self.seeds.reorder(from_index, to_index)
    }

    /// Replace the round robin settings of a not yet generated stage
    pub fn configure_groups(&mut self, config: GroupConfig) -> EngineResult<()> {
        if self.config.format != BracketFormat::RoundRobin {
            return Err(EngineError::invalid_state(
                self.entity(),
                format!("{} stages have no groups", self.config.format),
            ));
        }
        if self.is_generated() {
            return Err(EngineError::AlreadyGenerated {
                entity: self.entity(),
            });
        }
        config.validate()?;
        self.config.groups = config;
        Ok(())
    }

    /// Seed order for generation according to the stage's seeding method
    ///
    /// Manual seeding uses the saved order (limited to current registrants)
    /// and appends anyone unseeded in registration order.
    pub fn generation_order(
        &self,
        registrants: &[Registrant],
        shuffler: &mut SeedShuffler,
    ) -> Vec<ParticipantId> {
        match self.config.seeding_method {
            SeedingMethod::Manual => {
                let registered: Vec<ParticipantId> =
                    registrants.iter().map(|r| r.participant_id).collect();
                let mut order: Vec<ParticipantId> = self
                    .seeds
                    .ordered_ids()
                    .into_iter()
                    .filter(|id| registered.contains(id))
                    .collect();
                for id in registered {
                    if !order.contains(&id) {
                        order.push(id);
                    }
                }
                order
            }
            SeedingMethod::Registration => registration_order(registrants),
            SeedingMethod::Random => {
                let ids: Vec<ParticipantId> = registrants.iter().map(|r| r.participant_id).collect();
                shuffler.shuffle(&ids)
            }
        }
    }

    /// Build the bracket from the given registrants
    ///
    /// The effective order is written back to the seed registry, so later
    /// tie-breaks and projections see the seeds actually used.
    pub fn generate(
        &mut self,
        registrants: &[Registrant],
        shuffler: &mut SeedShuffler,
        now: DateTime<Utc>,
    ) -> EngineResult<&BracketState> {
        if self.is_generated() {
            return Err(EngineError::AlreadyGenerated {
                entity: self.entity(),
            });
        }

        let order = self.generation_order(registrants, shuffler);
        let generator = Generator::for_format(self.config.format, Some(self.config.groups.clone()));
        let state = generator.generate(&GenerationInput {
            stage_id: self.id(),
            seeding_method: self.config.seeding_method,
            seeds: &order,
            now,
        })?;

        self.seeds.set_seed_order(&order)?;
        self.record_names(registrants);

        log::info!(
            "Stage {} generated: {} with {} participants, {} matches",
            self.id(),
            self.config.format,
            order.len(),
            state.bracket.total_matches
        );
        Ok(self.bracket.insert(state))
    }

    /// Discard everything generation created
    ///
    /// A published bracket needs `force`, and only an admin may force.
    pub fn reset(&mut self, actor: &Actor, force: bool) -> EngineResult<TransitionOutcome> {
        if force && !actor.is_admin() {
            return Err(EngineError::Forbidden {
                action: "force a reset",
            });
        }
        if self.is_finalized() && !force {
            return Err(EngineError::Finalized {
                entity: self.entity(),
            });
        }
        if self.bracket.take().is_none() {
            return Ok(TransitionOutcome::Unchanged);
        }

        log::info!("Stage {} reset (force: {})", self.id(), force);
        Ok(TransitionOutcome::Applied)
    }

    /// Mark the bracket as published
    pub fn publish(&mut self, now: DateTime<Utc>) -> EngineResult<TransitionOutcome> {
        let stage_id = self.id();
        let state = self.bracket_mut()?;
        if state.bracket.is_finalized {
            return Ok(TransitionOutcome::Unchanged);
        }
        state.bracket.is_finalized = true;
        state.bracket.finalized_at = Some(now);

        log::info!("Stage {} published", stage_id);
        Ok(TransitionOutcome::Applied)
    }
}
