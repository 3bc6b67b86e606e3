//! Stage manager: the entry point for every stage and match mutation.

use chrono::Utc;
use std::sync::Arc;

use super::models::{NewStage, StageState};
use super::views::{BracketView, GroupsView};
use crate::bracket::ResultReport;
use crate::db::StageRepository;
use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::groups::GroupConfig;
use crate::models::{Actor, NodeId, ParticipantId, StageId, TournamentId};
use crate::progression::{MatchTarget, TransitionOutcome};
use crate::registration::{ParticipantSource, Registrant};
use crate::seeding::SeedShuffler;

/// Stage manager
#[derive(Clone)]
pub struct StageManager {
    stages: Arc<dyn StageRepository>,
    registrations: Arc<dyn ParticipantSource>,
    /// Fixed shuffle seed for reproducible random seeding
    shuffle_seed: Option<u64>,
}

fn require_operator(actor: &Actor, action: &'static str) -> EngineResult<()> {
    if actor.is_operator() {
        Ok(())
    } else {
        Err(EngineError::Forbidden { action })
    }
}

impl StageManager {
    /// Create a new stage manager
    pub fn new(
        stages: Arc<dyn StageRepository>,
        registrations: Arc<dyn ParticipantSource>,
    ) -> Self {
        Self {
            stages,
            registrations,
            shuffle_seed: None,
        }
    }

    /// Use a fixed seed for random seeding
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub(crate) fn shuffler_for(shuffle_seed: Option<u64>, stage_id: StageId) -> SeedShuffler {
        match shuffle_seed {
            Some(seed) => SeedShuffler::with_seed(seed ^ stage_id as u64),
            None => SeedShuffler::new(),
        }
    }

    /// Run `apply` on a locked working copy and commit it if it succeeds
    async fn mutate<T, F>(&self, stage_id: StageId, apply: F) -> EngineResult<T>
    where
        F: FnOnce(&mut StageState) -> EngineResult<T> + Send,
        T: Send,
    {
        let mut guard = self.stages.lock_stage(stage_id).await?;
        let result = apply(guard.state_mut())?;
        guard.state_mut().updated_at = Utc::now();
        guard.commit().await?;
        Ok(result)
    }

    /// Finalized registrants; stages fed by a pipeline use their stored entrants
    async fn registrants(&self, stage: &StageState) -> EngineResult<Vec<Registrant>> {
        match &stage.entrants {
            Some(entrants) => Ok(entrants.clone()),
            None => self.registrations.finalized_participants(stage.id()).await,
        }
    }

    async fn snapshot(&self, stage_id: StageId) -> EngineResult<StageState> {
        self.stages
            .stage(stage_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: EntityRef::stage(stage_id),
            })
    }

    /// Create a stage
    pub async fn create_stage(&self, actor: &Actor, request: NewStage) -> EngineResult<StageState> {
        require_operator(actor, "create stages")?;
        let stage = self.stages.insert_stage(request, Utc::now()).await?;
        log::info!(
            "Created stage {} ({}) for tournament {}",
            stage.id(),
            stage.config.format,
            stage.config.tournament_id
        );
        Ok(stage)
    }

    /// Latest committed state of a stage
    pub async fn stage(&self, stage_id: StageId) -> EngineResult<StageState> {
        self.snapshot(stage_id).await
    }

    pub async fn stages_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<StageState>> {
        self.stages.stages_for_tournament(tournament_id).await
    }

    /// Replace the seed order of a stage
    pub async fn save_seed_order(
        &self,
        actor: &Actor,
        stage_id: StageId,
        participant_ids: Vec<ParticipantId>,
    ) -> EngineResult<()> {
        require_operator(actor, "edit seeds")?;
        let registrants = self.registrants(&self.snapshot(stage_id).await?).await?;
        self.mutate(stage_id, move |stage| {
            stage.save_seed_order(&participant_ids, &registrants)
        })
        .await?;
        log::info!("Saved seed order for stage {}", stage_id);
        Ok(())
    }

    /// Move one seed to another position
    pub async fn reorder_seed(
        &self,
        actor: &Actor,
        stage_id: StageId,
        from_index: usize,
        to_index: usize,
    ) -> EngineResult<()> {
        require_operator(actor, "edit seeds")?;
        self.mutate(stage_id, move |stage| stage.reorder_seed(from_index, to_index))
            .await
    }

    /// Replace the round robin settings
    pub async fn configure_groups(
        &self,
        actor: &Actor,
        stage_id: StageId,
        config: GroupConfig,
    ) -> EngineResult<()> {
        require_operator(actor, "configure groups")?;
        self.mutate(stage_id, move |stage| stage.configure_groups(config))
            .await
    }

    /// Build the stage's bracket or groups
    ///
    /// Registrants are fetched before the stage lock is taken; a second
    /// generate fails with `AlreadyGenerated` once the first has committed.
    pub async fn generate(&self, actor: &Actor, stage_id: StageId) -> EngineResult<BracketView> {
        require_operator(actor, "generate brackets")?;
        let registrants = self.registrants(&self.snapshot(stage_id).await?).await?;
        let shuffle_seed = self.shuffle_seed;

        self.mutate(stage_id, move |stage| {
            let mut shuffler = Self::shuffler_for(shuffle_seed, stage.id());
            stage.generate(&registrants, &mut shuffler, Utc::now())?;
            Ok(BracketView::from_stage(stage))
        })
        .await
    }

    /// Group draw and schedule of a round robin stage
    pub async fn draw_groups(&self, actor: &Actor, stage_id: StageId) -> EngineResult<GroupsView> {
        let stage = self.snapshot(stage_id).await?;
        if stage.config.format.is_elimination() {
            return Err(EngineError::invalid_state(
                stage.entity(),
                format!("{} stages have no groups to draw", stage.config.format),
            ));
        }
        self.generate(actor, stage_id).await?;
        Ok(GroupsView::from_stage(&self.snapshot(stage_id).await?))
    }

    /// Discard the generated bracket
    pub async fn reset(
        &self,
        actor: &Actor,
        stage_id: StageId,
        force: bool,
    ) -> EngineResult<TransitionOutcome> {
        require_operator(actor, "reset brackets")?;
        let actor = *actor;
        self.mutate(stage_id, move |stage| stage.reset(&actor, force))
            .await
    }

    /// Publish the bracket, locking seeds
    pub async fn publish(
        &self,
        actor: &Actor,
        stage_id: StageId,
    ) -> EngineResult<TransitionOutcome> {
        require_operator(actor, "publish brackets")?;
        self.mutate(stage_id, |stage| stage.publish(Utc::now()))
            .await
    }

    pub async fn start_match(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        self.mutate(stage_id, move |stage| {
            stage.bracket_mut()?.start_match(&actor, target, Utc::now())
        })
        .await
    }

    pub async fn report_result(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
        report: ResultReport,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        self.mutate(stage_id, move |stage| {
            stage
                .bracket_mut()?
                .report_result(&actor, target, report, Utc::now())
        })
        .await
    }

    pub async fn confirm_result(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        let outcome = self
            .mutate(stage_id, move |stage| {
                stage.bracket_mut()?.confirm_result(&actor, target, Utc::now())
            })
            .await?;
        log::info!("Stage {}: result confirmed for {:?} ({:?})", stage_id, target, outcome);
        Ok(outcome)
    }

    pub async fn record_result(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
        report: ResultReport,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        let outcome = self
            .mutate(stage_id, move |stage| {
                stage
                    .bracket_mut()?
                    .record_result(&actor, target, report, Utc::now())
            })
            .await?;
        log::info!("Stage {}: result recorded for {:?} ({:?})", stage_id, target, outcome);
        Ok(outcome)
    }

    pub async fn dispute(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
        reason: String,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        let outcome = self
            .mutate(stage_id, move |stage| {
                stage.bracket_mut()?.dispute(&actor, target, reason)
            })
            .await?;
        log::warn!("Stage {}: {:?} disputed", stage_id, target);
        Ok(outcome)
    }

    pub async fn resolve_dispute(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
        report: ResultReport,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        self.mutate(stage_id, move |stage| {
            stage
                .bracket_mut()?
                .resolve_dispute(&actor, target, report, Utc::now())
        })
        .await
    }

    pub async fn forfeit(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
        forfeiting: ParticipantId,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        self.mutate(stage_id, move |stage| {
            stage
                .bracket_mut()?
                .forfeit(&actor, target, forfeiting, Utc::now())
        })
        .await
    }

    pub async fn cancel(
        &self,
        actor: &Actor,
        stage_id: StageId,
        target: MatchTarget,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        self.mutate(stage_id, move |stage| {
            stage.bracket_mut()?.cancel(&actor, target, Utc::now())
        })
        .await
    }

    pub async fn assign_outcome(
        &self,
        actor: &Actor,
        stage_id: StageId,
        node_id: NodeId,
        winner: ParticipantId,
    ) -> EngineResult<TransitionOutcome> {
        let actor = *actor;
        self.mutate(stage_id, move |stage| {
            stage
                .bracket_mut()?
                .assign_outcome(&actor, node_id, winner, Utc::now())
        })
        .await
    }

    /// `GET bracket(stage_id)`
    pub async fn bracket_view(&self, stage_id: StageId) -> EngineResult<BracketView> {
        Ok(BracketView::from_stage(&self.snapshot(stage_id).await?))
    }

    /// `GET groups(stage_id)`
    pub async fn groups_view(&self, stage_id: StageId) -> EngineResult<GroupsView> {
        Ok(GroupsView::from_stage(&self.snapshot(stage_id).await?))
    }
}
