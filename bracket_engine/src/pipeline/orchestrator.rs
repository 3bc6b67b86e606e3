//! Pipeline orchestrator: feeds the advancing set of one stage into the next.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::models::{AdvancementRule, NewPipeline, Pipeline, PipelineStatus};
use crate::db::{PipelineRepository, StageGuard, StageRepository};
use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::groups::rank_across_groups;
use crate::models::{Actor, ParticipantId, PipelineId, StageId, TournamentId};
use crate::registration::Registrant;
use crate::stage::{PipelineView, StageManager, StageState};

/// Result of advancing a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    pub pipeline_status: PipelineStatus,
    /// Stage that received the advancing participants, if any
    pub next_stage_id: Option<StageId>,
    /// In seed order for the next stage
    pub advancing: Vec<ParticipantId>,
    pub generated: bool,
}

/// Participants that move on from a finished stage, best first
///
/// Round robin stages rank across groups; elimination stages use bracket
/// placements, where "per group" means overall.
pub fn advancing_participants(
    stage: &StageState,
    rule: AdvancementRule,
) -> EngineResult<Vec<ParticipantId>> {
    let state = stage.bracket()?;
    let seeds = state.seed_numbers();
    let count = rule.count() as usize;

    let ranked = if state.bracket.format.is_elimination() {
        state
            .placements(&seeds)
            .into_iter()
            .map(|placement| placement.participant_id)
            .take(count)
            .collect()
    } else {
        match rule {
            AdvancementRule::TopPerGroup { count } => {
                rank_across_groups(&state.groups, Some(count), &seeds)
            }
            AdvancementRule::TopOverall { .. } => rank_across_groups(&state.groups, None, &seeds)
                .into_iter()
                .take(count)
                .collect(),
        }
    };
    Ok(ranked)
}

/// Pipeline orchestrator
#[derive(Clone)]
pub struct PipelineOrchestrator {
    pipelines: Arc<dyn PipelineRepository>,
    stages: Arc<dyn StageRepository>,
    shuffle_seed: Option<u64>,
}

impl PipelineOrchestrator {
    pub fn new(pipelines: Arc<dyn PipelineRepository>, stages: Arc<dyn StageRepository>) -> Self {
        Self {
            pipelines,
            stages,
            shuffle_seed: None,
        }
    }

    /// Use a fixed seed when an auto-generated stage seeds randomly
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Create a pipeline over existing stages of one tournament
    pub async fn create_pipeline(
        &self,
        actor: &Actor,
        request: NewPipeline,
    ) -> EngineResult<Pipeline> {
        if !actor.is_operator() {
            return Err(EngineError::Forbidden {
                action: "create pipelines",
            });
        }

        for entry in &request.stages {
            let stage = self.stages.stage(entry.stage_id).await?.ok_or(
                EngineError::NotFound {
                    entity: EntityRef::stage(entry.stage_id),
                },
            )?;
            if stage.config.tournament_id != request.tournament_id {
                return Err(EngineError::invalid_input(format!(
                    "stage {} belongs to tournament {}, not {}",
                    entry.stage_id, stage.config.tournament_id, request.tournament_id
                )));
            }
        }

        let pipeline = self.pipelines.insert_pipeline(request, Utc::now()).await?;
        log::info!(
            "Created pipeline {} '{}' with {} stages",
            pipeline.id,
            pipeline.name,
            pipeline.stages.len()
        );
        Ok(pipeline)
    }

    /// Delete a pipeline; its stages are kept
    pub async fn delete_pipeline(&self, actor: &Actor, pipeline_id: PipelineId) -> EngineResult<()> {
        if !actor.is_operator() {
            return Err(EngineError::Forbidden {
                action: "delete pipelines",
            });
        }
        if !self.pipelines.delete_pipeline(pipeline_id).await? {
            return Err(EngineError::NotFound {
                entity: EntityRef::pipeline(pipeline_id),
            });
        }
        log::info!("Deleted pipeline {}", pipeline_id);
        Ok(())
    }

    /// Lock two stages in id order
    async fn lock_pair(
        &self,
        first: StageId,
        second: StageId,
    ) -> EngineResult<(StageGuard, StageGuard)> {
        if first < second {
            let a = self.stages.lock_stage(first).await?;
            let b = self.stages.lock_stage(second).await?;
            Ok((a, b))
        } else {
            let b = self.stages.lock_stage(second).await?;
            let a = self.stages.lock_stage(first).await?;
            Ok((a, b))
        }
    }

    /// Seed (and optionally generate) the stage after `stage_index`
    ///
    /// Fails with `StageIncomplete` while the stage has unfinished matches or
    /// cancelled nodes without an assigned outcome.
    /// Repeating the call rewrites the same seeds until the next stage is
    /// generated, then fails with `AlreadyGenerated`. Advancing the last
    /// stage completes the pipeline.
    pub async fn advance_stage(
        &self,
        actor: &Actor,
        pipeline_id: PipelineId,
        stage_index: usize,
    ) -> EngineResult<AdvanceOutcome> {
        if !actor.is_operator() {
            return Err(EngineError::Forbidden {
                action: "advance pipelines",
            });
        }

        // Lock order: pipeline, then stages by id
        let mut pipeline = self.pipelines.lock_pipeline(pipeline_id).await?;
        let entry = pipeline.state().stage_at(stage_index)?.clone();
        let next_entry = pipeline.state().stages.get(stage_index + 1).cloned();

        let (current, next) = match &next_entry {
            Some(next_entry) => {
                let (current, next) = self.lock_pair(entry.stage_id, next_entry.stage_id).await?;
                (current, Some(next))
            }
            None => (self.stages.lock_stage(entry.stage_id).await?, None),
        };

        let finished = current.state();
        let open = finished.bracket()?.unfinished();
        if open > 0 {
            return Err(EngineError::StageIncomplete {
                entity: finished.entity(),
                open,
            });
        }
        let advancing = advancing_participants(finished, entry.advancement_rule)?;

        let mut outcome = AdvanceOutcome {
            pipeline_status: PipelineStatus::Completed,
            next_stage_id: None,
            advancing: advancing.clone(),
            generated: false,
        };

        if let (Some(mut next), Some(next_entry)) = (next, next_entry) {
            let target = next.state_mut();
            if target.is_generated() {
                return Err(EngineError::AlreadyGenerated {
                    entity: target.entity(),
                });
            }

            let entrants: Vec<Registrant> = advancing
                .iter()
                .enumerate()
                .map(|(idx, &id)| Registrant {
                    participant_id: id,
                    display_name: finished
                        .display_name(id)
                        .map_or_else(|| format!("#{id}"), str::to_string),
                    seed_number: Some(idx as u32 + 1),
                })
                .collect();

            target.save_seed_order(&advancing, &entrants)?;
            target.entrants = Some(entrants.clone());
            if next_entry.auto_generate {
                let mut shuffler = StageManager::shuffler_for(self.shuffle_seed, target.id());
                target.generate(&entrants, &mut shuffler, Utc::now())?;
                outcome.generated = true;
            }
            target.updated_at = Utc::now();
            outcome.next_stage_id = Some(target.id());
            next.commit().await?;
        }
        drop(current);

        let state = pipeline.state_mut();
        state.stages[stage_index].advanced = true;
        state.status = if outcome.next_stage_id.is_some() {
            PipelineStatus::Running
        } else {
            PipelineStatus::Completed
        };
        outcome.pipeline_status = state.status;
        pipeline.commit().await?;

        log::info!(
            "Pipeline {} advanced stage {} ({} advancing, status {:?})",
            pipeline_id,
            entry.stage_id,
            outcome.advancing.len(),
            outcome.pipeline_status
        );
        Ok(outcome)
    }

    pub async fn pipeline_view(&self, pipeline_id: PipelineId) -> EngineResult<PipelineView> {
        let pipeline = self
            .pipelines
            .pipeline(pipeline_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: EntityRef::pipeline(pipeline_id),
            })?;
        self.view(&pipeline).await
    }

    /// `GET pipelines(tournament_id)`
    pub async fn pipelines_view(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<PipelineView>> {
        let pipelines = self.pipelines.pipelines_for_tournament(tournament_id).await?;
        let mut views = Vec::with_capacity(pipelines.len());
        for pipeline in &pipelines {
            views.push(self.view(pipeline).await?);
        }
        Ok(views)
    }

    async fn view(&self, pipeline: &Pipeline) -> EngineResult<PipelineView> {
        let mut stages = Vec::with_capacity(pipeline.stages.len());
        for entry in &pipeline.stages {
            stages.push(self.stages.stage(entry.stage_id).await?);
        }
        Ok(PipelineView::build(pipeline, &stages))
    }
}
