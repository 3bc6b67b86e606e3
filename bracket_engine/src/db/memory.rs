//! In-memory repositories for development servers and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::repository::{
    AggregateGuard, PipelineGuard, PipelineRepository, StageGuard, StageRepository,
};
use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::models::{PipelineId, StageId, TournamentId};
use crate::pipeline::{NewPipeline, Pipeline};
use crate::stage::{NewStage, StageState};

/// Committed snapshots plus one write lock per aggregate
struct Store<T> {
    committed: RwLock<HashMap<i64, T>>,
    locks: RwLock<HashMap<i64, Arc<Mutex<()>>>>,
    next_id: RwLock<i64>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    fn new() -> Self {
        Self {
            committed: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
            next_id: RwLock::new(1),
        }
    }

    async fn allocate_id(&self) -> i64 {
        let mut next_id = self.next_id.write().await;
        let id = *next_id;
        *next_id += 1;
        id
    }

    async fn get(&self, id: i64) -> Option<T> {
        self.committed.read().await.get(&id).cloned()
    }

    async fn lock(self: &Arc<Self>, id: i64) -> Option<MemoryGuard<T>> {
        let lock = {
            let mut locks = self.locks.write().await;
            locks.entry(id).or_default().clone()
        };
        let held = lock.lock_owned().await;

        // Read after acquiring so the copy reflects the last commit
        let working = self.get(id).await?;
        Some(MemoryGuard {
            _held: held,
            id,
            working,
            store: Arc::clone(self),
        })
    }
}

struct MemoryGuard<T> {
    _held: OwnedMutexGuard<()>,
    id: i64,
    working: T,
    store: Arc<Store<T>>,
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> AggregateGuard<T> for MemoryGuard<T> {
    fn state(&self) -> &T {
        &self.working
    }

    fn state_mut(&mut self) -> &mut T {
        &mut self.working
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let MemoryGuard {
            _held,
            id,
            working,
            store,
        } = *self;
        store.committed.write().await.insert(id, working);
        Ok(())
    }
}

/// In-memory implementation of both repositories
#[derive(Clone)]
pub struct MemoryRepository {
    stages: Arc<Store<StageState>>,
    pipelines: Arc<Store<Pipeline>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            stages: Arc::new(Store::new()),
            pipelines: Arc::new(Store::new()),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageRepository for MemoryRepository {
    async fn insert_stage(
        &self,
        request: NewStage,
        now: DateTime<Utc>,
    ) -> EngineResult<StageState> {
        let id = self.stages.allocate_id().await;
        let stage = StageState::new(id, request, now)?;
        self.stages
            .committed
            .write()
            .await
            .insert(id, stage.clone());
        Ok(stage)
    }

    async fn stage(&self, stage_id: StageId) -> EngineResult<Option<StageState>> {
        Ok(self.stages.get(stage_id).await)
    }

    async fn stages_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<StageState>> {
        let mut stages: Vec<StageState> = self
            .stages
            .committed
            .read()
            .await
            .values()
            .filter(|stage| stage.config.tournament_id == tournament_id)
            .cloned()
            .collect();
        stages.sort_by_key(StageState::id);
        Ok(stages)
    }

    async fn lock_stage(&self, stage_id: StageId) -> EngineResult<StageGuard> {
        let guard = self
            .stages
            .lock(stage_id)
            .await
            .ok_or(EngineError::NotFound {
                entity: EntityRef::stage(stage_id),
            })?;
        Ok(Box::new(guard))
    }
}

#[async_trait]
impl PipelineRepository for MemoryRepository {
    async fn insert_pipeline(
        &self,
        request: NewPipeline,
        now: DateTime<Utc>,
    ) -> EngineResult<Pipeline> {
        let id = self.pipelines.allocate_id().await;
        let pipeline = Pipeline::new(id, request, now)?;
        self.pipelines
            .committed
            .write()
            .await
            .insert(id, pipeline.clone());
        Ok(pipeline)
    }

    async fn pipeline(&self, pipeline_id: PipelineId) -> EngineResult<Option<Pipeline>> {
        Ok(self.pipelines.get(pipeline_id).await)
    }

    async fn pipelines_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<Pipeline>> {
        let mut pipelines: Vec<Pipeline> = self
            .pipelines
            .committed
            .read()
            .await
            .values()
            .filter(|pipeline| pipeline.tournament_id == tournament_id)
            .cloned()
            .collect();
        pipelines.sort_by_key(|pipeline| pipeline.id);
        Ok(pipelines)
    }

    async fn lock_pipeline(&self, pipeline_id: PipelineId) -> EngineResult<PipelineGuard> {
        let guard = self
            .pipelines
            .lock(pipeline_id)
            .await
            .ok_or(EngineError::NotFound {
                entity: EntityRef::pipeline(pipeline_id),
            })?;
        Ok(Box::new(guard))
    }

    async fn delete_pipeline(&self, pipeline_id: PipelineId) -> EngineResult<bool> {
        // Wait for in-flight writers so a commit cannot resurrect the pipeline
        let Some(guard) = self.pipelines.lock(pipeline_id).await else {
            return Ok(false);
        };
        let removed = self
            .pipelines
            .committed
            .write()
            .await
            .remove(&pipeline_id)
            .is_some();
        drop(guard);
        self.pipelines.locks.write().await.remove(&pipeline_id);
        Ok(removed)
    }
}
