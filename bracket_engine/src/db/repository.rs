//! Repository traits for stage and pipeline aggregates.
//!
//! Reads return the latest committed snapshot without locking. Writes go
//! through `lock_*`, which hands out an exclusive working copy; the copy
//! becomes visible only on [`AggregateGuard::commit`] and dropping the guard
//! discards it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::marker::PhantomData;

use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::models::{PipelineId, StageId, TournamentId};
use crate::pipeline::{NewPipeline, Pipeline};
use crate::stage::{NewStage, StageState};

/// Exclusive working copy of an aggregate
#[async_trait]
pub trait AggregateGuard<T>: Send {
    fn state(&self) -> &T;

    fn state_mut(&mut self) -> &mut T;

    /// Publish the working copy and release the lock
    async fn commit(self: Box<Self>) -> EngineResult<()>;
}

pub type StageGuard = Box<dyn AggregateGuard<StageState>>;
pub type PipelineGuard = Box<dyn AggregateGuard<Pipeline>>;

/// Trait for stage storage
#[async_trait]
pub trait StageRepository: Send + Sync {
    /// Allocate an id and store a new stage
    async fn insert_stage(
        &self,
        request: NewStage,
        now: DateTime<Utc>,
    ) -> EngineResult<StageState>;

    /// Latest committed snapshot
    async fn stage(&self, stage_id: StageId) -> EngineResult<Option<StageState>>;

    async fn stages_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<StageState>>;

    /// Take the stage's write lock; `NotFound` if it does not exist
    async fn lock_stage(&self, stage_id: StageId) -> EngineResult<StageGuard>;
}

/// Trait for pipeline storage
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn insert_pipeline(
        &self,
        request: NewPipeline,
        now: DateTime<Utc>,
    ) -> EngineResult<Pipeline>;

    async fn pipeline(&self, pipeline_id: PipelineId) -> EngineResult<Option<Pipeline>>;

    async fn pipelines_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<Pipeline>>;

    async fn lock_pipeline(&self, pipeline_id: PipelineId) -> EngineResult<PipelineGuard>;

    /// Remove a pipeline; stages are left untouched. Returns whether it existed.
    async fn delete_pipeline(&self, pipeline_id: PipelineId) -> EngineResult<bool>;
}

/// Table holding one kind of aggregate as JSONB
trait AggregateTable {
    const LOCK_SQL: &'static str;
    const UPDATE_SQL: &'static str;

    fn entity(id: i64) -> EntityRef;
}

struct StagesTable;

impl AggregateTable for StagesTable {
    const LOCK_SQL: &'static str = "SELECT state FROM stages WHERE id = $1 FOR UPDATE";
    const UPDATE_SQL: &'static str =
        "UPDATE stages SET state = $1, updated_at = NOW() WHERE id = $2";

    fn entity(id: i64) -> EntityRef {
        EntityRef::stage(id)
    }
}

struct PipelinesTable;

impl AggregateTable for PipelinesTable {
    const LOCK_SQL: &'static str = "SELECT state FROM pipelines WHERE id = $1 FOR UPDATE";
    const UPDATE_SQL: &'static str =
        "UPDATE pipelines SET state = $1, updated_at = NOW() WHERE id = $2";

    fn entity(id: i64) -> EntityRef {
        EntityRef::pipeline(id)
    }
}

/// Working copy backed by an open transaction holding the row lock
struct PgGuard<T, A> {
    tx: Transaction<'static, Postgres>,
    id: i64,
    working: T,
    table: PhantomData<A>,
}

#[async_trait]
impl<T, A> AggregateGuard<T> for PgGuard<T, A>
where
    T: Serialize + Send + Sync + 'static,
    A: AggregateTable + Send + Sync + 'static,
{
    fn state(&self) -> &T {
        &self.working
    }

    fn state_mut(&mut self) -> &mut T {
        &mut self.working
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let PgGuard {
            mut tx, id, working, ..
        } = *self;
        let state = serde_json::to_value(&working)?;

        sqlx::query(A::UPDATE_SQL)
            .bind(state)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn lock_row<T, A>(pool: &PgPool, id: i64) -> EngineResult<PgGuard<T, A>>
where
    T: DeserializeOwned,
    A: AggregateTable,
{
    let mut tx = pool.begin().await?;
    let row = sqlx::query(A::LOCK_SQL)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(EngineError::NotFound {
            entity: A::entity(id),
        })?;

    let working = serde_json::from_value(row.get::<serde_json::Value, _>("state"))?;
    Ok(PgGuard {
        tx,
        id,
        working,
        table: PhantomData,
    })
}

/// Default PostgreSQL implementation of both repositories
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StageRepository for PgRepository {
    async fn insert_stage(
        &self,
        request: NewStage,
        now: DateTime<Utc>,
    ) -> EngineResult<StageState> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO stages (tournament_id, state) VALUES ($1, '{}'::jsonb) RETURNING id",
        )
        .bind(request.tournament_id)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.get("id");

        // Dropping the transaction rolls the placeholder row back on error
        let stage = StageState::new(id, request, now)?;
        sqlx::query(StagesTable::UPDATE_SQL)
            .bind(serde_json::to_value(&stage)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stage)
    }

    async fn stage(&self, stage_id: StageId) -> EngineResult<Option<StageState>> {
        let row = sqlx::query("SELECT state FROM stages WHERE id = $1")
            .bind(stage_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| serde_json::from_value(r.get::<serde_json::Value, _>("state")))
            .transpose()
            .map_err(EngineError::from)
    }

    async fn stages_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<StageState>> {
        let rows = sqlx::query("SELECT state FROM stages WHERE tournament_id = $1 ORDER BY id")
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| {
                serde_json::from_value(r.get::<serde_json::Value, _>("state"))
                    .map_err(EngineError::from)
            })
            .collect()
    }

    async fn lock_stage(&self, stage_id: StageId) -> EngineResult<StageGuard> {
        let guard: PgGuard<StageState, StagesTable> = lock_row(&self.pool, stage_id).await?;
        Ok(Box::new(guard))
    }
}

#[async_trait]
impl PipelineRepository for PgRepository {
    async fn insert_pipeline(
        &self,
        request: NewPipeline,
        now: DateTime<Utc>,
    ) -> EngineResult<Pipeline> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO pipelines (tournament_id, state) VALUES ($1, '{}'::jsonb) RETURNING id",
        )
        .bind(request.tournament_id)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.get("id");

        let pipeline = Pipeline::new(id, request, now)?;
        sqlx::query(PipelinesTable::UPDATE_SQL)
            .bind(serde_json::to_value(&pipeline)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(pipeline)
    }

    async fn pipeline(&self, pipeline_id: PipelineId) -> EngineResult<Option<Pipeline>> {
        let row = sqlx::query("SELECT state FROM pipelines WHERE id = $1")
            .bind(pipeline_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| serde_json::from_value(r.get::<serde_json::Value, _>("state")))
            .transpose()
            .map_err(EngineError::from)
    }

    async fn pipelines_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<Pipeline>> {
        let rows =
            sqlx::query("SELECT state FROM pipelines WHERE tournament_id = $1 ORDER BY id")
                .bind(tournament_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|r| {
                serde_json::from_value(r.get::<serde_json::Value, _>("state"))
                    .map_err(EngineError::from)
            })
            .collect()
    }

    async fn lock_pipeline(&self, pipeline_id: PipelineId) -> EngineResult<PipelineGuard> {
        let guard: PgGuard<Pipeline, PipelinesTable> = lock_row(&self.pool, pipeline_id).await?;
        Ok(Box::new(guard))
    }

    async fn delete_pipeline(&self, pipeline_id: PipelineId) -> EngineResult<bool> {
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
