//! Finalized participant lists supplied by the registration subsystem.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::EngineResult;
use crate::models::{ParticipantId, StageId};

/// A finalized registrant for a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    pub participant_id: ParticipantId,
    pub display_name: String,
    /// Seed proposed by registration, if any
    pub seed_number: Option<u32>,
}

impl Registrant {
    pub fn new(participant_id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            participant_id,
            display_name: display_name.into(),
            seed_number: None,
        }
    }

    pub fn with_seed(mut self, seed_number: u32) -> Self {
        self.seed_number = Some(seed_number);
        self
    }
}

/// Source of finalized participants
#[async_trait]
pub trait ParticipantSource: Send + Sync {
    /// Finalized registrants of a stage, in registration order
    async fn finalized_participants(&self, stage_id: StageId) -> EngineResult<Vec<Registrant>>;
}

/// Registrants ordered by proposed seed, unseeded ones after in list order
pub fn registration_order(registrants: &[Registrant]) -> Vec<ParticipantId> {
    let mut indexed: Vec<(usize, &Registrant)> = registrants.iter().enumerate().collect();
    indexed.sort_by_key(|(idx, registrant)| (registrant.seed_number.unwrap_or(u32::MAX), *idx));
    indexed
        .into_iter()
        .map(|(_, registrant)| registrant.participant_id)
        .collect()
}

/// In-memory roster, filled by the caller
#[derive(Clone, Default)]
pub struct StaticRoster {
    rosters: Arc<RwLock<HashMap<StageId, Vec<Registrant>>>>,
}

impl StaticRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the finalized roster of a stage
    pub async fn set_roster(&self, stage_id: StageId, registrants: Vec<Registrant>) {
        log::debug!(
            "Roster for stage {} set to {} registrants",
            stage_id,
            registrants.len()
        );
        self.rosters.write().await.insert(stage_id, registrants);
    }
}

#[async_trait]
impl ParticipantSource for StaticRoster {
    async fn finalized_participants(&self, stage_id: StageId) -> EngineResult<Vec<Registrant>> {
        Ok(self
            .rosters
            .read()
            .await
            .get(&stage_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Roster read from the `stage_registrations` table
pub struct PgParticipantSource {
    pool: PgPool,
}

impl PgParticipantSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantSource for PgParticipantSource {
    async fn finalized_participants(&self, stage_id: StageId) -> EngineResult<Vec<Registrant>> {
        let rows = sqlx::query(
            "SELECT participant_id, display_name, seed_number
             FROM stage_registrations
             WHERE stage_id = $1 AND status = 'finalized'
             ORDER BY registered_at, participant_id",
        )
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Registrant {
                participant_id: r.get("participant_id"),
                display_name: r.get("display_name"),
                seed_number: r
                    .get::<Option<i32>, _>("seed_number")
                    .and_then(|seed| u32::try_from(seed).ok()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let registrants = vec![
            Registrant::new(10, "Ten"),
            Registrant::new(20, "Twenty").with_seed(2),
            Registrant::new(30, "Thirty").with_seed(1),
            Registrant::new(40, "Forty"),
        ];
        assert_eq!(registration_order(&registrants), vec![30, 20, 10, 40]);
    }

    #[tokio::test]
    async fn test_static_roster() {
        let roster = StaticRoster::new();
        assert!(roster.finalized_participants(1).await.unwrap().is_empty());

        roster
            .set_roster(1, vec![Registrant::new(5, "Five"), Registrant::new(6, "Six")])
            .await;
        let registrants = roster.finalized_participants(1).await.unwrap();
        assert_eq!(registrants.len(), 2);
        assert!(roster.finalized_participants(2).await.unwrap().is_empty());
    }
}
