//! Pipeline records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::models::{PipelineId, StageId, TournamentId};

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// No stage advanced yet
    Pending,
    Running,
    /// Last stage advanced
    Completed,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Pending => write!(f, "pending"),
            PipelineStatus::Running => write!(f, "running"),
            PipelineStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Who moves on from a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AdvancementRule {
    /// Top `count` of each group; elimination stages treat this as overall
    TopPerGroup { count: u32 },
    TopOverall { count: u32 },
}

impl AdvancementRule {
    pub fn count(&self) -> u32 {
        match self {
            AdvancementRule::TopPerGroup { count } | AdvancementRule::TopOverall { count } => {
                *count
            }
        }
    }
}

/// Stage entry in a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub stage_id: StageId,
    /// Applied when this stage advances into the next one
    pub advancement_rule: AdvancementRule,
    /// Generate the next stage as part of advancing
    #[serde(default)]
    pub auto_generate: bool,
    /// Advancing has seeded the next stage
    #[serde(default)]
    pub advanced: bool,
}

/// Stage entry as supplied when creating a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPipelineStage {
    pub stage_id: StageId,
    pub advancement_rule: AdvancementRule,
    #[serde(default)]
    pub auto_generate: bool,
}

/// Request to create a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPipeline {
    pub tournament_id: TournamentId,
    pub name: String,
    pub stages: Vec<NewPipelineStage>,
}

/// Pipeline aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub status: PipelineStatus,
    pub stages: Vec<PipelineStage>,
    pub created_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(id: PipelineId, request: NewPipeline, now: DateTime<Utc>) -> EngineResult<Self> {
        if request.name.trim().is_empty() {
            return Err(EngineError::invalid_input("pipeline name must not be empty"));
        }
        if request.stages.is_empty() {
            return Err(EngineError::invalid_input("pipeline needs at least one stage"));
        }
        for (idx, entry) in request.stages.iter().enumerate() {
            if request.stages[..idx]
                .iter()
                .any(|earlier| earlier.stage_id == entry.stage_id)
            {
                return Err(EngineError::invalid_input(format!(
                    "stage {} appears more than once",
                    entry.stage_id
                )));
            }
            if entry.advancement_rule.count() == 0 {
                return Err(EngineError::invalid_input(
                    "advancement count must be at least 1",
                ));
            }
        }

        Ok(Self {
            id,
            tournament_id: request.tournament_id,
            name: request.name,
            status: PipelineStatus::Pending,
            stages: request
                .stages
                .into_iter()
                .map(|entry| PipelineStage {
                    stage_id: entry.stage_id,
                    advancement_rule: entry.advancement_rule,
                    auto_generate: entry.auto_generate,
                    advanced: false,
                })
                .collect(),
            created_at: now,
        })
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::pipeline(self.id)
    }

    pub fn stage_at(&self, index: usize) -> EngineResult<&PipelineStage> {
        self.stages.get(index).ok_or_else(|| {
            EngineError::invalid_input(format!(
                "pipeline {} has no stage at index {index}",
                self.id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(stage_id: StageId) -> NewPipelineStage {
        NewPipelineStage {
            stage_id,
            advancement_rule: AdvancementRule::TopPerGroup { count: 2 },
            auto_generate: false,
        }
    }

    #[test]
    fn test_new_pipeline_is_pending() {
        let pipeline = Pipeline::new(
            1,
            NewPipeline {
                tournament_id: 5,
                name: "Groups to playoffs".to_string(),
                stages: vec![entry(10), entry(11)],
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(pipeline.status, PipelineStatus::Pending);
        assert_eq!(pipeline.stages.len(), 2);
        assert!(pipeline.stage_at(2).is_err());
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let result = Pipeline::new(
            1,
            NewPipeline {
                tournament_id: 5,
                name: "Loop".to_string(),
                stages: vec![entry(10), entry(10)],
            },
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rule_serde() {
        let rule: AdvancementRule =
            serde_json::from_str(r#"{"rule":"top_overall","count":4}"#).unwrap();
        assert_eq!(rule, AdvancementRule::TopOverall { count: 4 });
        assert_eq!(rule.count(), 4);
    }
}
