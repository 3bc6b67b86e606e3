//! Match state machine.
//!
//! ```text
//! scheduled -> live -> pending_result -> completed
//!     |          |            |             |
//!     |          |            +-> disputed <+
//!     |          |                   |
//!     +----------+--> forfeit        +-> completed (admin resolution)
//!     +----------+--> cancelled
//! ```
//!
//! Every transition validates the actor and the current state before touching
//! anything, so a rejected call leaves the bracket unchanged. Elimination
//! results propagate through the node arena; group results recompute the
//! group's standings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::propagation::decide_node;
use crate::bracket::{BracketState, MatchSlot, MatchState, ResultClaim, ResultReport};
use crate::errors::{EngineError, EngineResult, EntityRef};
use crate::groups::refresh_group;
use crate::models::{Actor, MatchId, NodeId, ParticipantId};

/// How a caller addresses a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "id", rename_all = "snake_case")]
pub enum MatchTarget {
    Match(MatchId),
    /// Through its bracket node; fails with `IncompleteNode` until both
    /// participants are known
    Node(NodeId),
}

/// Whether a transition changed anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    Applied,
    /// Repeat of an already applied action
    Unchanged,
}

impl BracketState {
    fn match_entity(&self, match_id: MatchId) -> EntityRef {
        EntityRef::Match {
            stage: self.stage_id(),
            id: match_id,
        }
    }

    /// Resolve a target to an existing match id
    pub fn resolve_target(&self, target: MatchTarget) -> EngineResult<MatchId> {
        match target {
            MatchTarget::Match(match_id) => {
                self.match_by_id(match_id)
                    .ok_or(EngineError::NotFound {
                        entity: self.match_entity(match_id),
                    })?;
                Ok(match_id)
            }
            MatchTarget::Node(node_id) => {
                let entity = EntityRef::Node {
                    stage: self.stage_id(),
                    id: node_id,
                };
                let node = self.node(node_id).ok_or(EngineError::NotFound { entity })?;
                if node.is_bye {
                    return Err(EngineError::invalid_state(entity, "node is a bye"));
                }
                node.match_id
                    .ok_or(EngineError::IncompleteNode { entity })
            }
        }
    }

    fn check_player(
        &self,
        actor: &Actor,
        match_id: MatchId,
        action: &'static str,
    ) -> EngineResult<()> {
        if actor.is_operator() {
            return Ok(());
        }
        let in_match = actor
            .participant_id()
            .zip(self.match_by_id(match_id))
            .is_some_and(|(id, m)| m.has_participant(id));
        if in_match {
            Ok(())
        } else {
            Err(EngineError::Forbidden { action })
        }
    }

    fn current_state(&self, match_id: MatchId) -> EngineResult<MatchState> {
        self.match_by_id(match_id)
            .map(|m| m.state)
            .ok_or(EngineError::NotFound {
                entity: self.match_entity(match_id),
            })
    }

    fn transition_error(&self, match_id: MatchId, from: MatchState, to: MatchState) -> EngineError {
        EngineError::InvalidTransition {
            entity: self.match_entity(match_id),
            from,
            to,
        }
    }

    /// Winner named by a report, checked against the scores
    fn resolve_winner(
        &self,
        match_id: MatchId,
        report: &ResultReport,
    ) -> EngineResult<Option<ParticipantId>> {
        let m = self.match_by_id(match_id).ok_or(EngineError::NotFound {
            entity: self.match_entity(match_id),
        })?;

        let by_score = match report.participant1_score.cmp(&report.participant2_score) {
            std::cmp::Ordering::Greater => Some(m.participant1_id),
            std::cmp::Ordering::Less => Some(m.participant2_id),
            std::cmp::Ordering::Equal => None,
        };

        let winner = match (report.winner_id, by_score) {
            (Some(claimed), _) if !m.has_participant(claimed) => {
                return Err(EngineError::invalid_input(format!(
                    "participant {claimed} is not in match {match_id}"
                )));
            }
            (Some(claimed), Some(scored)) if claimed != scored => {
                return Err(EngineError::invalid_input(format!(
                    "claimed winner {claimed} contradicts the reported scores"
                )));
            }
            (Some(claimed), _) => Some(claimed),
            (None, scored) => scored,
        };

        if winner.is_none() && matches!(m.slot, MatchSlot::Node { .. }) {
            return Err(EngineError::invalid_input(
                "elimination matches cannot end in a draw",
            ));
        }
        Ok(winner)
    }

    /// Write a final result into the match and propagate it
    fn complete_with(
        &mut self,
        match_id: MatchId,
        state: MatchState,
        scores: Option<(u32, u32)>,
        winner: Option<ParticipantId>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let slot = self
            .match_by_id(match_id)
            .map(|m| m.slot)
            .ok_or(EngineError::NotFound {
                entity: self.match_entity(match_id),
            })?;

        // Node decision first: it is the only step that can still fail
        if let (MatchSlot::Node { node_id }, Some(winner)) = (slot, winner) {
            decide_node(self, node_id, winner, now)?;
        }

        let m = &mut self.matches[match_id as usize];
        if let Some((s1, s2)) = scores {
            m.participant1_score = Some(s1);
            m.participant2_score = Some(s2);
        }
        m.winner_id = winner;
        m.state = state;
        m.completed_at = Some(now);

        if let MatchSlot::Group { group_id, .. } = slot {
            refresh_group(self, group_id);
        }
        Ok(())
    }

    /// `scheduled -> live`
    pub fn start_match(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        let match_id = self.resolve_target(target)?;
        self.check_player(actor, match_id, "start this match")?;

        match self.current_state(match_id)? {
            MatchState::Scheduled => {
                let m = &mut self.matches[match_id as usize];
                m.state = MatchState::Live;
                m.started_at = Some(now);
                Ok(TransitionOutcome::Applied)
            }
            MatchState::Live => Ok(TransitionOutcome::Unchanged),
            from => Err(self.transition_error(match_id, from, MatchState::Live)),
        }
    }

    /// `scheduled | live -> pending_result`: a claim awaiting confirmation
    pub fn report_result(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        report: ResultReport,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        let match_id = self.resolve_target(target)?;
        self.check_player(actor, match_id, "report on this match")?;
        let winner = self.resolve_winner(match_id, &report)?;

        let m = &self.matches[match_id as usize];
        match m.state {
            MatchState::Scheduled | MatchState::Live => {}
            MatchState::PendingResult
                if m.claim.as_ref().is_some_and(|claim| same_result(&claim.report, &report)) =>
            {
                return Ok(TransitionOutcome::Unchanged);
            }
            MatchState::Completed if recorded_as(m, &report, winner) => {
                return Ok(TransitionOutcome::Unchanged);
            }
            from => return Err(self.transition_error(match_id, from, MatchState::PendingResult)),
        }

        let m = &mut self.matches[match_id as usize];
        m.state = MatchState::PendingResult;
        m.claim = Some(ResultClaim {
            reported_by: *actor,
            report: ResultReport {
                winner_id: winner,
                ..report
            },
            reported_at: now,
        });
        Ok(TransitionOutcome::Applied)
    }

    /// `pending_result -> completed`, by the opponent of the reporter or an operator
    pub fn confirm_result(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        let match_id = self.resolve_target(target)?;
        self.check_player(actor, match_id, "confirm this match")?;

        let m = &self.matches[match_id as usize];
        let claim = match (m.state, &m.claim) {
            (MatchState::PendingResult, Some(claim)) => claim.clone(),
            (MatchState::Completed, _) => return Ok(TransitionOutcome::Unchanged),
            (from, _) => return Err(self.transition_error(match_id, from, MatchState::Completed)),
        };

        if let (Some(confirmer), Some(reporter)) =
            (actor.participant_id(), claim.reported_by.participant_id())
        {
            if confirmer == reporter {
                return Err(EngineError::Forbidden {
                    action: "confirm your own report",
                });
            }
        }

        let report = claim.report;
        self.complete_with(
            match_id,
            MatchState::Completed,
            Some((report.participant1_score, report.participant2_score)),
            report.winner_id,
            now,
        )?;
        Ok(TransitionOutcome::Applied)
    }

    /// Operator records a final result directly
    pub fn record_result(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        report: ResultReport,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        if !actor.is_operator() {
            return Err(EngineError::Forbidden {
                action: "record results",
            });
        }
        let match_id = self.resolve_target(target)?;
        let winner = self.resolve_winner(match_id, &report)?;

        let m = &self.matches[match_id as usize];
        match m.state {
            MatchState::Scheduled | MatchState::Live | MatchState::PendingResult => {}
            MatchState::Completed if recorded_as(m, &report, winner) => {
                return Ok(TransitionOutcome::Unchanged);
            }
            from => return Err(self.transition_error(match_id, from, MatchState::Completed)),
        }

        self.complete_with(
            match_id,
            MatchState::Completed,
            Some((report.participant1_score, report.participant2_score)),
            winner,
            now,
        )?;
        Ok(TransitionOutcome::Applied)
    }

    /// `pending_result | completed -> disputed`
    ///
    /// A winner already propagated stays where it is; only an admin
    /// resolution or a full reset changes the outcome.
    pub fn dispute(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        reason: impl Into<String>,
    ) -> EngineResult<TransitionOutcome> {
        let match_id = self.resolve_target(target)?;
        self.check_player(actor, match_id, "dispute this match")?;

        let slot = match self.current_state(match_id)? {
            MatchState::PendingResult | MatchState::Completed => {
                let m = &mut self.matches[match_id as usize];
                m.state = MatchState::Disputed;
                m.dispute_reason = Some(reason.into());
                m.slot
            }
            MatchState::Disputed => return Ok(TransitionOutcome::Unchanged),
            from => return Err(self.transition_error(match_id, from, MatchState::Disputed)),
        };

        if let MatchSlot::Group { group_id, .. } = slot {
            refresh_group(self, group_id);
        }
        Ok(TransitionOutcome::Applied)
    }

    /// `disputed -> completed` with the result an admin settled on
    pub fn resolve_dispute(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        report: ResultReport,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden {
                action: "resolve disputes",
            });
        }
        let match_id = self.resolve_target(target)?;
        let winner = self.resolve_winner(match_id, &report)?;

        let from = self.current_state(match_id)?;
        if from != MatchState::Disputed {
            return Err(self.transition_error(match_id, from, MatchState::Completed));
        }

        if let Some(node_id) = self.matches[match_id as usize].node_id() {
            let decided = self.node(node_id).and_then(|node| node.winner_id);
            if decided.is_some_and(|existing| Some(existing) != winner) {
                return Err(EngineError::invalid_state(
                    EntityRef::Node {
                        stage: self.stage_id(),
                        id: node_id,
                    },
                    "winner already propagated; a reset is required to change it",
                ));
            }
        }

        self.complete_with(
            match_id,
            MatchState::Completed,
            Some((report.participant1_score, report.participant2_score)),
            winner,
            now,
        )?;
        self.matches[match_id as usize].dispute_reason = None;
        Ok(TransitionOutcome::Applied)
    }

    /// `-> forfeit`: the other participant wins
    pub fn forfeit(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        forfeiting: ParticipantId,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        let match_id = self.resolve_target(target)?;
        if let Some(id) = actor.participant_id() {
            if id != forfeiting {
                return Err(EngineError::Forbidden {
                    action: "forfeit for another participant",
                });
            }
        }
        self.check_player(actor, match_id, "forfeit this match")?;

        let m = &self.matches[match_id as usize];
        let Some(winner) = m.opponent_of(forfeiting) else {
            return Err(EngineError::invalid_input(format!(
                "participant {forfeiting} is not in match {match_id}"
            )));
        };
        match m.state {
            MatchState::Scheduled | MatchState::Live | MatchState::PendingResult => {}
            MatchState::Forfeit if m.forfeited_by == Some(forfeiting) => {
                return Ok(TransitionOutcome::Unchanged);
            }
            from => return Err(self.transition_error(match_id, from, MatchState::Forfeit)),
        }

        self.complete_with(match_id, MatchState::Forfeit, None, Some(winner), now)?;
        self.matches[match_id as usize].forfeited_by = Some(forfeiting);
        Ok(TransitionOutcome::Applied)
    }

    /// `-> cancelled`: the node becomes void until an admin assigns an outcome
    pub fn cancel(
        &mut self,
        actor: &Actor,
        target: MatchTarget,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        if !actor.is_operator() {
            return Err(EngineError::Forbidden {
                action: "cancel matches",
            });
        }
        let match_id = self.resolve_target(target)?;

        let m = &self.matches[match_id as usize];
        match m.state {
            MatchState::Scheduled
            | MatchState::Live
            | MatchState::PendingResult
            | MatchState::Disputed => {}
            MatchState::Cancelled => return Ok(TransitionOutcome::Unchanged),
            from => return Err(self.transition_error(match_id, from, MatchState::Cancelled)),
        }

        let slot = m.slot;
        if let MatchSlot::Node { node_id } = slot {
            if self.node(node_id).is_some_and(|node| node.winner_id.is_some()) {
                return Err(EngineError::invalid_state(
                    EntityRef::Node {
                        stage: self.stage_id(),
                        id: node_id,
                    },
                    "winner already propagated; a reset is required to cancel",
                ));
            }
            self.nodes[node_id as usize].is_void = true;
        }

        let m = &mut self.matches[match_id as usize];
        m.state = MatchState::Cancelled;
        m.completed_at = Some(now);

        if let MatchSlot::Group { group_id, .. } = slot {
            refresh_group(self, group_id);
        }
        Ok(TransitionOutcome::Applied)
    }

    /// Admin picks the winner of a void node, which then propagates
    pub fn assign_outcome(
        &mut self,
        actor: &Actor,
        node_id: NodeId,
        winner: ParticipantId,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden {
                action: "assign outcomes",
            });
        }
        let entity = EntityRef::Node {
            stage: self.stage_id(),
            id: node_id,
        };
        let node = self.node(node_id).ok_or(EngineError::NotFound { entity })?;

        if node.winner_id == Some(winner) {
            return Ok(TransitionOutcome::Unchanged);
        }
        if !node.is_void {
            return Err(EngineError::invalid_state(
                entity,
                "only nodes with a cancelled match take an assigned outcome",
            ));
        }

        if decide_node(self, node_id, winner, now)? {
            Ok(TransitionOutcome::Applied)
        } else {
            Ok(TransitionOutcome::Unchanged)
        }
    }
}

fn same_result(a: &ResultReport, b: &ResultReport) -> bool {
    a.participant1_score == b.participant1_score
        && a.participant2_score == b.participant2_score
        && (b.winner_id.is_none() || a.winner_id == b.winner_id)
}

fn recorded_as(
    m: &crate::bracket::Match,
    report: &ResultReport,
    winner: Option<ParticipantId>,
) -> bool {
    m.participant1_score == Some(report.participant1_score)
        && m.participant2_score == Some(report.participant2_score)
        && m.winner_id == winner
}
