//! # Bracket Engine
//!
//! Tournament bracket generation and progression for competition stages.
//!
//! A stage is generated once from its finalized participants and seeds, then
//! advanced one match result at a time. Every winner (and, in double
//! elimination, every loser) is copied into the slot that references it, byes
//! resolve on their own, and round robin standings are recomputed whole after
//! each result. Pipelines chain stages so that the top finishers of one stage
//! seed the next.
//!
//! ## Formats
//!
//! - **Single elimination**: power-of-two slots, top seeds receive the byes
//! - **Double elimination**: winners and losers sides plus a grand final with
//!   a reset match played only when the losers side champion wins
//! - **Round robin**: snake-drawn groups with a circle-method schedule
//!
//! ## Core Modules
//!
//! - [`bracket`]: bracket records, layout and the generators
//! - [`progression`]: match state machine and result propagation
//! - [`groups`]: group draw, schedule and standings
//! - [`stage`]: the stage aggregate, [`StageManager`] and read views
//! - [`pipeline`]: multi-stage pipelines and [`PipelineOrchestrator`]
//! - [`db`]: PostgreSQL and in-memory aggregate storage
//!
//! ## Example
//!
//! ```
//! use bracket_engine::bracket::{GenerateBracket, GenerationInput, Generator};
//! use bracket_engine::bracket::{BracketFormat, SeedingMethod};
//!
//! let generator = Generator::for_format(BracketFormat::SingleElimination, None);
//! let state = generator
//!     .generate(&GenerationInput {
//!         stage_id: 1,
//!         seeding_method: SeedingMethod::Manual,
//!         seeds: &[10, 20, 30, 40, 50],
//!         now: chrono::Utc::now(),
//!     })
//!     .unwrap();
//!
//! // Seeds 1-3 advance on byes: 4 vs 5 and 2 vs 3 are playable
//! assert_eq!(state.open_matches(), 2);
//! ```

/// Bracket records, layout and generation.
pub mod bracket;

/// Aggregate storage.
pub mod db;

pub mod errors;

/// Round robin groups and standings.
pub mod groups;

pub mod models;

/// Stage pipelines.
pub mod pipeline;

/// Match state machine and propagation.
pub mod progression;

pub mod registration;

pub mod seeding;

/// Stage aggregate, manager and views.
pub mod stage;

pub use errors::{EngineError, EngineResult, EntityRef, ErrorKind};
pub use models::{Actor, ParticipantId, PipelineId, StageId, TournamentId};
pub use pipeline::PipelineOrchestrator;
pub use progression::{MatchTarget, TransitionOutcome};
pub use registration::{ParticipantSource, PgParticipantSource, Registrant, StaticRoster};
pub use stage::StageManager;
