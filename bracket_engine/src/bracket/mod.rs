//! Bracket records and generation.
//!
//! A generated stage is a [`BracketState`]: the bracket record, a flat arena
//! of [`BracketNode`]s addressed by `(side, round, position)`, the matches
//! created so far, and (for round robin) the groups.

pub mod generator;
pub mod models;
pub mod placement;
pub mod results;

pub use generator::{
    DoubleElimination, GenerateBracket, GenerationInput, Generator, RoundRobin, SingleElimination,
};
pub use models::{
    Bracket, BracketFormat, BracketNode, BracketSide, BracketState, Match, MatchSlot, MatchState,
    ResultClaim, ResultReport, SeedingMethod, SlotSource,
};
pub use results::Placement;
