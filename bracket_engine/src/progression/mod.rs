//! Progression engine: the match state machine and result propagation.

pub mod propagation;
pub mod state_machine;

pub use state_machine::{MatchTarget, TransitionOutcome};
