//! Seed registry for a competition stage.
//!
//! Seeds are a dense 1..N ranking of participants. The registry is edited
//! freely until the owning bracket is published; the bracket generator reads
//! it only at generation time, so later edits take effect after a reset and
//! regenerate.
//!
//! ## Example
//!
//! ```
//! use bracket_engine::seeding::SeedRegistry;
//!
//! let mut seeds = SeedRegistry::new();
//! seeds.set_seed_order(&[30, 10, 20]).unwrap();
//! seeds.reorder(2, 0).unwrap();
//!
//! assert_eq!(seeds.ordered_ids(), vec![20, 30, 10]);
//! assert_eq!(seeds.seed_of(10), Some(3));
//! ```

pub mod registry;
pub mod shuffler;

pub use registry::{Seed, SeedRegistry};
pub use shuffler::SeedShuffler;
