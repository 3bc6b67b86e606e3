//! Round robin groups: draw, schedule and standings.

pub mod draw;
pub mod models;
pub mod schedule;
pub mod standings;

pub use draw::{group_name, snake_draw};
pub use models::{Group, GroupConfig, PointScheme, Standing};
pub use schedule::circle_schedule;
pub(crate) use standings::refresh_group;
pub use standings::{compute_standings, rank_across_groups};
