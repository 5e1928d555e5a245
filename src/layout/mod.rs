//! Layout module orchestrator.
//!
//! Downstream code imports grid types from here while the placement logic
//! lives in the private `core` module and track definitions in `grid`.

mod core;
pub mod grid;

pub use self::core::{CellGrid, Cursor, ItemId, PlacedItem, Placement, SharedGrid};
pub use grid::{GridSize, GridTracks, SizingMode};
