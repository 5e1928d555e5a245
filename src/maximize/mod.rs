//! Maximize/restore state machine.
//!
//! Maximizing snapshots every item, hides all but the target, and stretches
//! the target over the whole grid. Restoring writes the snapshots back.

mod core;

pub use self::core::{GridMode, ItemState, MaximizeSession};
