//! Error module orchestrator.

mod types;

pub use types::{DispatchError, GridError, Result, TrackAxis};
