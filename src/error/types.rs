use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::layout::ItemId;

/// Unified result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Which track list an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackAxis {
    Column,
    Row,
}

impl fmt::Display for TrackAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackAxis::Column => f.write_str("column"),
            TrackAxis::Row => f.write_str("row"),
        }
    }
}

/// Usage errors reported synchronously by the grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid is full: all {rows} row(s) are occupied")]
    GridFull { rows: usize },
    #[error("span of {width} column(s) at column {column} does not fit {columns} column(s)")]
    InvalidSpan {
        column: usize,
        width: usize,
        columns: usize,
    },
    #[error("region of {width} x {height} tracks is empty")]
    EmptySpan { width: usize, height: usize },
    #[error("grid cells are already defined ({columns} x {rows})")]
    DoubleInitialization { columns: usize, rows: usize },
    #[error(
        "region at column {column}, row {row} spanning {width} x {height} exceeds {columns} x {rows} grid"
    )]
    OutOfBounds {
        column: usize,
        row: usize,
        width: usize,
        height: usize,
        columns: usize,
        rows: usize,
    },
    #[error("{axis} track {index} out of range (count {count})")]
    TrackOutOfRange {
        axis: TrackAxis,
        index: usize,
        count: usize,
    },
    #[error("item {0} is not placed in this grid")]
    UnknownItem(ItemId),
    #[error("grid state poisoned")]
    Poisoned,
}

/// Failure to defer a task or hand it to the owner thread.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("owner queue disconnected")]
    Disconnected,
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(String),
}
