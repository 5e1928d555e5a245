//! Track definitions for the cell grid.
//!
//! A grid is described by two ordered track lists, one for columns and one
//! for rows. Each track carries a [`GridSize`] that tells the host how to
//! size it:
//! - `Flex(n)`: proportional share of the free space (star sizing)
//! - `Fixed(n)`: absolute size in host units
//! - `Auto`: fit to content
//!
//! Tracks are created once, in index order, by [`GridTracks::define`].
//!
//! # Example
//! ```
//! use autogrid::layout::grid::{GridSize, GridTracks, SizingMode};
//! use autogrid::TrackAxis;
//!
//! let mut tracks = GridTracks::new();
//! tracks.define(3, 2)?;
//! assert_eq!(tracks.column_count(), 3);
//! assert_eq!(tracks.get(TrackAxis::Row, 1), Some(GridSize::flex(1)));
//!
//! tracks.set(TrackAxis::Column, 0, SizingMode::Fixed.unit())?;
//! assert_eq!(tracks.columns()[0], GridSize::Fixed(1));
//! # Ok::<(), autogrid::GridError>(())
//! ```

use std::num::NonZeroU16;

use serde::Serialize;

use crate::error::{GridError, Result, TrackAxis};

/// Defines how a column or row should be sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum GridSize {
    /// Fixed size in host units
    Fixed(u16),

    /// Flexible size (proportional units, like CSS 'fr')
    /// Flex(2) takes 2x the space of Flex(1)
    /// Must be non-zero - zero would create a track that absorbs no space
    Flex(NonZeroU16),

    /// Sized to fit the content placed in the track
    Auto,
}

impl GridSize {
    /// Create Flex variant
    ///
    /// # Panics
    /// Panics if n is zero
    pub fn flex(n: u16) -> Self {
        Self::Flex(NonZeroU16::new(n).expect("Flex size must be non-zero"))
    }

    pub fn is_flex(&self) -> bool {
        matches!(self, GridSize::Flex(_))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize::Flex(NonZeroU16::MIN)
    }
}

/// Sizing mode applied by `format_cell`, always with a unit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    Proportional,
    Fixed,
    ContentFit,
}

impl SizingMode {
    pub fn unit(self) -> GridSize {
        match self {
            SizingMode::Proportional => GridSize::Flex(NonZeroU16::MIN),
            SizingMode::Fixed => GridSize::Fixed(1),
            SizingMode::ContentFit => GridSize::Auto,
        }
    }
}

/// Ordered column and row tracks of one grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridTracks {
    columns: Vec<GridSize>,
    rows: Vec<GridSize>,
    defined: bool,
}

impl GridTracks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `column_count` column tracks and `row_count` row tracks, all
    /// `Flex(1)`. Tracks can only be defined once per grid.
    pub fn define(&mut self, column_count: usize, row_count: usize) -> Result<()> {
        if self.defined {
            return Err(GridError::DoubleInitialization {
                columns: self.columns.len(),
                rows: self.rows.len(),
            });
        }

        self.columns.reserve_exact(column_count);
        for _ in 0..column_count {
            self.columns.push(GridSize::default());
        }
        self.rows.reserve_exact(row_count);
        for _ in 0..row_count {
            self.rows.push(GridSize::default());
        }
        self.defined = true;
        Ok(())
    }

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[GridSize] {
        &self.columns
    }

    pub fn rows(&self) -> &[GridSize] {
        &self.rows
    }

    pub fn count(&self, axis: TrackAxis) -> usize {
        self.axis(axis).len()
    }

    pub fn get(&self, axis: TrackAxis, index: usize) -> Option<GridSize> {
        self.axis(axis).get(index).copied()
    }

    pub fn set(&mut self, axis: TrackAxis, index: usize, size: GridSize) -> Result<()> {
        self.check(axis, index)?;
        self.axis_mut(axis)[index] = size;
        Ok(())
    }

    pub(crate) fn check(&self, axis: TrackAxis, index: usize) -> Result<()> {
        let count = self.count(axis);
        if index >= count {
            return Err(GridError::TrackOutOfRange { axis, index, count });
        }
        Ok(())
    }

    /// Force the first and last track of both axes to `size`. Empty axes are skipped.
    pub(crate) fn force_borders(&mut self, size: GridSize) {
        for axis in [TrackAxis::Column, TrackAxis::Row] {
            let tracks = self.axis_mut(axis);
            if let Some(first) = tracks.first_mut() {
                *first = size;
            }
            if let Some(last) = tracks.last_mut() {
                *last = size;
            }
        }
    }

    fn axis(&self, axis: TrackAxis) -> &[GridSize] {
        match axis {
            TrackAxis::Column => &self.columns,
            TrackAxis::Row => &self.rows,
        }
    }

    fn axis_mut(&mut self, axis: TrackAxis) -> &mut Vec<GridSize> {
        match axis {
            TrackAxis::Column => &mut self.columns,
            TrackAxis::Row => &mut self.rows,
        }
    }
}
