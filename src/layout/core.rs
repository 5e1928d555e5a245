use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::{GridError, Result, TrackAxis};
use crate::geometry::{Orientation, Size};
use crate::maximize::MaximizeSession;
use crate::observer::LayoutChange;

use super::grid::{GridSize, GridTracks, SizingMode};

/// Grid handle shared between the owner and deferred refresh tasks.
pub type SharedGrid<T> = Arc<Mutex<CellGrid<T>>>;

/// Stable handle for an item placed in a [`CellGrid`].
///
/// Ids are minted by the grid in insertion order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anchor and span of an item, in track indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub row: usize,
    pub column: usize,
    pub row_span: usize,
    pub column_span: usize,
}

impl Placement {
    pub const fn new(row: usize, column: usize, row_span: usize, column_span: usize) -> Self {
        Self {
            row,
            column,
            row_span,
            column_span,
        }
    }

    /// Single-cell placement at `row`, `column`.
    pub const fn cell(row: usize, column: usize) -> Self {
        Self::new(row, column, 1, 1)
    }

    pub fn row_end(&self) -> usize {
        self.row.saturating_add(self.row_span)
    }

    pub fn column_end(&self) -> usize {
        self.column.saturating_add(self.column_span)
    }

    pub fn contains(&self, row: usize, column: usize) -> bool {
        (self.row..self.row_end()).contains(&row)
            && (self.column..self.column_end()).contains(&column)
    }

    pub fn overlaps(&self, other: &Placement) -> bool {
        self.row < other.row_end()
            && other.row < self.row_end()
            && self.column < other.column_end()
            && other.column < self.column_end()
    }
}

/// Next free position used by auto-placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cursor {
    pub column: usize,
    pub row: usize,
}

/// An item owned by the grid. `content` is `None` for merged placeholder cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedItem<T> {
    id: ItemId,
    content: Option<T>,
    pub(crate) placement: Placement,
    pub(crate) visible: bool,
}

impl<T> PlacedItem<T> {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn content(&self) -> Option<&T> {
        self.content.as_ref()
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn row(&self) -> usize {
        self.placement.row
    }

    pub fn column(&self) -> usize {
        self.placement.column
    }

    pub fn row_span(&self) -> usize {
        self.placement.row_span
    }

    pub fn column_span(&self) -> usize {
        self.placement.column_span
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_placeholder(&self) -> bool {
        self.content.is_none()
    }

    pub(crate) fn change(&self) -> LayoutChange {
        LayoutChange::Item {
            id: self.id,
            placement: self.placement,
            visible: self.visible,
        }
    }
}

/// Grid of column/row tracks with sequential auto-placement.
///
/// The grid is single-owner: every mutation goes through `&mut self`, and the
/// changes it makes are queued until [`CellGrid::take_changes`] so a caller
/// can publish one operation as a single batch.
#[derive(Debug)]
pub struct CellGrid<T> {
    tracks: GridTracks,
    cursor: Cursor,
    pub(crate) children: Vec<PlacedItem<T>>,
    next_id: u64,
    last_auto: Option<Placement>,
    pub(crate) session: Option<MaximizeSession>,
    size_request: Size,
    pending: Vec<LayoutChange>,
}

impl<T> Default for CellGrid<T> {
    fn default() -> Self {
        Self {
            tracks: GridTracks::new(),
            cursor: Cursor::default(),
            children: Vec::new(),
            next_id: 0,
            last_auto: None,
            session: None,
            size_request: Size::default(),
            pending: Vec::new(),
        }
    }
}

impl<T> CellGrid<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `width` columns and `height` rows.
    pub fn define_grid(&mut self, width: usize, height: usize) -> Result<()> {
        self.define_cells(width, height)
    }

    /// Create the column and row tracks, each with proportional sizing.
    /// Fails with [`GridError::DoubleInitialization`] when called twice.
    pub fn define_cells(&mut self, column_count: usize, row_count: usize) -> Result<()> {
        self.tracks.define(column_count, row_count)?;
        for (index, size) in self.tracks.columns().iter().enumerate() {
            self.pending.push(LayoutChange::Track {
                axis: TrackAxis::Column,
                index,
                size: *size,
            });
        }
        for (index, size) in self.tracks.rows().iter().enumerate() {
            self.pending.push(LayoutChange::Track {
                axis: TrackAxis::Row,
                index,
                size: *size,
            });
        }
        Ok(())
    }

    /// Place `item` at the cursor spanning `width` columns and one row, then
    /// advance the cursor, wrapping to the next row at the last column.
    ///
    /// Nothing changes when the placement is rejected.
    pub fn auto_add(&mut self, item: T, width: usize) -> Result<ItemId> {
        let rows = self.tracks.row_count();
        let columns = self.tracks.column_count();
        if self.cursor.row == rows {
            return Err(GridError::GridFull { rows });
        }
        let end = self.cursor.column.checked_add(width);
        if width == 0 || end.is_none_or(|end| end > columns) {
            return Err(GridError::InvalidSpan {
                column: self.cursor.column,
                width,
                columns,
            });
        }

        let placement = Placement::new(self.cursor.row, self.cursor.column, 1, width);
        let id = self.add_view(Some(item), placement);
        self.last_auto = Some(placement);

        self.cursor.column += width;
        if self.cursor.column == columns {
            self.cursor.column = 0;
            self.cursor.row += 1;
        }
        Ok(id)
    }

    /// [`CellGrid::auto_add`] with a single-column span.
    pub fn auto_add_one(&mut self, item: T) -> Result<ItemId> {
        self.auto_add(item, 1)
    }

    /// Reserve a region with an empty placeholder. The cursor does not move.
    pub fn merged_cell(
        &mut self,
        column: usize,
        row: usize,
        width: usize,
        height: usize,
    ) -> Result<ItemId> {
        let columns = self.tracks.column_count();
        let rows = self.tracks.row_count();
        if width == 0 || height == 0 {
            return Err(GridError::EmptySpan { width, height });
        }
        let fits = |start: usize, span: usize, count: usize| {
            start.checked_add(span).is_some_and(|end| end <= count)
        };
        if !fits(column, width, columns) || !fits(row, height, rows) {
            return Err(GridError::OutOfBounds {
                column,
                row,
                width,
                height,
                columns,
                rows,
            });
        }

        Ok(self.add_view(None, Placement::new(row, column, height, width)))
    }

    /// Apply `mode` to the given row and/or column track.
    ///
    /// The first and last row and the first and last column are always forced
    /// to `mode` as well, even when both indices are given. With neither index
    /// the tracks of the most recently auto-placed item are formatted.
    pub fn format_cell(
        &mut self,
        row: Option<usize>,
        column: Option<usize>,
        mode: SizingMode,
    ) -> Result<()> {
        let (row, column) = match (row, column) {
            (None, None) => match self.last_auto {
                Some(placement) => (Some(placement.row), Some(placement.column)),
                None => (None, None),
            },
            given => given,
        };
        if let Some(row) = row {
            self.tracks.check(TrackAxis::Row, row)?;
        }
        if let Some(column) = column {
            self.tracks.check(TrackAxis::Column, column)?;
        }

        let size = mode.unit();
        if let Some(column) = column {
            self.tracks.set(TrackAxis::Column, column, size)?;
        }
        if let Some(row) = row {
            self.tracks.set(TrackAxis::Row, row, size)?;
        }
        self.tracks.force_borders(size);

        let mut touched: Vec<(TrackAxis, usize)> = Vec::with_capacity(6);
        touched.extend(column.map(|c| (TrackAxis::Column, c)));
        touched.extend(row.map(|r| (TrackAxis::Row, r)));
        for axis in [TrackAxis::Column, TrackAxis::Row] {
            let count = self.tracks.count(axis);
            if count > 0 {
                touched.push((axis, 0));
                touched.push((axis, count - 1));
            }
        }
        let mut seen = Vec::with_capacity(touched.len());
        for (axis, index) in touched {
            if seen.contains(&(axis, index)) {
                continue;
            }
            seen.push((axis, index));
            self.pending.push(LayoutChange::Track { axis, index, size });
        }
        Ok(())
    }

    /// Host-side visibility setter.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) -> Result<()> {
        let item = self.item_mut(id)?;
        item.visible = visible;
        let change = item.change();
        self.pending.push(change);
        Ok(())
    }

    /// Flip an item's visibility off and straight back on so the host
    /// re-lays it out. Both transitions are queued as changes.
    pub fn toggle_visibility(&mut self, id: ItemId) -> Result<()> {
        let item = self.item_mut(id)?;
        let original = item.visible;
        item.visible = !original;
        let hidden = item.change();
        item.visible = original;
        let shown = item.change();
        self.pending.push(hidden);
        self.pending.push(shown);
        Ok(())
    }

    pub fn set_size_request(&mut self, size: Size) {
        self.size_request = size;
    }

    pub fn size_request(&self) -> Size {
        self.size_request
    }

    pub fn current_orientation(&self) -> Orientation {
        Orientation::of(self.size_request)
    }

    pub fn tracks(&self) -> &GridTracks {
        &self.tracks
    }

    pub fn columns(&self) -> &[GridSize] {
        self.tracks.columns()
    }

    pub fn rows(&self) -> &[GridSize] {
        self.tracks.rows()
    }

    pub fn column_count(&self) -> usize {
        self.tracks.column_count()
    }

    pub fn row_count(&self) -> usize {
        self.tracks.row_count()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_full(&self) -> bool {
        self.cursor.row == self.tracks.row_count()
    }

    pub fn children(&self) -> &[PlacedItem<T>] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&PlacedItem<T>> {
        self.index_of(id).map(|idx| &self.children[idx])
    }

    pub fn content(&self, id: ItemId) -> Option<&T> {
        self.item(id).and_then(PlacedItem::content)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.index_of(id).is_some()
    }

    /// Most recently added item, auto-placed or merged.
    pub fn last_item(&self) -> Option<&PlacedItem<T>> {
        self.children.last()
    }

    /// Drain the changes queued since the last call.
    pub fn take_changes(&mut self) -> Vec<LayoutChange> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn record(&mut self, change: LayoutChange) {
        self.pending.push(change);
    }

    pub(crate) fn item_mut(&mut self, id: ItemId) -> Result<&mut PlacedItem<T>> {
        let idx = self.index_of(id).ok_or(GridError::UnknownItem(id))?;
        Ok(&mut self.children[idx])
    }

    fn add_view(&mut self, content: Option<T>, placement: Placement) -> ItemId {
        let id = ItemId::new(self.next_id);
        self.next_id += 1;
        let item = PlacedItem {
            id,
            content,
            placement,
            visible: true,
        };
        self.pending.push(item.change());
        self.children.push(item);
        id
    }

    // Children are only ever appended, so ids stay sorted.
    fn index_of(&self, id: ItemId) -> Option<usize> {
        self.children.binary_search_by_key(&id, |item| item.id).ok()
    }
}
