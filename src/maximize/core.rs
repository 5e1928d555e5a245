use serde::Serialize;

use crate::error::{GridError, Result};
use crate::layout::{CellGrid, ItemId, PlacedItem, Placement};

/// Whether a maximize session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridMode {
    Normal,
    Maximized,
}

/// Pre-maximize placement and visibility of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemState {
    item: ItemId,
    placement: Placement,
    visible: bool,
}

impl ItemState {
    pub fn capture<T>(item: &PlacedItem<T>) -> Self {
        Self {
            item: item.id(),
            placement: item.placement(),
            visible: item.is_visible(),
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    fn restore_onto<T>(&self, target: &mut PlacedItem<T>) {
        target.visible = self.visible;
        target.placement = self.placement;
    }
}

/// Snapshots taken by one maximize, in child order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaximizeSession {
    target: ItemId,
    snapshots: Vec<ItemState>,
}

impl MaximizeSession {
    pub fn target(&self) -> ItemId {
        self.target
    }

    pub fn snapshots(&self) -> &[ItemState] {
        &self.snapshots
    }
}

impl<T> CellGrid<T> {
    pub fn mode(&self) -> GridMode {
        if self.session.is_some() {
            GridMode::Maximized
        } else {
            GridMode::Normal
        }
    }

    pub fn is_maximized(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&MaximizeSession> {
        self.session.as_ref()
    }

    /// Expand `target` over the whole grid and hide every other item.
    ///
    /// Returns `Ok(false)` without touching anything while a session is
    /// already active, so a second call cannot snapshot over a maximized layout.
    pub fn maximize(&mut self, target: ItemId) -> Result<bool> {
        if self.session.is_some() {
            return Ok(false);
        }
        if !self.contains(target) {
            return Err(GridError::UnknownItem(target));
        }

        let full = Placement::new(0, 0, self.row_count(), self.column_count());
        let mut snapshots = Vec::with_capacity(self.children.len());
        let mut changes = Vec::with_capacity(self.children.len());
        for child in self.children.iter_mut() {
            snapshots.push(ItemState::capture(child));
            if child.id() == target {
                child.placement = full;
            } else {
                child.visible = false;
            }
            changes.push(child.change());
        }
        for change in changes {
            self.record(change);
        }

        self.session = Some(MaximizeSession { target, snapshots });
        Ok(true)
    }

    /// Write every snapshot back in capture order and end the session.
    /// Returns `false` when nothing was maximized.
    pub fn restore(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        for state in &session.snapshots {
            // Children are never removed, so every snapshot still has its item.
            if let Ok(item) = self.item_mut(state.item) {
                state.restore_onto(item);
                let change = item.change();
                self.record(change);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Cursor;
    use proptest::prelude::*;

    fn placed(columns: usize, rows: usize, widths: &[usize]) -> (CellGrid<usize>, Vec<ItemId>) {
        let mut grid = CellGrid::new();
        grid.define_cells(columns, rows).unwrap();
        let ids = widths
            .iter()
            .enumerate()
            .map(|(n, width)| grid.auto_add(n, *width).unwrap())
            .collect();
        grid.take_changes();
        (grid, ids)
    }

    fn layout(grid: &CellGrid<usize>) -> Vec<(Placement, bool)> {
        grid.children()
            .iter()
            .map(|item| (item.placement(), item.is_visible()))
            .collect()
    }

    #[test]
    fn maximize_hides_others_and_expands_target() {
        let (mut grid, ids) = placed(2, 2, &[1, 1, 2]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        assert!(grid.maximize(b).unwrap());
        assert_eq!(grid.mode(), GridMode::Maximized);
        assert!(!grid.item(a).unwrap().is_visible());
        assert!(!grid.item(c).unwrap().is_visible());
        let target = grid.item(b).unwrap();
        assert!(target.is_visible());
        assert_eq!(target.placement(), Placement::new(0, 0, 2, 2));

        assert!(grid.restore());
        assert_eq!(grid.mode(), GridMode::Normal);
        assert_eq!(grid.item(a).unwrap().placement(), Placement::new(0, 0, 1, 1));
        assert_eq!(grid.item(b).unwrap().placement(), Placement::new(0, 1, 1, 1));
        assert_eq!(grid.item(c).unwrap().placement(), Placement::new(1, 0, 1, 2));
        assert!(grid.children().iter().all(PlacedItem::is_visible));
    }

    #[test]
    fn session_snapshots_follow_child_order() {
        let (mut grid, ids) = placed(3, 1, &[1, 1, 1]);
        grid.maximize(ids[2]).unwrap();
        let session = grid.session().unwrap();
        assert_eq!(session.target(), ids[2]);
        let order: Vec<_> = session.snapshots().iter().map(ItemState::item).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn second_maximize_is_ignored() {
        let (mut grid, ids) = placed(2, 2, &[1, 1, 1]);
        grid.maximize(ids[0]).unwrap();
        grid.take_changes();
        let after_first = layout(&grid);

        assert!(!grid.maximize(ids[1]).unwrap());
        assert_eq!(layout(&grid), after_first);
        assert_eq!(grid.session().unwrap().target(), ids[0]);
        assert!(!grid.has_changes());
    }

    #[test]
    fn restore_without_session_is_noop() {
        let (mut grid, _) = placed(2, 1, &[1, 1]);
        let before = layout(&grid);
        assert!(!grid.restore());
        assert_eq!(layout(&grid), before);
        assert!(!grid.has_changes());
    }

    #[test]
    fn unknown_target_is_rejected_before_snapshot() {
        let (mut grid, _) = placed(2, 1, &[1]);
        let mut other: CellGrid<usize> = CellGrid::new();
        other.define_cells(4, 4).unwrap();
        for n in 0..4 {
            other.auto_add(n, 1).unwrap();
        }
        let foreign = other.children()[3].id();

        assert_eq!(grid.maximize(foreign), Err(GridError::UnknownItem(foreign)));
        assert_eq!(grid.mode(), GridMode::Normal);
    }

    #[test]
    fn previously_hidden_items_stay_hidden_after_restore() {
        let (mut grid, ids) = placed(2, 1, &[1, 1]);
        grid.set_visible(ids[1], false).unwrap();
        grid.maximize(ids[0]).unwrap();
        grid.restore();
        assert!(grid.item(ids[0]).unwrap().is_visible());
        assert!(!grid.item(ids[1]).unwrap().is_visible());
    }

    #[test]
    fn maximize_and_restore_queue_one_change_per_item() {
        let (mut grid, ids) = placed(2, 2, &[1, 1, 2]);
        grid.maximize(ids[1]).unwrap();
        assert_eq!(grid.take_changes().len(), 3);
        grid.restore();
        assert_eq!(grid.take_changes().len(), 3);
    }

    #[test]
    fn maximize_does_not_move_cursor() {
        let (mut grid, ids) = placed(2, 2, &[1]);
        grid.maximize(ids[0]).unwrap();
        assert_eq!(grid.cursor(), Cursor { column: 1, row: 0 });
        grid.restore();
        assert_eq!(grid.auto_add(9, 1).map(|id| id.get()), Ok(1));
    }

    proptest! {
        #[test]
        fn maximize_restore_round_trips(
            columns in 1usize..5,
            rows in 1usize..5,
            count in 0usize..20,
            pick in any::<prop::sample::Index>(),
            hidden in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let mut grid: CellGrid<usize> = CellGrid::new();
            grid.define_cells(columns, rows).unwrap();
            let ids: Vec<ItemId> = (0..count.min(columns * rows))
                .map(|n| grid.auto_add(n, 1).unwrap())
                .collect();
            for (id, hide) in ids.iter().zip(&hidden) {
                if *hide {
                    grid.set_visible(*id, false).unwrap();
                }
            }
            let before = layout(&grid);

            if ids.is_empty() {
                prop_assert!(!grid.restore());
            } else {
                let target = ids[pick.index(ids.len())];
                prop_assert!(grid.maximize(target).unwrap());
                let once = layout(&grid);
                prop_assert!(!grid.maximize(target).unwrap());
                prop_assert_eq!(layout(&grid), once);
                prop_assert!(grid.restore());
            }
            prop_assert_eq!(layout(&grid), before);
            prop_assert_eq!(grid.mode(), GridMode::Normal);
        }
    }
}
