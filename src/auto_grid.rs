//! Host-facing grid facade.
//!
//! [`AutoGrid`] owns a shared [`CellGrid`] and wires it to the ambient
//! pieces: structured logging, metrics, a [`LayoutObserver`] that receives one
//! commit per operation, and the [`VisibilityRefresher`] kicked after every
//! maximize and restore.
//!
//! Observers are called after the grid lock is released, so they may read the
//! grid through [`AutoGrid::shared`].
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use autogrid::{AutoGridBuilder, GridConfig, GridError, InlineDispatcher, ManualScheduler};
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let grid = AutoGridBuilder::new(GridConfig::default(), Arc::new(InlineDispatcher))
//!     .scheduler(scheduler.clone())
//!     .build();
//!
//! grid.define_grid(2, 2)?;
//! let a = grid.auto_add("a", 1)?;
//! let b = grid.auto_add("b", 1)?;
//! grid.auto_add("c", 2)?;
//! assert!(matches!(grid.auto_add("d", 1), Err(GridError::GridFull { .. })));
//!
//! grid.maximize(b)?;
//! assert!(!grid.with_grid(|g| g.item(a).unwrap().is_visible())?);
//! grid.restore()?;
//! scheduler.run_all();
//! assert!(grid.with_grid(|g| g.item(a).unwrap().is_visible())?);
//! # Ok::<(), GridError>(())
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde_json::json;

use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::geometry::{Orientation, Size};
use crate::layout::{CellGrid, ItemId, SharedGrid, SizingMode};
use crate::logging::{LogLevel, event_with_fields, json_kv};
use crate::metrics::{GridMetrics, MetricSnapshot};
use crate::observer::{
    CommitStage, LayoutChange, LayoutCommit, LayoutObserver, NullLayoutObserver,
};
use crate::refresh::{
    Dispatcher, OwnerQueue, Scheduler, ThreadScheduler, VisibilityRefresher, owner_queue,
};

const GRID_TARGET: &str = "autogrid::grid";
const MAXIMIZE_TARGET: &str = "autogrid::maximize";

/// Assembles an [`AutoGrid`]. Defaults: [`ThreadScheduler`],
/// [`NullLayoutObserver`].
///
/// The dispatcher decides which thread runs the deferred refresh, so it has
/// no default. Pass the dispatcher half of [`owner_queue`] and drain the
/// queue on the thread that mutates the grid. [`InlineDispatcher`] runs the
/// refresh on the scheduler's thread and is only correct for hosts without
/// thread affinity.
///
/// [`InlineDispatcher`]: crate::InlineDispatcher
pub struct AutoGridBuilder {
    config: GridConfig,
    scheduler: Arc<dyn Scheduler>,
    dispatcher: Arc<dyn Dispatcher>,
    observer: Arc<dyn LayoutObserver>,
}

impl AutoGridBuilder {
    pub fn new(config: GridConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            config,
            scheduler: Arc::new(ThreadScheduler),
            dispatcher,
            observer: Arc::new(NullLayoutObserver),
        }
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LayoutObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build<T: Send + 'static>(self) -> AutoGrid<T> {
        let grid: SharedGrid<T> = Arc::new(Mutex::new(CellGrid::new()));
        let refresher = VisibilityRefresher::new(&grid, self.scheduler, self.dispatcher)
            .with_delay(self.config.refresh_delay)
            .with_observer(Arc::clone(&self.observer))
            .with_logger(self.config.logger.clone())
            .with_metrics(self.config.metrics_handle());
        AutoGrid {
            grid,
            refresher,
            observer: self.observer,
            config: self.config,
            started_at: Instant::now(),
        }
    }
}

pub struct AutoGrid<T> {
    grid: SharedGrid<T>,
    refresher: VisibilityRefresher<T>,
    observer: Arc<dyn LayoutObserver>,
    config: GridConfig,
    started_at: Instant,
}

impl<T: Send + 'static> AutoGrid<T> {
    /// Build a grid whose refreshes are queued for the calling thread.
    ///
    /// The caller keeps the returned [`OwnerQueue`] and drains it from its
    /// event loop; refreshes never touch the grid from another thread.
    pub fn new(config: GridConfig) -> (Self, OwnerQueue) {
        let (dispatcher, queue) = owner_queue();
        let grid = AutoGridBuilder::new(config, Arc::new(dispatcher)).build();
        (grid, queue)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Handle to the underlying grid, e.g. for a host render pass.
    pub fn shared(&self) -> SharedGrid<T> {
        Arc::clone(&self.grid)
    }

    pub fn refresher(&self) -> &VisibilityRefresher<T> {
        &self.refresher
    }

    /// Read access to the grid under its lock.
    pub fn with_grid<R>(&self, read: impl FnOnce(&CellGrid<T>) -> R) -> Result<R> {
        let grid = self.lock()?;
        Ok(read(&grid))
    }

    /// Define `width` columns and `height` rows. Only once per grid.
    pub fn define_grid(&self, width: usize, height: usize) -> Result<()> {
        let changes = {
            let mut grid = self.lock()?;
            grid.define_grid(width, height)
                .map_err(|err| self.rejected("define_rejected", err))?;
            grid.take_changes()
        };
        self.publish(CommitStage::CellsDefined, changes);
        self.log(
            LogLevel::Info,
            GRID_TARGET,
            "cells_defined",
            [
                json_kv("columns", json!(width)),
                json_kv("rows", json!(height)),
            ],
        );
        Ok(())
    }

    /// Place `item` at the cursor spanning `width` columns.
    pub fn auto_add(&self, item: T, width: usize) -> Result<ItemId> {
        let (id, cursor, changes) = {
            let mut grid = self.lock()?;
            match grid.auto_add(item, width) {
                Ok(id) => (id, grid.cursor(), grid.take_changes()),
                Err(err) => {
                    self.with_metrics(|metrics| metrics.record_rejected_placement());
                    self.log(
                        LogLevel::Warn,
                        GRID_TARGET,
                        "placement_rejected",
                        [
                            json_kv("width", json!(width)),
                            json_kv("error", json!(err.to_string())),
                        ],
                    );
                    return Err(err);
                }
            }
        };
        self.publish(CommitStage::ItemPlaced, changes);
        self.with_metrics(|metrics| metrics.record_placement());
        self.log(
            LogLevel::Debug,
            GRID_TARGET,
            "item_placed",
            [
                json_kv("item", json!(id)),
                json_kv("width", json!(width)),
                json_kv("cursor", json!(cursor)),
            ],
        );
        Ok(id)
    }

    pub fn auto_add_one(&self, item: T) -> Result<ItemId> {
        self.auto_add(item, 1)
    }

    /// Reserve a `width` x `height` region at column `x`, row `y`.
    pub fn merged_cell(&self, x: usize, y: usize, width: usize, height: usize) -> Result<ItemId> {
        let (id, changes) = {
            let mut grid = self.lock()?;
            let id = grid
                .merged_cell(x, y, width, height)
                .map_err(|err| self.rejected("merge_rejected", err))?;
            (id, grid.take_changes())
        };
        self.publish(CommitStage::CellMerged, changes);
        Ok(id)
    }

    pub fn format_cell(
        &self,
        row: Option<usize>,
        column: Option<usize>,
        mode: SizingMode,
    ) -> Result<()> {
        let changes = {
            let mut grid = self.lock()?;
            grid.format_cell(row, column, mode)
                .map_err(|err| self.rejected("format_rejected", err))?;
            grid.take_changes()
        };
        self.publish(CommitStage::CellFormatted, changes);
        Ok(())
    }

    pub fn set_visible(&self, id: ItemId, visible: bool) -> Result<()> {
        let changes = {
            let mut grid = self.lock()?;
            grid.set_visible(id, visible)
                .map_err(|err| self.rejected("visibility_rejected", err))?;
            grid.take_changes()
        };
        self.publish(CommitStage::VisibilityChanged, changes);
        Ok(())
    }

    /// Expand `id` over the grid and hide everything else. A no-op while
    /// another maximize is active.
    pub fn maximize(&self, id: ItemId) -> Result<()> {
        let (snapshots, target, changes) = {
            let mut grid = self.lock()?;
            if !grid.maximize(id)? {
                drop(grid);
                self.log(
                    LogLevel::Debug,
                    MAXIMIZE_TARGET,
                    "maximize_ignored",
                    [json_kv("item", json!(id))],
                );
                return Ok(());
            }
            let snapshots = grid.session().map(|s| s.snapshots().len()).unwrap_or(0);
            let target = grid.last_item().map(|item| item.id());
            (snapshots, target, grid.take_changes())
        };
        self.publish(CommitStage::Maximized, changes);
        self.with_metrics(|metrics| metrics.record_maximize());
        self.log(
            LogLevel::Info,
            MAXIMIZE_TARGET,
            "maximized",
            [
                json_kv("item", json!(id)),
                json_kv("snapshots", json!(snapshots)),
            ],
        );
        self.refresher.schedule_refresh(target);
        Ok(())
    }

    /// Put every item back where it was before [`AutoGrid::maximize`].
    /// A no-op when nothing is maximized.
    pub fn restore(&self) -> Result<()> {
        let (items, target, changes) = {
            let mut grid = self.lock()?;
            if !grid.restore() {
                return Ok(());
            }
            let target = grid.last_item().map(|item| item.id());
            (grid.len(), target, grid.take_changes())
        };
        self.publish(CommitStage::Restored, changes);
        self.with_metrics(|metrics| metrics.record_restore());
        self.log(
            LogLevel::Info,
            MAXIMIZE_TARGET,
            "restored",
            [json_kv("items", json!(items))],
        );
        self.refresher.schedule_refresh(target);
        Ok(())
    }

    pub fn set_size_request(&self, size: Size) -> Result<()> {
        self.lock()?.set_size_request(size);
        Ok(())
    }

    pub fn current_orientation(&self) -> Result<Orientation> {
        Ok(self.lock()?.current_orientation())
    }

    /// Current counters, or `None` when metrics are disabled.
    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.started_at.elapsed()))
    }

    /// Write a metrics snapshot through the configured logger.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(snapshot)) = (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CellGrid<T>>> {
        self.grid.lock().map_err(|_| GridError::Poisoned)
    }

    /// Hand a batch to the observer. Must be called without the grid lock.
    fn publish(&self, stage: CommitStage, changes: Vec<LayoutChange>) {
        self.observer.commit(&LayoutCommit::new(stage, changes));
    }

    fn rejected(&self, message: &str, err: GridError) -> GridError {
        self.log(
            LogLevel::Warn,
            GRID_TARGET,
            message,
            [json_kv("error", json!(err.to_string()))],
        );
        err
    }

    fn with_metrics(&self, record: impl FnOnce(&mut GridMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, target, message, fields);
            let _ = logger.log_event(event);
        }
    }
}
