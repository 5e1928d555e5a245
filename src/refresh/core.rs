use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde_json::json;

use crate::config::DEFAULT_REFRESH_DELAY;
use crate::layout::{CellGrid, ItemId, SharedGrid};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::GridMetrics;
use crate::observer::{CommitStage, LayoutCommit, LayoutObserver, NullLayoutObserver};

use super::dispatch::Dispatcher;
use super::scheduler::{Scheduler, Task};

const LOG_TARGET: &str = "autogrid::refresh";

/// Why a refresh did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No item to toggle.
    Empty,
    /// The grid was dropped before the delay elapsed.
    GridDropped,
    /// The captured item is no longer in the grid.
    ItemMissing,
    /// A previous owner panicked while holding the grid.
    Poisoned,
    /// The task could not be deferred or handed to the owner thread.
    DispatchFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Empty => "empty",
            SkipReason::GridDropped => "grid_dropped",
            SkipReason::ItemMissing => "item_missing",
            SkipReason::Poisoned => "poisoned",
            SkipReason::DispatchFailed => "dispatch_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(ItemId),
    Skipped(SkipReason),
}

/// Best-effort deferred visibility toggle for one grid.
///
/// Holds only a weak reference, so a pending refresh never keeps a dropped
/// grid alive. Every failure is absorbed: it is logged and counted, never
/// returned.
pub struct VisibilityRefresher<T> {
    grid: Weak<Mutex<CellGrid<T>>>,
    scheduler: Arc<dyn Scheduler>,
    dispatcher: Arc<dyn Dispatcher>,
    delay: Duration,
    observer: Arc<dyn LayoutObserver>,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<GridMetrics>>>,
}

impl<T> Clone for VisibilityRefresher<T> {
    fn clone(&self) -> Self {
        Self {
            grid: Weak::clone(&self.grid),
            scheduler: Arc::clone(&self.scheduler),
            dispatcher: Arc::clone(&self.dispatcher),
            delay: self.delay,
            observer: Arc::clone(&self.observer),
            logger: self.logger.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T: Send + 'static> VisibilityRefresher<T> {
    pub fn new(
        grid: &SharedGrid<T>,
        scheduler: Arc<dyn Scheduler>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            grid: Arc::downgrade(grid),
            scheduler,
            dispatcher,
            delay: DEFAULT_REFRESH_DELAY,
            observer: Arc::new(NullLayoutObserver),
            logger: None,
            metrics: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LayoutObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_logger(mut self, logger: Option<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Mutex<GridMetrics>>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// After the delay, toggle `target` off and on from the owner thread.
    ///
    /// `target` is the most recently added item when the refresh is requested;
    /// `None` means the grid had no items and nothing is scheduled.
    pub fn schedule_refresh(&self, target: Option<ItemId>) {
        let Some(target) = target else {
            self.finish(RefreshOutcome::Skipped(SkipReason::Empty));
            return;
        };

        let refresher = self.clone();
        let task: Task = Box::new(move || {
            let on_owner = refresher.clone();
            let handoff = refresher.dispatcher.dispatch(Box::new(move || {
                on_owner.refresh_now(target);
            }));
            if let Err(err) = handoff {
                refresher.log(
                    LogLevel::Warn,
                    "refresh_dispatch_failed",
                    [json_kv("error", json!(err.to_string()))],
                );
                refresher.finish(RefreshOutcome::Skipped(SkipReason::DispatchFailed));
            }
        });

        if let Err(err) = self.scheduler.schedule(self.delay, task) {
            self.log(
                LogLevel::Warn,
                "refresh_schedule_failed",
                [json_kv("error", json!(err.to_string()))],
            );
            self.finish(RefreshOutcome::Skipped(SkipReason::DispatchFailed));
            return;
        }

        self.log(
            LogLevel::Trace,
            "refresh_scheduled",
            [
                json_kv("item", json!(target)),
                json_kv("delay_ms", json!(self.delay.as_millis() as u64)),
            ],
        );
    }

    /// Run the toggle immediately on the current thread, which must be the owner.
    pub fn refresh_now(&self, target: ItemId) -> RefreshOutcome {
        let outcome = self.apply(target);
        self.finish(outcome);
        outcome
    }

    fn apply(&self, target: ItemId) -> RefreshOutcome {
        let Some(shared) = self.grid.upgrade() else {
            return RefreshOutcome::Skipped(SkipReason::GridDropped);
        };
        let changes = {
            let Ok(mut grid) = shared.lock() else {
                return RefreshOutcome::Skipped(SkipReason::Poisoned);
            };
            if grid.is_empty() {
                return RefreshOutcome::Skipped(SkipReason::Empty);
            }
            if grid.toggle_visibility(target).is_err() {
                return RefreshOutcome::Skipped(SkipReason::ItemMissing);
            }
            grid.take_changes()
        };
        // Lock released: observers may read the grid.
        self.observer
            .commit(&LayoutCommit::new(CommitStage::Refreshed, changes));
        RefreshOutcome::Applied(target)
    }

    fn finish(&self, outcome: RefreshOutcome) {
        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_refresh(matches!(outcome, RefreshOutcome::Applied(_)));
            }
        }
        match outcome {
            RefreshOutcome::Applied(item) => {
                self.log(
                    LogLevel::Debug,
                    "refresh_applied",
                    [json_kv("item", json!(item))],
                );
            }
            RefreshOutcome::Skipped(reason) => {
                self.log(
                    LogLevel::Debug,
                    "refresh_skipped",
                    [json_kv("reason", json!(reason.as_str()))],
                );
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::observer::RecordingObserver;
    use crate::refresh::dispatch::{InlineDispatcher, owner_queue};
    use crate::refresh::scheduler::ManualScheduler;

    fn shared(count: usize) -> (SharedGrid<usize>, Vec<ItemId>) {
        let mut grid = CellGrid::new();
        grid.define_cells(count.max(1), 1).unwrap();
        let ids = (0..count).map(|n| grid.auto_add(n, 1).unwrap()).collect();
        grid.take_changes();
        (Arc::new(Mutex::new(grid)), ids)
    }

    fn visible(grid: &SharedGrid<usize>, id: ItemId) -> bool {
        grid.lock().unwrap().item(id).unwrap().is_visible()
    }

    #[test]
    fn refresh_runs_after_delay_and_toggles_off_then_on() {
        let (grid, ids) = shared(2);
        let scheduler = Arc::new(ManualScheduler::new());
        let observer = Arc::new(RecordingObserver::new());
        let refresher = VisibilityRefresher::new(&grid, scheduler.clone(), Arc::new(InlineDispatcher))
            .with_observer(observer.clone());

        refresher.schedule_refresh(Some(ids[1]));
        assert_eq!(scheduler.advance(Duration::from_millis(99)), 0);
        assert!(observer.commits().is_empty());

        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        let commits = observer.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].stage, CommitStage::Refreshed);
        let flags: Vec<_> = commits[0].items().map(|(id, _, v)| (id, v)).collect();
        assert_eq!(flags, vec![(ids[1], false), (ids[1], true)]);
        assert!(visible(&grid, ids[1]));
    }

    #[test]
    fn refresh_waits_for_owner_queue() {
        let (grid, ids) = shared(1);
        let scheduler = Arc::new(ManualScheduler::new());
        let (dispatcher, queue) = owner_queue();
        let observer = Arc::new(RecordingObserver::new());
        let refresher = VisibilityRefresher::new(&grid, scheduler.clone(), Arc::new(dispatcher))
            .with_observer(observer.clone());

        refresher.schedule_refresh(Some(ids[0]));
        scheduler.run_all();
        assert!(observer.commits().is_empty());
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(observer.commits().len(), 1);
    }

    #[test]
    fn dropped_grid_is_skipped() {
        let (grid, ids) = shared(1);
        let metrics = Arc::new(Mutex::new(GridMetrics::new()));
        let refresher = VisibilityRefresher::new(
            &grid,
            Arc::new(ManualScheduler::new()),
            Arc::new(InlineDispatcher),
        )
        .with_metrics(Some(metrics.clone()));
        drop(grid);

        assert_eq!(
            refresher.refresh_now(ids[0]),
            RefreshOutcome::Skipped(SkipReason::GridDropped)
        );
        let snapshot = metrics.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.refreshes_skipped, 1);
        assert_eq!(snapshot.refreshes_applied, 0);
    }

    #[test]
    fn empty_target_is_skipped_without_scheduling() {
        let (grid, _) = shared(0);
        let scheduler = Arc::new(ManualScheduler::new());
        let sink = Arc::new(MemorySink::new());
        let refresher =
            VisibilityRefresher::new(&grid, scheduler.clone(), Arc::new(InlineDispatcher))
                .with_logger(Some(Logger::from_arc(sink.clone())));

        refresher.schedule_refresh(None);
        assert_eq!(scheduler.pending(), 0);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "refresh_skipped");
        assert_eq!(events[0].fields["reason"], "empty");
    }

    #[test]
    fn unknown_item_is_skipped() {
        let (grid, _) = shared(1);
        let (other, other_ids) = shared(3);
        drop(other);
        let refresher = VisibilityRefresher::new(
            &grid,
            Arc::new(ManualScheduler::new()),
            Arc::new(InlineDispatcher),
        );
        assert_eq!(
            refresher.refresh_now(other_ids[2]),
            RefreshOutcome::Skipped(SkipReason::ItemMissing)
        );
    }

    struct ReadingObserver {
        grid: SharedGrid<usize>,
        visible: Mutex<Vec<bool>>,
    }

    impl LayoutObserver for ReadingObserver {
        fn commit(&self, commit: &LayoutCommit) {
            let grid = self.grid.lock().unwrap();
            let flags = commit
                .items()
                .map(|(id, _, _)| grid.item(id).unwrap().is_visible());
            self.visible.lock().unwrap().extend(flags);
        }
    }

    #[test]
    fn observer_reads_grid_after_lock_release() {
        let (grid, ids) = shared(1);
        let observer = Arc::new(ReadingObserver {
            grid: grid.clone(),
            visible: Mutex::new(Vec::new()),
        });
        let refresher = VisibilityRefresher::new(
            &grid,
            Arc::new(ManualScheduler::new()),
            Arc::new(InlineDispatcher),
        )
        .with_observer(observer.clone());

        let (tx, rx) = std::sync::mpsc::channel();
        let id = ids[0];
        std::thread::spawn(move || {
            let _ = tx.send(refresher.refresh_now(id));
        });
        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("refresh blocked while notifying the observer");
        assert_eq!(outcome, RefreshOutcome::Applied(id));
        assert_eq!(*observer.visible.lock().unwrap(), vec![true, true]);
    }

    #[test]
    fn closed_owner_queue_is_absorbed() {
        let (grid, ids) = shared(1);
        let scheduler = Arc::new(ManualScheduler::new());
        let (dispatcher, queue) = owner_queue();
        drop(queue);
        let metrics = Arc::new(Mutex::new(GridMetrics::new()));
        let refresher = VisibilityRefresher::new(&grid, scheduler.clone(), Arc::new(dispatcher))
            .with_metrics(Some(metrics.clone()));

        refresher.schedule_refresh(Some(ids[0]));
        assert_eq!(scheduler.run_all(), 1);
        let snapshot = metrics.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.refreshes_skipped, 1);
        assert!(visible(&grid, ids[0]));
    }
}
