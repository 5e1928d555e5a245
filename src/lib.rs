//! Grid auto-placement with maximize/restore.
//!
//! A [`CellGrid`] owns column and row tracks plus a cursor that places items
//! left-to-right, top-to-bottom. One item can be maximized over the whole
//! grid while the rest are hidden, and the previous layout restored exactly.
//! [`AutoGrid`] is the host-facing facade that adds logging, metrics, change
//! notifications and the deferred visibility refresh.

pub mod auto_grid;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod maximize;
pub mod metrics;
pub mod observer;
pub mod refresh;

pub use auto_grid::{AutoGrid, AutoGridBuilder};
pub use config::{DEFAULT_REFRESH_DELAY, GridConfig};
pub use error::{DispatchError, GridError, Result, TrackAxis};
pub use geometry::{Orientation, Size};
pub use layout::{
    CellGrid, Cursor, GridSize, GridTracks, ItemId, PlacedItem, Placement, SharedGrid, SizingMode,
};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use maximize::{GridMode, ItemState, MaximizeSession};
pub use metrics::{GridMetrics, MetricSnapshot};
pub use observer::{
    CommitStage, LayoutChange, LayoutCommit, LayoutObserver, NullLayoutObserver, RecordingObserver,
};
pub use refresh::{
    Dispatcher, InlineDispatcher, ManualScheduler, OwnerQueue, QueueDispatcher, RefreshOutcome,
    Scheduler, SkipReason, Task, ThreadScheduler, VisibilityRefresher, owner_queue,
};
