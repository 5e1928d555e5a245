//! Deferred visibility refresh.
//!
//! After a batch of structural changes the host renderer may not notice that
//! anything moved. The refresher waits a short delay, hops onto the owner
//! thread and toggles the most recently added item off and back on.
//!
//! Waiting and thread hopping are explicit capabilities: a [`Scheduler`]
//! runs a task after a delay, a [`Dispatcher`] runs a task on the thread that
//! owns the grid.

mod core;
pub mod dispatch;
pub mod scheduler;

pub use self::core::{RefreshOutcome, SkipReason, VisibilityRefresher};
pub use dispatch::{Dispatcher, InlineDispatcher, OwnerQueue, QueueDispatcher, owner_queue};
pub use scheduler::{ManualScheduler, Scheduler, Task, ThreadScheduler};
