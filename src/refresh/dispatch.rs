use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::error::DispatchError;

use super::scheduler::Task;

/// Runs a task on the thread allowed to mutate the grid.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task) -> Result<(), DispatchError>;
}

/// Runs the task on the calling thread. Only correct when the caller is
/// already the owner (or the host has no thread affinity).
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) -> Result<(), DispatchError> {
        task();
        Ok(())
    }
}

/// Create a dispatcher/queue pair. The owner thread keeps the [`OwnerQueue`]
/// and drains it from its event loop.
pub fn owner_queue() -> (QueueDispatcher, OwnerQueue) {
    let (tx, rx) = mpsc::channel();
    (QueueDispatcher { tx }, OwnerQueue { rx })
}

/// Sending half handed to the refresher.
#[derive(Clone)]
pub struct QueueDispatcher {
    tx: Sender<Task>,
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: Task) -> Result<(), DispatchError> {
        self.tx.send(task).map_err(|_| DispatchError::Disconnected)
    }
}

/// Receiving half, owned by the owner thread.
pub struct OwnerQueue {
    rx: Receiver<Task>,
}

impl OwnerQueue {
    /// Run every queued task without blocking.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block up to `timeout` for one task and run it.
    pub fn run_next(&self, timeout: Duration) -> Result<bool, DispatchError> {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn queued_tasks_run_on_owner_thread() {
        let (dispatcher, queue) = owner_queue();
        let owner = thread::current().id();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        thread::spawn(move || {
            dispatcher
                .dispatch(Box::new(move || {
                    assert_eq!(thread::current().id(), owner);
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_queue_reports_disconnect() {
        let (dispatcher, queue) = owner_queue();
        drop(queue);
        assert_eq!(
            dispatcher.dispatch(Box::new(|| {})),
            Err(DispatchError::Disconnected)
        );
    }

    #[test]
    fn run_next_times_out_then_disconnects() {
        let (dispatcher, queue) = owner_queue();
        assert_eq!(queue.run_next(Duration::from_millis(1)), Ok(false));
        drop(dispatcher);
        assert_eq!(
            queue.run_next(Duration::from_millis(1)),
            Err(DispatchError::Disconnected)
        );
    }

    #[test]
    fn inline_runs_immediately() {
        let hit = Arc::new(AtomicUsize::new(0));
        let counter = hit.clone();
        InlineDispatcher
            .dispatch(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(hit.load(Ordering::SeqCst), 1);
    }
}
