use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::DispatchError;

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once `delay` has elapsed. There is no cancellation.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> Result<(), DispatchError>;
}

/// Sleeps on a short-lived helper thread, then runs the task there.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        thread::Builder::new()
            .name("autogrid-refresh".to_string())
            .spawn(move || {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                task();
            })
            .map(|_| ())
            .map_err(|err| DispatchError::Spawn(err.to_string()))
    }
}

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending>,
}

/// Caller-driven clock. Tasks run inside [`ManualScheduler::advance`], on the
/// calling thread, ordered by due time then by scheduling order.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now
    }

    pub fn pending(&self) -> usize {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Move the clock forward and run everything that became due, including
    /// tasks scheduled by those tasks. Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        {
            let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
            clock.now = clock.now.saturating_add(by);
        }
        let mut ran = 0;
        // The lock is released before each task so tasks may schedule again.
        while let Some(task) = self.pop_due() {
            task();
            ran += 1;
        }
        ran
    }

    /// Advance until no task is pending.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let wait = {
                let clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
                match clock.pending.iter().map(|p| p.due).min() {
                    Some(due) => due.saturating_sub(clock.now),
                    None => return ran,
                }
            };
            ran += self.advance(wait);
        }
    }

    fn pop_due(&self) -> Option<Task> {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = clock.now;
        let idx = clock
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(idx, _)| idx)?;
        Some(clock.pending.swap_remove(idx).task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let due = clock.now.saturating_add(delay);
        clock.pending.push(Pending { due, seq, task });
        Ok(())
    }
}
