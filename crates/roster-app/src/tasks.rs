//! Timer task slots, non-reentrant flags and the session write fence
//!
//! Every background timer lives in a [`TaskSlot`]. Replacing or cancelling a
//! slot aborts the previous task; a task that fires and wants to keep running
//! its continuation releases its own slot first so it never aborts itself.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Install `handle`, aborting whatever was scheduled before.
    pub(crate) fn set(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.handle.replace(handle) {
            previous.abort();
        }
    }

    /// Abort the scheduled task, if any.
    pub(crate) fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forget the handle without aborting. Called from inside the task itself.
    pub(crate) fn release(&mut self) {
        self.handle = None;
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Held while a non-reentrant operation runs; clears the flag on every exit path.
#[derive(Debug)]
pub(crate) struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    /// Set `flag`, or return `None` if it is already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Orders session clears against late writes to the session store.
///
/// `invalidate` moves the epoch before it waits for the write lock, so any
/// writer entering after a clear has begun sees a stale epoch, and any writer
/// already inside finishes before the store is cleared.
#[derive(Debug, Default)]
pub(crate) struct SessionEpoch {
    current: AtomicU64,
    writes: Mutex<()>,
}

impl SessionEpoch {
    pub(crate) fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Write lock with no epoch check; the caller validates its own generation.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// Write lock, or `None` once `epoch` has been invalidated.
    pub(crate) async fn enter(&self, epoch: u64) -> Option<MutexGuard<'_, ()>> {
        let guard = self.writes.lock().await;
        (self.current() == epoch).then_some(guard)
    }

    /// Start a new epoch and wait for writers of the previous one.
    pub(crate) async fn invalidate(&self) -> MutexGuard<'_, ()> {
        self.current.fetch_add(1, Ordering::AcqRel);
        self.writes.lock().await
    }
}
