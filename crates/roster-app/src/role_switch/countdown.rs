//! Countdown state machine
//!
//! `Idle -> Running -> {Cancelled, Committed}`. Each run gets a fresh
//! generation; the timer task carries it and every tick or expiry is checked
//! against the current run, so a stale task can never commit.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::tasks::TaskSlot;

/// Where the countdown currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// No countdown has run yet.
    Idle,
    /// Counting down; `generation` identifies this run.
    Running {
        /// Run identifier.
        generation: u64,
    },
    /// Stopped by the user or superseded by a new selection.
    Cancelled,
    /// Handed over to the commit, by expiry or by `confirm_now`.
    Committed,
}

/// How a running countdown is being claimed for commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Deadline reached inside the timer task of `generation`.
    Expired(u64),
    /// The user forced the commit.
    Forced,
}

#[derive(Debug)]
pub(crate) struct Countdown {
    state: CountdownState,
    generation: u64,
    task: TaskSlot,
    progress: watch::Sender<f32>,
}

impl Countdown {
    pub(crate) fn new() -> Self {
        let (progress, _rx) = watch::channel(0.0);
        Self {
            state: CountdownState::Idle,
            generation: 0,
            task: TaskSlot::default(),
            progress,
        }
    }

    pub(crate) fn state(&self) -> CountdownState {
        self.state
    }

    pub(crate) fn progress(&self) -> watch::Receiver<f32> {
        self.progress.subscribe()
    }

    /// Enter a new run and return its generation. Any previous task is aborted.
    pub(crate) fn begin(&mut self) -> u64 {
        self.task.cancel();
        self.generation += 1;
        self.state = CountdownState::Running {
            generation: self.generation,
        };
        self.progress.send_replace(0.0);
        self.generation
    }

    pub(crate) fn attach(&mut self, handle: JoinHandle<()>) {
        self.task.set(handle);
    }

    pub(crate) fn is_running(&self, generation: u64) -> bool {
        self.state == CountdownState::Running { generation }
    }

    /// Record progress for the run of `generation`. Returns `false` once that run is over.
    pub(crate) fn tick(&mut self, generation: u64, ratio: f32) -> bool {
        if !self.is_running(generation) {
            return false;
        }
        let ratio = ratio.clamp(0.0, 1.0);
        self.progress.send_if_modified(|current| {
            if ratio > *current {
                *current = ratio;
                true
            } else {
                false
            }
        });
        true
    }

    /// `Running -> Committed`. Succeeds at most once per run.
    pub(crate) fn claim(&mut self, claim: Claim) -> bool {
        let CountdownState::Running { generation } = self.state else {
            return false;
        };
        match claim {
            Claim::Expired(expected) if expected != generation => return false,
            Claim::Expired(_) => self.task.release(),
            Claim::Forced => {
                self.task.cancel();
            }
        }
        self.state = CountdownState::Committed;
        self.progress.send_replace(1.0);
        true
    }

    /// `Running -> Cancelled`. Returns `false` if nothing was running.
    pub(crate) fn cancel(&mut self) -> bool {
        if !matches!(self.state, CountdownState::Running { .. }) {
            return false;
        }
        self.task.cancel();
        self.state = CountdownState::Cancelled;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_succeeds_once() {
        let mut countdown = Countdown::new();
        let generation = countdown.begin();

        assert!(countdown.claim(Claim::Expired(generation)));
        assert!(!countdown.claim(Claim::Forced));
        assert!(!countdown.cancel());
        assert_eq!(countdown.state(), CountdownState::Committed);
    }

    #[test]
    fn cancel_beats_a_late_expiry() {
        let mut countdown = Countdown::new();
        let generation = countdown.begin();

        assert!(countdown.cancel());
        assert!(!countdown.claim(Claim::Expired(generation)));
        assert!(!countdown.tick(generation, 0.5));
        assert_eq!(countdown.state(), CountdownState::Cancelled);
    }

    #[test]
    fn stale_generation_cannot_claim_a_newer_run() {
        let mut countdown = Countdown::new();
        let stale = countdown.begin();
        countdown.cancel();
        let current = countdown.begin();

        assert!(!countdown.claim(Claim::Expired(stale)));
        assert!(countdown.is_running(current));
    }

    #[test]
    fn progress_is_monotonic_within_a_run() {
        let mut countdown = Countdown::new();
        let progress = countdown.progress();
        let generation = countdown.begin();

        countdown.tick(generation, 0.25);
        countdown.tick(generation, 0.10);
        assert_eq!(*progress.borrow(), 0.25);

        countdown.tick(generation, 7.0);
        assert_eq!(*progress.borrow(), 1.0);

        countdown.cancel();
        countdown.begin();
        assert_eq!(*progress.borrow(), 0.0);
    }
}
