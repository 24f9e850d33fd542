#![forbid(unsafe_code)]

//! Deterministic store simulator for testing.
//!
//! `TestStore` runs a [`Reducer`] on a virtual timeline instead of threads.
//! Actions are reduced exactly as in the threaded [`Store`](crate::store::Store),
//! but delayed and repeating tasks wait in a queue until the test moves time
//! forward with [`advance`](TestStore::advance). Tasks due at the same instant
//! run in the order they were scheduled.
//!
//! # Example
//!
//! ```ignore
//! use standups_runtime::simulator::TestStore;
//!
//! let mut store = TestStore::new(reducer, state);
//! store.send(Action::Edit);
//! store.advance(Duration::from_millis(999));
//! assert_eq!(store.pending_effects(), 1);
//! store.advance(Duration::from_millis(1));
//! assert_eq!(store.pending_effects(), 0);
//! ```

use crate::program::{Cmd, Reducer, Schedule, Task};
use std::time::Duration;

/// Record of a command that was executed during simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdRecord {
    /// No-op command.
    None,
    /// Message fed back to the reducer.
    Msg,
    /// Batch of commands.
    Batch(usize),
    /// Task scheduled.
    Task(&'static str),
    /// Debounced task scheduled in the named scope.
    Debounce(&'static str),
    /// Scope cancelled.
    Cancel(&'static str),
    /// A pending task was dropped because its token was cancelled.
    Cancelled(&'static str),
}

struct Scheduled<A> {
    due: Duration,
    seq: u64,
    task: Task<A>,
}

/// Deterministic simulator for [`Reducer`] testing.
pub struct TestStore<R: Reducer> {
    reducer: R,
    state: R::State,
    now: Duration,
    next_seq: u64,
    pending: Vec<Scheduled<R::Action>>,
    received: Vec<R::Action>,
    command_log: Vec<CmdRecord>,
}

impl<R> TestStore<R>
where
    R: Reducer,
    R::Action: Clone,
{
    pub fn new(reducer: R, state: R::State) -> Self {
        Self {
            reducer,
            state,
            now: Duration::ZERO,
            next_seq: 0,
            pending: Vec::new(),
            received: Vec::new(),
            command_log: Vec::new(),
        }
    }

    /// Reduce `action` and its synchronous follow-ups.
    ///
    /// Tasks scheduled to run immediately are run before this returns.
    pub fn send(&mut self, action: R::Action) {
        self.reduce(action);
    }

    /// Move virtual time forward by `duration`, running every task that
    /// becomes due on the way.
    pub fn advance(&mut self, duration: Duration) {
        let target = self.now + duration;
        loop {
            self.drop_cancelled();
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, s)| s.due <= target)
                .min_by_key(|(_, s)| (s.due, s.seq))
                .map(|(i, _)| i);
            let Some(index) = next else {
                break;
            };
            let Scheduled { due, mut task, .. } = self.pending.swap_remove(index);
            self.now = due;
            crate::debug_trace!("simulator: running {} at {:?}", task.name(), due);
            if let Some(action) = task.run() {
                self.deliver(action);
            }
            if let Schedule::Every(interval) = task.schedule()
                && !task.token().is_cancelled()
            {
                self.enqueue(due + min_interval(interval), task);
            }
        }
        self.now = target;
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of scheduled tasks that have not run and are not cancelled.
    pub fn pending_effects(&self) -> usize {
        self.pending
            .iter()
            .filter(|s| !s.task.token().is_cancelled())
            .count()
    }

    /// Names of pending, uncancelled tasks in the order they will run.
    pub fn pending_names(&self) -> Vec<&'static str> {
        let mut live: Vec<&Scheduled<R::Action>> = self
            .pending
            .iter()
            .filter(|s| !s.task.token().is_cancelled())
            .collect();
        live.sort_by_key(|s| (s.due, s.seq));
        live.into_iter().map(|s| s.task.name()).collect()
    }

    /// Actions fed back so far, by follow-up messages and by tasks.
    pub fn received(&self) -> &[R::Action] {
        &self.received
    }

    /// Take the received actions, leaving the list empty.
    pub fn take_received(&mut self) -> Vec<R::Action> {
        std::mem::take(&mut self.received)
    }

    pub fn state(&self) -> &R::State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut R::State {
        &mut self.state
    }

    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Every command executed so far.
    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    pub fn clear_command_log(&mut self) {
        self.command_log.clear();
    }

    fn reduce(&mut self, action: R::Action) {
        let cmd = self.reducer.reduce(&mut self.state, action);
        self.execute(cmd);
    }

    fn deliver(&mut self, action: R::Action) {
        self.received.push(action.clone());
        self.reduce(action);
    }

    fn execute(&mut self, cmd: Cmd<R::Action>) {
        match cmd {
            Cmd::None => self.command_log.push(CmdRecord::None),
            Cmd::Msg(action) => {
                self.command_log.push(CmdRecord::Msg);
                self.deliver(action);
            }
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch(cmds.len()));
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
            Cmd::Task(task) => {
                self.command_log.push(CmdRecord::Task(task.name()));
                self.schedule(task);
            }
            Cmd::Debounce(scope, task) => {
                self.command_log.push(CmdRecord::Debounce(scope.name()));
                scope.replace(task.token().clone());
                self.schedule(task);
            }
            Cmd::Cancel(scope) => {
                self.command_log.push(CmdRecord::Cancel(scope.name()));
                scope.cancel();
            }
        }
    }

    fn schedule(&mut self, mut task: Task<R::Action>) {
        match task.schedule().delay() {
            None => {
                if task.token().is_cancelled() {
                    self.command_log.push(CmdRecord::Cancelled(task.name()));
                } else if let Some(action) = task.run() {
                    self.deliver(action);
                }
            }
            Some(delay) => self.enqueue(self.now + min_interval(delay), task),
        }
    }

    fn enqueue(&mut self, due: Duration, task: Task<R::Action>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled { due, seq, task });
    }

    fn drop_cancelled(&mut self) {
        let log = &mut self.command_log;
        self.pending.retain(|s| {
            if s.task.token().is_cancelled() {
                log.push(CmdRecord::Cancelled(s.task.name()));
                false
            } else {
                true
            }
        });
    }
}

/// Repeating tasks with a zero interval would never let virtual time move.
fn min_interval(d: Duration) -> Duration {
    d.max(Duration::from_nanos(1))
}
