#![forbid(unsafe_code)]

//! Reducers and the commands they return.
//!
//! A [`Reducer`] is the only place state changes. Given the current state and
//! an action it mutates the state in place and returns a [`Cmd`] describing
//! follow-up work:
//!
//! - [`Cmd::Msg`] feeds another action back through the same reducer before
//!   the current `send` returns.
//! - [`Cmd::Task`] runs a closure off the reducer thread, optionally after a
//!   delay or repeatedly, and feeds its result back as an action.
//! - [`Cmd::Debounce`] is a task that first replaces the live request of a
//!   [`CancelScope`], cancelling whatever was pending there.
//! - [`Cmd::Cancel`] cancels the live request of a scope.
//!
//! Child reducers are composed by calling them directly and lifting their
//! commands with [`Cmd::map`].

use crate::cancellation::{CancelScope, CancelToken};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A state transition function.
pub trait Reducer {
    /// The state this reducer owns.
    type State;
    /// The actions it understands.
    type Action: Send + 'static;

    /// Apply `action` to `state` and describe follow-up work.
    fn reduce(&mut self, state: &mut Self::State, action: Self::Action) -> Cmd<Self::Action>;
}

/// When a task's work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Immediately.
    Now,
    /// Once, after the delay.
    After(Duration),
    /// After every interval until cancelled.
    Every(Duration),
}

impl Schedule {
    /// Delay before the next run of the work, if any.
    #[must_use]
    pub fn delay(self) -> Option<Duration> {
        match self {
            Schedule::Now => None,
            Schedule::After(d) | Schedule::Every(d) => Some(d),
        }
    }

    /// Whether the work runs more than once.
    #[must_use]
    pub fn repeats(self) -> bool {
        matches!(self, Schedule::Every(_))
    }
}

type Work<A> = Box<dyn FnMut() -> Option<A> + Send>;

/// Background work with its own cancellation token.
pub struct Task<A> {
    pub(crate) name: &'static str,
    pub(crate) schedule: Schedule,
    pub(crate) work: Work<A>,
    pub(crate) token: CancelToken,
}

impl<A: Send + 'static> Task<A> {
    /// Run `f` once, as soon as possible.
    pub fn new(name: &'static str, f: impl FnOnce() -> Option<A> + Send + 'static) -> Self {
        Self::once(name, Schedule::Now, f)
    }

    /// Run `f` once after `delay`.
    pub fn after(
        name: &'static str,
        delay: Duration,
        f: impl FnOnce() -> Option<A> + Send + 'static,
    ) -> Self {
        Self::once(name, Schedule::After(delay), f)
    }

    /// Run `f` after every `interval` until cancelled.
    pub fn every(
        name: &'static str,
        interval: Duration,
        f: impl FnMut() -> Option<A> + Send + 'static,
    ) -> Self {
        Self {
            name,
            schedule: Schedule::Every(interval),
            work: Box::new(f),
            token: CancelToken::new(),
        }
    }

    fn once(
        name: &'static str,
        schedule: Schedule,
        f: impl FnOnce() -> Option<A> + Send + 'static,
    ) -> Self {
        let mut f = Some(f);
        Self {
            name,
            schedule,
            work: Box::new(move || f.take().and_then(|f| f())),
            token: CancelToken::new(),
        }
    }

    fn map_arc<B: Send + 'static>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Task<B> {
        let mut work = self.work;
        Task {
            name: self.name,
            schedule: self.schedule,
            work: Box::new(move || work().map(|a| f(a))),
            token: self.token,
        }
    }
}

impl<A> Task<A> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// The token that cancels this task.
    #[must_use]
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Run the work once, ignoring the schedule.
    pub(crate) fn run(&mut self) -> Option<A> {
        (self.work)()
    }
}

impl<A> fmt::Debug for Task<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Follow-up work returned by a reducer.
pub enum Cmd<A> {
    /// No operation.
    None,
    /// Feed an action back through the reducer in the same pass.
    Msg(A),
    /// Execute commands in order.
    Batch(Vec<Cmd<A>>),
    /// Run background work.
    Task(Task<A>),
    /// Cancel the scope's live request, then run the task as its new one.
    Debounce(CancelScope, Task<A>),
    /// Cancel the scope's live request.
    Cancel(CancelScope),
}

impl<A> Default for Cmd<A> {
    fn default() -> Self {
        Self::None
    }
}

impl<A: fmt::Debug> fmt::Debug for Cmd<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Msg(a) => f.debug_tuple("Msg").field(a).finish(),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Task(task) => f.debug_tuple("Task").field(task).finish(),
            Self::Debounce(scope, task) => f
                .debug_struct("Debounce")
                .field("scope", &scope.name())
                .field("task", task)
                .finish(),
            Self::Cancel(scope) => write!(f, "Cancel({})", scope.name()),
        }
    }
}

impl<A: Send + 'static> Cmd<A> {
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    #[inline]
    pub fn msg(action: A) -> Self {
        Self::Msg(action)
    }

    /// Combine commands, dropping no-ops.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    /// Run `f` on a background thread and feed its result back.
    pub fn task(name: &'static str, f: impl FnOnce() -> Option<A> + Send + 'static) -> Self {
        Self::Task(Task::new(name, f))
    }

    /// Run `f` every `interval` until the task is cancelled.
    pub fn every(
        name: &'static str,
        interval: Duration,
        f: impl FnMut() -> Option<A> + Send + 'static,
    ) -> Self {
        Self::Task(Task::every(name, interval, f))
    }

    /// Run `f` every `interval` as the scope's live request.
    ///
    /// Cancelling the scope stops the timer; starting another one in the same
    /// scope replaces it.
    pub fn every_in(
        scope: &CancelScope,
        name: &'static str,
        interval: Duration,
        f: impl FnMut() -> Option<A> + Send + 'static,
    ) -> Self {
        Self::Debounce(scope.clone(), Task::every(name, interval, f))
    }

    /// Run `f` once after `delay`, cancelling the scope's pending request.
    ///
    /// Issuing a debounce in the same scope before `delay` has elapsed
    /// cancels this one, so a burst of requests runs `f` at most once.
    pub fn debounce(
        scope: &CancelScope,
        name: &'static str,
        delay: Duration,
        f: impl FnOnce() -> Option<A> + Send + 'static,
    ) -> Self {
        Self::Debounce(scope.clone(), Task::after(name, delay, f))
    }

    /// Cancel the scope's pending request.
    pub fn cancel(scope: &CancelScope) -> Self {
        Self::Cancel(scope.clone())
    }

    /// Lift a child command into a parent action space.
    pub fn map<B: Send + 'static>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Cmd<B> {
        self.map_arc(Arc::new(f))
    }

    fn map_arc<B: Send + 'static>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Cmd<B> {
        match self {
            Self::None => Cmd::None,
            Self::Msg(a) => Cmd::Msg(f(a)),
            Self::Batch(cmds) => Cmd::Batch(
                cmds.into_iter()
                    .map(|c| c.map_arc(Arc::clone(&f)))
                    .collect(),
            ),
            Self::Task(task) => Cmd::Task(task.map_arc(f)),
            Self::Debounce(scope, task) => Cmd::Debounce(scope, task.map_arc(f)),
            Self::Cancel(scope) => Cmd::Cancel(scope),
        }
    }

    /// Tie every task in this command to `parent`, so cancelling `parent`
    /// cancels them.
    pub fn cancellable(self, parent: &CancelToken) -> Self {
        match self {
            Self::Task(task) => {
                parent.attach(&task.token);
                Self::Task(task)
            }
            Self::Debounce(scope, task) => {
                parent.attach(&task.token);
                Self::Debounce(scope, task)
            }
            Self::Batch(cmds) => {
                Self::Batch(cmds.into_iter().map(|c| c.cancellable(parent)).collect())
            }
            other => other,
        }
    }
}

impl<A> Cmd<A> {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Return a stable name for tracing.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Msg(_) => "Msg",
            Self::Batch(_) => "Batch",
            Self::Task(_) => "Task",
            Self::Debounce(..) => "Debounce",
            Self::Cancel(_) => "Cancel",
        }
    }

    /// Count the atomic commands, recursing into batches.
    pub fn count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Batch(cmds) => cmds.iter().map(Self::count).sum(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Child {
        Ping,
        Value(i32),
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Parent {
        Child(Child),
    }

    #[test]
    fn batch_drops_noops_and_unwraps_single() {
        let cmd: Cmd<Child> = Cmd::batch(vec![Cmd::none(), Cmd::msg(Child::Ping), Cmd::none()]);
        assert!(matches!(cmd, Cmd::Msg(Child::Ping)));

        let empty: Cmd<Child> = Cmd::batch(vec![Cmd::none()]);
        assert!(empty.is_none());

        let two: Cmd<Child> = Cmd::batch(vec![Cmd::msg(Child::Ping), Cmd::msg(Child::Ping)]);
        assert_eq!(two.count(), 2);
        assert_eq!(two.type_name(), "Batch");
    }

    #[test]
    fn map_lifts_messages_and_task_results() {
        let cmd: Cmd<Child> = Cmd::batch(vec![
            Cmd::msg(Child::Ping),
            Cmd::task("value", || Some(Child::Value(7))),
        ]);
        let Cmd::Batch(mut cmds) = cmd.map(Parent::Child) else {
            panic!("expected batch");
        };
        let Cmd::Task(mut task) = cmds.pop().unwrap() else {
            panic!("expected task");
        };
        assert_eq!(task.run(), Some(Parent::Child(Child::Value(7))));
        assert!(matches!(cmds.pop(), Some(Cmd::Msg(Parent::Child(Child::Ping)))));
    }

    #[test]
    fn once_tasks_run_only_once() {
        let mut task = Task::new("once", || Some(1));
        assert_eq!(task.run(), Some(1));
        assert_eq!(task.run(), None);
    }

    #[test]
    fn every_tasks_run_repeatedly() {
        let mut n = 0;
        let mut task = Task::every("tick", Duration::from_secs(1), move || {
            n += 1;
            Some(n)
        });
        assert_eq!(task.run(), Some(1));
        assert_eq!(task.run(), Some(2));
        assert!(task.schedule().repeats());
        assert_eq!(task.schedule().delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn cancellable_attaches_every_task() {
        let parent = CancelToken::new();
        let cmd: Cmd<Child> = Cmd::batch(vec![
            Cmd::task("a", || None),
            Cmd::every("b", Duration::from_secs(1), || None),
        ])
        .cancellable(&parent);
        parent.cancel();

        let Cmd::Batch(cmds) = cmd else {
            panic!("expected batch");
        };
        for cmd in cmds {
            let Cmd::Task(task) = cmd else {
                panic!("expected task");
            };
            assert!(task.token().is_cancelled());
        }
    }

    #[test]
    fn debounce_keeps_scope_through_map() {
        let scope = CancelScope::new("save");
        let cmd: Cmd<Child> = Cmd::debounce(&scope, "save", Duration::from_secs(1), || None);
        match cmd.map(Parent::Child) {
            Cmd::Debounce(mapped, task) => {
                assert_eq!(mapped.name(), "save");
                assert_eq!(task.schedule(), Schedule::After(Duration::from_secs(1)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
