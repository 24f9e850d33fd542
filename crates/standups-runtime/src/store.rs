#![forbid(unsafe_code)]

//! Threaded runtime that owns the state and executes commands.
//!
//! The [`Store`] is the single owner of the root state. [`Store::send`]
//! reduces an action and every synchronous follow-up ([`Cmd::Msg`]) before
//! it returns, so one action's reduction never interleaves with another's.
//! Background tasks run on their own threads and only report back by sending
//! actions through a channel; the owner drains them with
//! [`process_effects`](Store::process_effects) or
//! [`run_until_idle`](Store::run_until_idle).
//!
//! # Cancellation checkpoints
//!
//! A task is skipped if its token is cancelled before it starts waiting,
//! while it waits (the clock wakes up), or right before its work runs. Work
//! that has started always runs to completion.

use crate::cancellation::CancelToken;
use crate::clock::{Clock, Sleep, SystemClock};
use crate::program::{Cmd, Reducer, Task};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, trace, warn};

/// How long `run_until_idle` blocks on the channel between liveness checks.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Configuration for a [`Store`].
#[derive(Clone)]
pub struct StoreConfig {
    clock: Arc<dyn Clock>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }
}

impl StoreConfig {
    /// Use `clock` for delayed and repeating tasks.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("clock", &self.clock.name())
            .finish()
    }
}

struct RunningEffect {
    name: &'static str,
    thread: JoinHandle<()>,
}

/// Owner of the root state and executor of effects.
pub struct Store<R: Reducer> {
    reducer: R,
    state: R::State,
    clock: Arc<dyn Clock>,
    sender: mpsc::Sender<R::Action>,
    receiver: mpsc::Receiver<R::Action>,
    running: Vec<RunningEffect>,
    root: CancelToken,
}

impl<R: Reducer> Store<R> {
    /// Create a store using the system clock.
    pub fn new(reducer: R, state: R::State) -> Self {
        Self::with_config(reducer, state, StoreConfig::default())
    }

    pub fn with_config(reducer: R, state: R::State, config: StoreConfig) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            reducer,
            state,
            clock: config.clock,
            sender,
            receiver,
            running: Vec::new(),
            root: CancelToken::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &R::State {
        &self.state
    }

    /// The root reducer.
    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Reduce `action` and every synchronous follow-up, starting any
    /// background tasks it requests.
    pub fn send(&mut self, action: R::Action) {
        let _span = debug_span!("store.send").entered();
        self.reduce(action);
    }

    /// Reduce every action background tasks have reported so far.
    ///
    /// Returns the number of actions processed.
    pub fn process_effects(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(action) = self.receiver.try_recv() {
            self.reduce(action);
            processed += 1;
        }
        processed
    }

    /// Keep processing effect actions until no task is running.
    ///
    /// Returns `false` if tasks were still running at the deadline. Repeating
    /// tasks never finish on their own and must be cancelled first.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_effects();
            self.reap();
            if self.running.is_empty() {
                self.process_effects();
                if self.running.is_empty() {
                    return true;
                }
                continue;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(running = self.running.len(), "store not idle at deadline");
                return false;
            }
            if let Ok(action) = self.receiver.recv_timeout((deadline - now).min(IDLE_POLL)) {
                self.reduce(action);
            }
        }
    }

    /// Number of background tasks that have not finished yet.
    pub fn active_effects(&mut self) -> usize {
        self.reap();
        self.running.len()
    }

    /// Cancel every background task and wait for their threads.
    pub fn shutdown(&mut self) {
        self.root.cancel();
        for effect in self.running.drain(..) {
            if effect.thread.join().is_err() {
                warn!(effect = effect.name, "effect thread panicked");
            }
        }
    }

    fn reduce(&mut self, action: R::Action) {
        let cmd = self.reducer.reduce(&mut self.state, action);
        self.execute(cmd);
    }

    fn execute(&mut self, cmd: Cmd<R::Action>) {
        match cmd {
            Cmd::None => {}
            Cmd::Msg(action) => self.reduce(action),
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
            Cmd::Task(task) => self.spawn(task),
            Cmd::Debounce(scope, task) => {
                if scope.replace(task.token().clone()) {
                    crate::debug_trace!("debounce: cancelled pending request in {}", scope.name());
                    trace!(scope = scope.name(), "cancelled pending debounced request");
                }
                self.spawn(task);
            }
            Cmd::Cancel(scope) => scope.cancel(),
        }
    }

    fn spawn(&mut self, task: Task<R::Action>) {
        self.reap();
        self.root.attach(task.token());
        let name = task.name();
        let clock = Arc::clone(&self.clock);
        let sender = self.sender.clone();

        crate::debug_trace!("spawning effect: {} ({:?})", name, task.schedule());
        debug!(effect = name, schedule = ?task.schedule(), "starting effect");
        let spawned = thread::Builder::new()
            .name(format!("standups-effect-{name}"))
            .spawn(move || run_task(task, clock.as_ref(), &sender));
        match spawned {
            Ok(thread) => self.running.push(RunningEffect { name, thread }),
            Err(e) => warn!(effect = name, error = %e, "failed to spawn effect thread"),
        }
    }

    fn reap(&mut self) {
        let mut still_running = Vec::with_capacity(self.running.len());
        for effect in self.running.drain(..) {
            if effect.thread.is_finished() {
                if effect.thread.join().is_err() {
                    warn!(effect = effect.name, "effect thread panicked");
                }
            } else {
                still_running.push(effect);
            }
        }
        self.running = still_running;
    }
}

impl<R: Reducer> Drop for Store<R> {
    fn drop(&mut self) {
        self.root.cancel();
        // Don't join in drop to avoid blocking
    }
}

impl<R: Reducer> fmt::Debug for Store<R>
where
    R::State: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("clock", &self.clock.name())
            .field("running", &self.running.len())
            .finish()
    }
}

/// Body of an effect thread.
fn run_task<A>(mut task: Task<A>, clock: &dyn Clock, sender: &mpsc::Sender<A>) {
    loop {
        if task.token().is_cancelled() {
            crate::debug_trace!("effect cancelled before wait: {}", task.name());
            return;
        }
        if let Some(delay) = task.schedule().delay()
            && clock.sleep(delay, task.token()) == Sleep::Cancelled
        {
            crate::debug_trace!("effect cancelled during wait: {}", task.name());
            return;
        }
        if task.token().is_cancelled() {
            crate::debug_trace!("effect cancelled before work: {}", task.name());
            return;
        }
        if let Some(action) = task.run()
            && sender.send(action).is_err()
        {
            return;
        }
        if !task.schedule().repeats() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelScope;
    use crate::clock::ImmediateClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Fetch,
        Loaded(i32),
        Bump,
        Save,
        StartTicking,
        StopTicking,
        Tick,
    }

    struct Counter {
        save_scope: CancelScope,
        tick_scope: CancelScope,
        saves: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Counter {
        fn new(delay: Duration) -> Self {
            Self {
                save_scope: CancelScope::new("save"),
                tick_scope: CancelScope::new("tick"),
                saves: Arc::new(AtomicUsize::new(0)),
                delay,
            }
        }
    }

    #[derive(Debug, Default)]
    struct CounterState {
        value: i32,
        ticks: u32,
    }

    impl Reducer for Counter {
        type State = CounterState;
        type Action = Msg;

        fn reduce(&mut self, state: &mut CounterState, action: Msg) -> Cmd<Msg> {
            match action {
                Msg::Fetch => Cmd::task("fetch", || Some(Msg::Loaded(42))),
                Msg::Loaded(v) => {
                    state.value = v;
                    Cmd::none()
                }
                Msg::Bump => {
                    state.value += 1;
                    Cmd::msg(Msg::Save)
                }
                Msg::Save => {
                    let saves = Arc::clone(&self.saves);
                    Cmd::debounce(&self.save_scope, "save", self.delay, move || {
                        saves.fetch_add(1, Ordering::SeqCst);
                        None
                    })
                }
                Msg::StartTicking => {
                    let scope = self.tick_scope.clone();
                    let task = Task::every("tick", Duration::from_millis(2), || Some(Msg::Tick));
                    scope.replace(task.token().clone());
                    Cmd::Task(task)
                }
                Msg::StopTicking => Cmd::cancel(&self.tick_scope),
                Msg::Tick => {
                    state.ticks += 1;
                    Cmd::none()
                }
            }
        }
    }

    #[test]
    fn task_result_is_fed_back() {
        let mut store = Store::new(Counter::new(Duration::ZERO), CounterState::default());
        store.send(Msg::Fetch);
        assert!(store.run_until_idle(Duration::from_secs(5)));
        assert_eq!(store.state().value, 42);
    }

    #[test]
    fn msg_follow_ups_complete_within_send() {
        let mut store = Store::new(Counter::new(Duration::from_secs(60)), CounterState::default());
        store.send(Msg::Bump);
        assert_eq!(store.state().value, 1);
        assert!(store.reducer().save_scope.is_pending());
        store.shutdown();
    }

    #[test]
    fn debounce_collapses_burst_into_one_run() {
        let counter = Counter::new(Duration::from_millis(100));
        let saves = Arc::clone(&counter.saves);
        let mut store = Store::new(counter, CounterState::default());

        for _ in 0..5 {
            store.send(Msg::Bump);
        }
        assert!(store.run_until_idle(Duration::from_secs(5)));
        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.state().value, 5);
    }

    #[test]
    fn immediate_clock_runs_delayed_work() {
        let counter = Counter::new(Duration::from_secs(3600));
        let saves = Arc::clone(&counter.saves);
        let config = StoreConfig::default().with_clock(ImmediateClock);
        let mut store = Store::with_config(counter, CounterState::default(), config);

        store.send(Msg::Save);
        assert!(store.run_until_idle(Duration::from_secs(5)));
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_stops_repeating_task() {
        let mut store = Store::new(Counter::new(Duration::ZERO), CounterState::default());
        store.send(Msg::StartTicking);
        thread::sleep(Duration::from_millis(30));
        store.process_effects();
        assert!(store.state().ticks > 0);

        store.send(Msg::StopTicking);
        assert!(store.run_until_idle(Duration::from_secs(5)));
        let ticks = store.state().ticks;

        thread::sleep(Duration::from_millis(20));
        store.process_effects();
        assert_eq!(store.state().ticks, ticks);
    }

    #[test]
    fn shutdown_cancels_everything() {
        let counter = Counter::new(Duration::from_secs(3600));
        let saves = Arc::clone(&counter.saves);
        let mut store = Store::new(counter, CounterState::default());
        store.send(Msg::Save);
        store.send(Msg::StartTicking);
        assert_eq!(store.active_effects(), 2);

        store.shutdown();
        assert_eq!(store.active_effects(), 0);
        assert_eq!(saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn run_until_idle_times_out_with_live_timer() {
        let mut store = Store::new(Counter::new(Duration::ZERO), CounterState::default());
        store.send(Msg::StartTicking);
        assert!(!store.run_until_idle(Duration::from_millis(20)));
        store.shutdown();
    }
}
