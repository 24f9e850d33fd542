#![forbid(unsafe_code)]

//! Navigation stack of screen states.
//!
//! [`StackState`] is an ordered sequence of elements, each keyed by a
//! [`StackElementId`] assigned when the element is pushed. Keys come from a
//! per-stack counter that only moves forward, so a key is never reused even
//! after its element is popped.
//!
//! [`ForEachStack`] wraps the reducer of a single element and turns it into a
//! reducer of the whole stack:
//!
//! - `Element { id, action }` is routed to the element at `id`. A missing id
//!   is a routing miss (the element was popped while the action was in
//!   flight) and is ignored.
//! - Effects returned by an element are tied to that element's cancellation
//!   token and cancelled when the element leaves the stack.
//! - `Push`, `PopFrom` and `PopLast` mutate the stack itself.

use crate::cancellation::CancelToken;
use crate::program::{Cmd, Reducer};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Key of one element on a [`StackState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackElementId(u64);

impl StackElementId {
    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StackElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A state that can derive its own identity.
///
/// The derived identity addresses an element already on the stack by what it
/// shows rather than by where it sits. States without a natural identity
/// return `None` and can only be addressed by key.
pub trait StackElementState {
    type StateId: PartialEq + fmt::Debug;

    fn state_id(&self) -> Option<Self::StateId>;
}

/// Ordered, uniquely keyed stack of states.
#[derive(Clone)]
pub struct StackState<S> {
    elements: Vec<(StackElementId, S)>,
    next_id: u64,
}

impl<S> Default for StackState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StackState<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append `state` on top with a fresh key.
    pub fn push(&mut self, state: S) -> StackElementId {
        let id = StackElementId(self.next_id);
        self.next_id += 1;
        self.elements.push((id, state));
        id
    }

    /// Remove the top element.
    pub fn pop_last(&mut self) -> Option<(StackElementId, S)> {
        self.elements.pop()
    }

    /// Remove the element at `id` and every element above it.
    ///
    /// Returns the removed elements bottom-first; empty if `id` is absent.
    pub fn pop_from(&mut self, id: StackElementId) -> Vec<(StackElementId, S)> {
        match self.position(id) {
            Some(position) => self.elements.split_off(position),
            None => Vec::new(),
        }
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn contains(&self, id: StackElementId) -> bool {
        self.position(id).is_some()
    }

    /// Zero-based position from the bottom.
    pub fn position(&self, id: StackElementId) -> Option<usize> {
        self.elements.iter().position(|(key, _)| *key == id)
    }

    pub fn get(&self, id: StackElementId) -> Option<&S> {
        self.elements
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, state)| state)
    }

    pub fn get_mut(&mut self, id: StackElementId) -> Option<&mut S> {
        self.elements
            .iter_mut()
            .find(|(key, _)| *key == id)
            .map(|(_, state)| state)
    }

    /// Keys bottom to top.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = StackElementId> + ExactSizeIterator + '_ {
        self.elements.iter().map(|(id, _)| *id)
    }

    /// Elements bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (StackElementId, &S)> + '_ {
        self.elements.iter().map(|(id, state)| (*id, state))
    }

    pub fn last(&self) -> Option<(StackElementId, &S)> {
        self.elements.last().map(|(id, state)| (*id, state))
    }

    /// The element directly beneath the top one.
    pub fn second_to_last(&self) -> Option<(StackElementId, &S)> {
        self.elements
            .iter()
            .rev()
            .nth(1)
            .map(|(id, state)| (*id, state))
    }
}

impl<S: StackElementState> StackState<S> {
    /// Key of the topmost element whose derived identity is `state_id`.
    pub fn find_state(&self, state_id: &S::StateId) -> Option<StackElementId> {
        self.elements
            .iter()
            .rev()
            .find(|(_, state)| state.state_id().as_ref() == Some(state_id))
            .map(|(id, _)| *id)
    }
}

/// Equality of contents and keys; the key counter is ignored.
impl<S: PartialEq> PartialEq for StackState<S> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<S: fmt::Debug> fmt::Debug for StackState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.elements.iter().map(|(id, state)| (id, state)))
            .finish()
    }
}

/// Actions on a navigation stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackAction<S, A> {
    /// An action addressed to one element.
    Element { id: StackElementId, action: A },
    /// Push a new element on top.
    Push(S),
    /// Pop the element at `id` and everything above it.
    PopFrom { id: StackElementId },
    /// Pop the top element.
    PopLast,
}

/// Lifts an element reducer to a reducer over [`StackState`].
pub struct ForEachStack<R: Reducer> {
    element: R,
    scopes: HashMap<StackElementId, CancelToken>,
}

impl<R: Reducer> ForEachStack<R> {
    pub fn new(element: R) -> Self {
        Self {
            element,
            scopes: HashMap::new(),
        }
    }

    /// The wrapped element reducer.
    pub fn element(&self) -> &R {
        &self.element
    }

    /// Number of elements that currently own an effect scope.
    pub fn active_scopes(&self) -> usize {
        self.scopes.len()
    }

    /// Cancel the effects of every element no longer on `stack`.
    ///
    /// Returns how many scopes were released.
    pub fn reconcile(&mut self, stack: &StackState<R::State>) -> usize {
        if self.scopes.is_empty() {
            return 0;
        }
        let live: HashSet<StackElementId> = stack.ids().collect();
        let before = self.scopes.len();
        self.scopes.retain(|id, token| {
            if live.contains(id) {
                true
            } else {
                tracing::debug!(element = %id, "cancelling effects of popped stack element");
                token.cancel();
                false
            }
        });
        before - self.scopes.len()
    }
}

impl<R> Reducer for ForEachStack<R>
where
    R: Reducer,
    R::State: Send + 'static,
{
    type State = StackState<R::State>;
    type Action = StackAction<R::State, R::Action>;

    fn reduce(&mut self, stack: &mut Self::State, action: Self::Action) -> Cmd<Self::Action> {
        match action {
            StackAction::Element { id, action } => {
                let Some(state) = stack.get_mut(id) else {
                    tracing::trace!(element = %id, "stack action for missing element ignored");
                    return Cmd::none();
                };
                let token = self.scopes.entry(id).or_default().clone();
                self.element
                    .reduce(state, action)
                    .map(move |action| StackAction::Element { id, action })
                    .cancellable(&token)
            }
            StackAction::Push(state) => {
                let id = stack.push(state);
                tracing::debug!(element = %id, depth = stack.len(), "pushed stack element");
                Cmd::none()
            }
            StackAction::PopFrom { id } => {
                let removed = stack.pop_from(id);
                if removed.is_empty() {
                    tracing::trace!(element = %id, "pop for missing element ignored");
                } else {
                    tracing::debug!(element = %id, removed = removed.len(), "popped stack elements");
                }
                self.reconcile(stack);
                Cmd::none()
            }
            StackAction::PopLast => {
                if let Some((id, _)) = stack.pop_last() {
                    tracing::debug!(element = %id, "popped top stack element");
                }
                self.reconcile(stack);
                Cmd::none()
            }
        }
    }
}

impl<R: Reducer> Drop for ForEachStack<R> {
    fn drop(&mut self) {
        for token in self.scopes.values() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Screen {
        Counter(i32),
        Note,
    }

    impl StackElementState for Screen {
        type StateId = i32;

        fn state_id(&self) -> Option<i32> {
            match self {
                Screen::Counter(n) => Some(*n),
                Screen::Note => None,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum ScreenAction {
        Increment,
        StartTimer,
    }

    struct ScreenReducer;

    impl Reducer for ScreenReducer {
        type State = Screen;
        type Action = ScreenAction;

        fn reduce(&mut self, state: &mut Screen, action: ScreenAction) -> Cmd<ScreenAction> {
            match (state, action) {
                (Screen::Counter(n), ScreenAction::Increment) => {
                    *n += 1;
                    Cmd::none()
                }
                (_, ScreenAction::StartTimer) => {
                    Cmd::every("timer", Duration::from_secs(1), || Some(ScreenAction::Increment))
                }
                _ => Cmd::none(),
            }
        }
    }

    #[test]
    fn push_assigns_fresh_keys() {
        let mut stack = StackState::new();
        let a = stack.push(Screen::Note);
        let b = stack.push(Screen::Note);
        stack.pop_last();
        let c = stack.push(Screen::Note);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(stack.ids().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn pop_from_removes_element_and_everything_above() {
        let mut stack = StackState::new();
        let a = stack.push(Screen::Counter(1));
        let b = stack.push(Screen::Counter(2));
        let c = stack.push(Screen::Counter(3));

        let removed = stack.pop_from(b);
        assert_eq!(removed.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(stack.ids().collect::<Vec<_>>(), vec![a]);
        assert!(stack.pop_from(c).is_empty());
    }

    #[test]
    fn second_to_last_requires_two_elements() {
        let mut stack = StackState::new();
        assert!(stack.second_to_last().is_none());
        let a = stack.push(Screen::Counter(1));
        assert!(stack.second_to_last().is_none());
        stack.push(Screen::Note);
        assert_eq!(stack.second_to_last().map(|(id, _)| id), Some(a));
    }

    #[test]
    fn find_state_uses_derived_identity() {
        let mut stack = StackState::new();
        let a = stack.push(Screen::Counter(7));
        stack.push(Screen::Note);
        assert_eq!(stack.find_state(&7), Some(a));
        assert_eq!(stack.find_state(&8), None);
    }

    #[test]
    fn equality_ignores_key_counter() {
        let mut left = StackState::new();
        left.push(Screen::Note);
        let mut right = StackState::new();
        right.push(Screen::Note);
        assert_eq!(left, right);

        right.pop_last();
        right.push(Screen::Note);
        assert_ne!(left, right);
    }

    #[test]
    fn element_actions_are_routed_by_key() {
        let mut reducer = ForEachStack::new(ScreenReducer);
        let mut stack = StackState::new();
        let a = stack.push(Screen::Counter(0));
        let b = stack.push(Screen::Counter(10));

        let _ = reducer.reduce(
            &mut stack,
            StackAction::Element {
                id: b,
                action: ScreenAction::Increment,
            },
        );
        assert_eq!(stack.get(a), Some(&Screen::Counter(0)));
        assert_eq!(stack.get(b), Some(&Screen::Counter(11)));
    }

    #[test]
    fn missing_element_is_a_silent_miss() {
        let mut reducer = ForEachStack::new(ScreenReducer);
        let mut stack = StackState::new();
        let a = stack.push(Screen::Counter(0));
        stack.pop_last();

        let cmd = reducer.reduce(
            &mut stack,
            StackAction::Element {
                id: a,
                action: ScreenAction::Increment,
            },
        );
        assert!(cmd.is_none());
        assert!(stack.is_empty());
    }

    /// Records `(level, message, element)` for every event.
    struct TraceCapture(Arc<Mutex<Vec<(tracing::Level, String, String)>>>);

    #[derive(Default)]
    struct EventFields {
        message: String,
        element: String,
    }

    impl tracing::field::Visit for EventFields {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            match field.name() {
                "message" => self.message = format!("{value:?}"),
                "element" => self.element = format!("{value:?}"),
                _ => {}
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TraceCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            let mut fields = EventFields::default();
            event.record(&mut fields);
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), fields.message, fields.element));
        }
    }

    #[test]
    fn missing_element_is_traced() {
        use tracing_subscriber::layer::SubscriberExt;

        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(TraceCapture(Arc::clone(&events)));
        let mut reducer = ForEachStack::new(ScreenReducer);
        let mut stack = StackState::new();
        let a = stack.push(Screen::Counter(0));
        stack.pop_last();

        tracing::subscriber::with_default(subscriber, || {
            let _ = reducer.reduce(
                &mut stack,
                StackAction::Element {
                    id: a,
                    action: ScreenAction::Increment,
                },
            );
        });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (level, message, element) = &events[0];
        assert_eq!(*level, tracing::Level::TRACE);
        assert!(message.contains("missing element ignored"));
        assert_eq!(element, &a.to_string());
    }

    #[test]
    fn popping_cancels_element_effects_only() {
        let mut reducer = ForEachStack::new(ScreenReducer);
        let mut stack = StackState::new();
        let _ = reducer.reduce(&mut stack, StackAction::Push(Screen::Counter(0)));
        let _ = reducer.reduce(&mut stack, StackAction::Push(Screen::Counter(0)));
        let ids: Vec<_> = stack.ids().collect();

        let lower = reducer.reduce(
            &mut stack,
            StackAction::Element {
                id: ids[0],
                action: ScreenAction::StartTimer,
            },
        );
        let upper = reducer.reduce(
            &mut stack,
            StackAction::Element {
                id: ids[1],
                action: ScreenAction::StartTimer,
            },
        );
        let (Cmd::Task(lower), Cmd::Task(upper)) = (lower, upper) else {
            panic!("expected timer tasks");
        };
        assert_eq!(reducer.active_scopes(), 2);

        let _ = reducer.reduce(&mut stack, StackAction::PopLast);
        assert!(upper.token().is_cancelled());
        assert!(!lower.token().is_cancelled());
        assert_eq!(reducer.active_scopes(), 1);
    }

    #[test]
    fn reconcile_releases_scopes_popped_outside_the_reducer() {
        let mut reducer = ForEachStack::new(ScreenReducer);
        let mut stack = StackState::new();
        let id = stack.push(Screen::Counter(0));
        let cmd = reducer.reduce(
            &mut stack,
            StackAction::Element {
                id,
                action: ScreenAction::StartTimer,
            },
        );
        let Cmd::Task(task) = cmd else {
            panic!("expected timer task");
        };

        stack.clear();
        assert_eq!(reducer.reconcile(&stack), 1);
        assert!(task.token().is_cancelled());
    }
}
