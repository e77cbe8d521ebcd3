//! Finite automata over the events of an [`EventAlphabet`](crate::EventAlphabet).
//!
//! States are stored in a dense arena and referenced by [`StateIndex`];
//! transitions are adjacency lists of `(event, successor)` pairs sorted by
//! event, so the transition relation may be nondeterministic. All operations
//! take `&self` and return a new automaton.

use std::collections::{hash_map::Entry, HashMap, VecDeque};
use std::fmt;
use std::ops::Index;

use fixedbitset::FixedBitSet;

use crate::alphabet::{Event, EventSet};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateIndex(usize);

impl StateIndex {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transition to a successor state labelled with an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transition {
    event: Event,
    successor: StateIndex,
}

impl Transition {
    pub const fn new(event: Event, successor: StateIndex) -> Self {
        Self { event, successor }
    }

    pub const fn event(&self) -> Event {
        self.event
    }

    pub const fn successor(&self) -> StateIndex {
        self.successor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
    marked: bool,
    transitions: Vec<Transition>,
}

impl State {
    fn new(name: String, marked: bool) -> Self {
        Self {
            name,
            marked,
            transitions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Returns the outgoing transitions, sorted by event and successor.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns the successors of this state under the given event.
    pub fn successors(&self, event: Event) -> impl Iterator<Item = StateIndex> + '_ {
        let start = self.transitions.partition_point(|t| t.event < event);
        self.transitions[start..]
            .iter()
            .take_while(move |t| t.event == event)
            .map(|t| t.successor)
    }

    /// Returns the set of events with at least one outgoing transition.
    pub fn enabled_events(&self) -> EventSet {
        self.transitions.iter().map(|t| t.event).collect()
    }
}

/// Incrementally constructs an [`Automaton`].
#[derive(Debug, Default)]
pub struct AutomatonBuilder {
    states: Vec<State>,
    mapping: HashMap<String, StateIndex>,
    initial_state: Option<StateIndex>,
    events: EventSet,
}

impl AutomatonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fresh state without registering its name for [`Self::state`].
    pub fn add_state<S: Into<String>>(&mut self, name: S, marked: bool) -> StateIndex {
        let index = StateIndex(self.states.len());
        self.states.push(State::new(name.into(), marked));
        index
    }

    /// Returns the state with the given name, creating an unmarked state
    /// if it does not exist yet. The flag is true if the state is new.
    pub fn state(&mut self, name: &str) -> (StateIndex, bool) {
        match self.mapping.entry(name.to_owned()) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let index = StateIndex(self.states.len());
                self.states.push(State::new(entry.key().clone(), false));
                entry.insert(index);
                (index, true)
            }
        }
    }

    pub fn set_marked(&mut self, state: StateIndex, marked: bool) {
        self.states[state.0].marked = marked;
    }

    pub fn set_initial_state(&mut self, state: StateIndex) {
        self.initial_state = Some(state);
    }

    /// Adds an event to the alphabet of the automaton, even if no
    /// transition is labelled with it.
    pub fn add_event(&mut self, event: Event) {
        self.events.insert(event);
    }

    pub fn add_transition(&mut self, from: StateIndex, event: Event, to: StateIndex) {
        self.events.insert(event);
        self.states[from.0]
            .transitions
            .push(Transition::new(event, to));
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Finishes the construction. Unreachable states are kept,
    /// use [`Automaton::prune_unreachable`] to remove them.
    pub fn build(mut self) -> Automaton {
        for state in &mut self.states {
            state.transitions.sort_unstable();
            state.transitions.dedup();
        }
        let initial_state = self.initial_state.filter(|s| s.0 < self.states.len());
        Automaton {
            states: self.states,
            initial_state,
            events: self.events,
        }
    }
}

/// A finite automaton (S, s0, Σ, δ, M).
///
/// An automaton without initial state is empty; this is how the absence of a
/// supervisor is represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    states: Vec<State>,
    initial_state: Option<StateIndex>,
    events: EventSet,
}

impl Automaton {
    pub fn builder() -> AutomatonBuilder {
        AutomatonBuilder::new()
    }

    /// Returns an automaton with the given alphabet and no states.
    pub fn empty(events: EventSet) -> Self {
        Self {
            states: Vec::new(),
            initial_state: None,
            events,
        }
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    pub fn initial_state(&self) -> Option<StateIndex> {
        self.initial_state
    }

    /// Returns the alphabet of this automaton.
    pub fn events(&self) -> &EventSet {
        &self.events
    }

    /// Returns true if the automaton has no reachable state.
    pub fn is_empty(&self) -> bool {
        self.initial_state.is_none()
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn state_indices(&self) -> impl Iterator<Item = StateIndex> {
        (0..self.num_states()).map(StateIndex)
    }

    pub fn states_with_index(&self) -> impl Iterator<Item = (StateIndex, &State)> {
        self.states().enumerate().map(|(i, s)| (StateIndex(i), s))
    }

    pub fn successors(&self, state: StateIndex, event: Event) -> impl Iterator<Item = StateIndex> + '_ {
        self[state].successors(event)
    }

    pub fn enabled_events(&self, state: StateIndex) -> EventSet {
        self[state].enabled_events()
    }

    /// Returns true if every state has at most one successor per event.
    pub fn is_deterministic(&self) -> bool {
        self.states.iter().all(|s| {
            s.transitions
                .windows(2)
                .all(|w| w[0].event != w[1].event)
        })
    }

    /// Returns for each state the list of states with a transition into it.
    pub(crate) fn predecessors(&self) -> Vec<Vec<StateIndex>> {
        let mut predecessors = vec![Vec::new(); self.num_states()];
        for (index, state) in self.states_with_index() {
            for transition in &state.transitions {
                let list: &mut Vec<StateIndex> = &mut predecessors[transition.successor.0];
                if list.last() != Some(&index) {
                    list.push(index);
                }
            }
        }
        // states are visited in ascending order, so each list is sorted
        for list in &mut predecessors {
            list.dedup();
        }
        predecessors
    }

    pub(crate) fn reachable_states(&self) -> FixedBitSet {
        let mut allowed = FixedBitSet::with_capacity(self.num_states());
        allowed.insert_range(..);
        self.reachable_within(&allowed)
    }

    /// Returns the states reachable from the initial state
    /// when only visiting states in `allowed`.
    pub(crate) fn reachable_within(&self, allowed: &FixedBitSet) -> FixedBitSet {
        let n = self.num_states();
        let mut reachable = FixedBitSet::with_capacity(n);
        let initial_state = match self.initial_state {
            Some(s) if allowed.contains(s.0) => s,
            _ => return reachable,
        };
        let mut queue = VecDeque::with_capacity(n);
        reachable.insert(initial_state.0);
        queue.push_back(initial_state);
        while let Some(state_index) = queue.pop_front() {
            for transition in &self[state_index].transitions {
                let successor = transition.successor.0;
                if allowed.contains(successor) && !reachable.put(successor) {
                    queue.push_back(transition.successor);
                }
            }
        }
        reachable
    }

    /// Returns a copy containing only the states in `keep`, together with the
    /// mapping from old to new state indices.
    ///
    /// Transitions into removed states are dropped. If the initial state is
    /// removed, the result is empty.
    pub(crate) fn retain_states(&self, keep: &FixedBitSet) -> (Self, Vec<Option<StateIndex>>) {
        let n = self.num_states();
        let mut state_mapping = Vec::with_capacity(n);
        let mut new_states: Vec<State> = Vec::with_capacity(n);
        for (index, state) in self.states_with_index() {
            if keep.contains(index.0) {
                state_mapping.push(Some(StateIndex(new_states.len())));
                new_states.push(State::new(state.name.clone(), state.marked));
            } else {
                state_mapping.push(None);
            }
        }
        for (index, state) in self.states_with_index() {
            if let Some(new_index) = state_mapping[index.0] {
                new_states[new_index.0].transitions = state
                    .transitions
                    .iter()
                    .filter_map(|t| state_mapping[t.successor.0].map(|s| Transition::new(t.event, s)))
                    .collect();
            }
        }
        let initial_state = self.initial_state.and_then(|s| state_mapping[s.0]);
        if initial_state.is_none() {
            let mapping = vec![None; n];
            return (Self::empty(self.events.clone()), mapping);
        }
        let automaton = Self {
            states: new_states,
            initial_state,
            events: self.events.clone(),
        };
        (automaton, state_mapping)
    }

    /// Removes all states not reachable from the initial state.
    pub fn prune_unreachable(&self) -> Self {
        let keep = self.reachable_states();
        self.retain_states(&keep).0
    }

    /// Adds a self-loop for every event of `events` that is not in the
    /// alphabet of this automaton, at every state.
    ///
    /// Events already in the alphabet keep their meaning: where they are not
    /// enabled they stay disabled. Hence the language restricted to the
    /// original alphabet is unchanged. The new alphabet is the union of both.
    pub fn extend_alphabet(&self, events: &EventSet) -> Self {
        let additional = events.difference(&self.events);
        let mut automaton = self.clone();
        automaton.events.union_with(events);
        if !additional.is_empty() {
            for (index, state) in automaton.states.iter_mut().enumerate() {
                state.transitions.extend(
                    additional
                        .iter()
                        .map(|e| Transition::new(e, StateIndex(index))),
                );
                state.transitions.sort_unstable();
            }
        }
        automaton.prune_unreachable()
    }

    /// Returns a copy where the alphabet additionally contains `events`,
    /// without adding transitions.
    pub fn with_events(&self, events: &EventSet) -> Self {
        let mut automaton = self.clone();
        automaton.events.union_with(events);
        automaton
    }

    /// Removes all transitions labelled with events outside of `events` and
    /// restricts the alphabet accordingly.
    pub fn restrict_to(&self, events: &EventSet) -> Self {
        let mut automaton = self.clone();
        automaton.events = self.events.intersection(events);
        for state in &mut automaton.states {
            state.transitions.retain(|t| events.contains(t.event));
        }
        automaton.prune_unreachable()
    }

    /// Returns the reachable states in breadth-first order from the initial
    /// state, and for every state its position in this order.
    pub(crate) fn breadth_first_order(&self) -> (Vec<StateIndex>, Vec<Option<usize>>) {
        let n = self.num_states();
        let mut order = Vec::with_capacity(n);
        let mut position = vec![None; n];
        if let Some(initial_state) = self.initial_state {
            let mut queue = VecDeque::with_capacity(n);
            position[initial_state.0] = Some(0);
            order.push(initial_state);
            queue.push_back(initial_state);
            while let Some(state_index) = queue.pop_front() {
                for transition in &self[state_index].transitions {
                    let successor = transition.successor;
                    if position[successor.0].is_none() {
                        position[successor.0] = Some(order.len());
                        order.push(successor);
                        queue.push_back(successor);
                    }
                }
            }
        }
        (order, position)
    }

    /// Returns a copy of the reachable part where states are numbered in
    /// breadth-first order from the initial state and named by their number.
    pub fn renumbered(&self) -> Self {
        let (order, position) = self.breadth_first_order();
        let states = order
            .iter()
            .enumerate()
            .map(|(new_index, &old_index)| {
                let old_state = &self[old_index];
                let mut state = State::new(new_index.to_string(), old_state.marked);
                state.transitions = old_state
                    .transitions
                    .iter()
                    .filter_map(|t| position[t.successor.0].map(|s| Transition::new(t.event, StateIndex(s))))
                    .collect();
                state.transitions.sort_unstable();
                state
            })
            .collect::<Vec<_>>();
        Self {
            initial_state: (!states.is_empty()).then(|| StateIndex(0)),
            states,
            events: self.events.clone(),
        }
    }

    /// Returns the set of states reached by all runs on the trace.
    fn run(&self, trace: &[Event]) -> FixedBitSet {
        let mut current = FixedBitSet::with_capacity(self.num_states());
        if let Some(initial_state) = self.initial_state {
            current.insert(initial_state.0);
        }
        for &event in trace {
            let mut next = FixedBitSet::with_capacity(self.num_states());
            for state in current.ones() {
                next.extend(self.successors(StateIndex(state), event).map(|s| s.0));
            }
            current = next;
        }
        current
    }

    /// Returns true if some run on the trace exists, i.e. the trace is in the
    /// prefix-closed language of this automaton.
    pub fn generates(&self, trace: &[Event]) -> bool {
        !self.is_empty() && self.run(trace).ones().next().is_some()
    }

    /// Returns true if some run on the trace ends in a marked state.
    pub fn accepts(&self, trace: &[Event]) -> bool {
        self.run(trace).ones().any(|s| self.states[s].marked)
    }
}

impl Index<StateIndex> for Automaton {
    type Output = State;

    fn index(&self, index: StateIndex) -> &Self::Output {
        &self.states[index.0]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alphabet::EventAlphabet;

    /// Builds an automaton from a list of `(from, event, to)` transitions over
    /// named states; the first state mentioned is initial and states in
    /// `marked` are marked.
    pub(crate) fn automaton(
        alphabet: &EventAlphabet,
        transitions: &[(&str, &str, &str)],
        marked: &[&str],
    ) -> Automaton {
        let mut builder = Automaton::builder();
        for &(from, event, to) in transitions {
            let (from, _) = builder.state(from);
            let (to, _) = builder.state(to);
            builder.add_transition(from, alphabet.event(event).unwrap(), to);
        }
        for &name in marked {
            let (state, _) = builder.state(name);
            builder.set_marked(state, true);
        }
        if builder.num_states() > 0 {
            builder.set_initial_state(StateIndex(0));
        }
        builder.build()
    }

    pub(crate) fn trace(alphabet: &EventAlphabet, names: &[&str]) -> Vec<Event> {
        names.iter().map(|n| alphabet.event(n).unwrap()).collect()
    }

    /// Returns all traces over the alphabet up to the given length.
    pub(crate) fn traces(alphabet: &EventAlphabet, max_length: usize) -> Vec<Vec<Event>> {
        let mut all = vec![Vec::new()];
        let mut last = vec![Vec::new()];
        for _ in 0..max_length {
            let mut next = Vec::new();
            for prefix in &last {
                for event in alphabet.iter() {
                    let mut trace: Vec<Event> = prefix.clone();
                    trace.push(event);
                    next.push(trace);
                }
            }
            all.extend(next.iter().cloned());
            last = next;
        }
        all
    }

    /// Asserts that both automata generate and accept the same traces up to the given length.
    pub(crate) fn assert_same_language(
        left: &Automaton,
        right: &Automaton,
        alphabet: &EventAlphabet,
        max_length: usize,
    ) {
        for trace in traces(alphabet, max_length) {
            assert_eq!(left.generates(&trace), right.generates(&trace), "generates {:?}", trace);
            assert_eq!(left.accepts(&trace), right.accepts(&trace), "accepts {:?}", trace);
        }
    }

    fn alphabet() -> EventAlphabet {
        EventAlphabet::fully_controlled(&["a", "b", "c"]).unwrap()
    }

    #[test]
    fn test_prune_unreachable_is_idempotent() {
        let alphabet = alphabet();
        let mut builder = Automaton::builder();
        let s0 = builder.add_state("s0", true);
        let s1 = builder.add_state("s1", false);
        let s2 = builder.add_state("s2", true);
        let s3 = builder.add_state("s3", false);
        let a = alphabet.event("a").unwrap();
        let b = alphabet.event("b").unwrap();
        builder.add_transition(s0, a, s1);
        builder.add_transition(s2, b, s0);
        builder.add_transition(s3, a, s2);
        builder.set_initial_state(s0);
        let automaton = builder.build();

        let pruned = automaton.prune_unreachable();
        assert_eq!(pruned.num_states(), 2);
        assert_eq!(pruned.num_transitions(), 1);
        assert_eq!(pruned.prune_unreachable(), pruned);
        // alphabet is kept even if the b transition is gone
        assert!(pruned.events().contains(b));
    }

    #[test]
    fn test_empty_automaton() {
        let automaton = Automaton::builder().build();
        assert!(automaton.is_empty());
        assert!(automaton.prune_unreachable().is_empty());
        assert!(!automaton.generates(&[]));
        assert!(!automaton.accepts(&[]));
    }

    #[test]
    fn test_nondeterministic_runs() {
        let alphabet = alphabet();
        let automaton = automaton(
            &alphabet,
            &[("0", "a", "1"), ("0", "a", "2"), ("1", "b", "3"), ("2", "c", "3")],
            &["3"],
        );
        assert!(!automaton.is_deterministic());
        assert_eq!(automaton.successors(StateIndex(0), alphabet.event("a").unwrap()).count(), 2);
        assert!(automaton.accepts(&trace(&alphabet, &["a", "b"])));
        assert!(automaton.accepts(&trace(&alphabet, &["a", "c"])));
        assert!(automaton.generates(&trace(&alphabet, &["a"])));
        assert!(!automaton.accepts(&trace(&alphabet, &["a"])));
        assert!(!automaton.generates(&trace(&alphabet, &["b"])));
    }

    #[test]
    fn test_extend_alphabet_preserves_language() {
        let alphabet = alphabet();
        let original = automaton(&alphabet, &[("0", "a", "1"), ("1", "b", "0")], &["0"]);
        let extended = original.extend_alphabet(&alphabet.events());
        assert_eq!(extended.events(), &alphabet.events());

        // the new event c is allowed everywhere
        assert!(extended.accepts(&trace(&alphabet, &["c", "a", "c", "b", "c"])));
        // a and b keep their restrictions
        assert!(!extended.generates(&trace(&alphabet, &["b"])));
        assert!(!extended.generates(&trace(&alphabet, &["a", "a"])));

        let words: [&[&str]; 6] = [&[], &["a"], &["a", "b"], &["b"], &["a", "a"], &["a", "b", "a"]];
        for word in words.iter() {
            let word = trace(&alphabet, word);
            assert_eq!(original.accepts(&word), extended.accepts(&word));
            assert_eq!(original.generates(&word), extended.generates(&word));
        }
    }

    #[test]
    fn test_restrict_to_drops_transitions() {
        let alphabet = alphabet();
        let original = automaton(&alphabet, &[("0", "a", "1"), ("0", "b", "2"), ("2", "a", "0")], &["1"]);
        let a = alphabet.event("a").unwrap();
        let restricted = original.restrict_to(&[a].iter().copied().collect());
        assert_eq!(restricted.num_states(), 2);
        assert_eq!(restricted.events().len(), 1);
        assert!(restricted.accepts(&trace(&alphabet, &["a"])));
        assert!(!restricted.generates(&trace(&alphabet, &["b"])));
    }

    #[test]
    fn test_retain_states_maps_indices() {
        let alphabet = alphabet();
        let automaton = automaton(
            &alphabet,
            &[("0", "a", "1"), ("1", "b", "2"), ("0", "c", "2")],
            &[],
        );
        let mut keep = FixedBitSet::with_capacity(3);
        keep.insert(0);
        keep.insert(2);
        let (retained, mapping) = automaton.retain_states(&keep);
        assert_eq!(mapping, vec![Some(StateIndex(0)), None, Some(StateIndex(1))]);
        assert_eq!(retained.num_transitions(), 1);
        assert_eq!(retained[StateIndex(1)].name(), "2");

        keep.set(0, false);
        assert!(automaton.retain_states(&keep).0.is_empty());
    }

    #[test]
    fn test_renumbered_starts_at_initial_state() {
        let alphabet = alphabet();
        let mut builder = Automaton::builder();
        let x = builder.add_state("x", false);
        let y = builder.add_state("y", true);
        builder.add_transition(y, alphabet.event("a").unwrap(), x);
        builder.set_initial_state(y);
        let renumbered = builder.build().renumbered();
        assert_eq!(renumbered.initial_state(), Some(StateIndex(0)));
        assert_eq!(renumbered[StateIndex(0)].name(), "0");
        assert!(renumbered[StateIndex(0)].is_marked());
        assert_eq!(renumbered[StateIndex(0)].transitions()[0].successor(), StateIndex(1));
    }
}
