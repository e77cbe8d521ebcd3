//! Lazy construction of synchronous products of automata.

pub(crate) mod queue;

use std::collections::{hash_map::Entry, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

use log::trace;
use tinyvec::TinyVec;

use crate::alphabet::{Event, EventSet};
use crate::automaton::{Automaton, AutomatonBuilder, StateIndex};
use crate::budget::Budget;
use crate::error::Error;
use crate::options::{ExplorationStrategy, SynthesisOptions};
use queue::{ExplorationQueue, StrategyQueue};

/// The component states of a product state, one per operand.
pub(crate) type StateTuple = TinyVec<[StateIndex; 4]>;

#[derive(Debug, Default, Clone)]
pub struct ExplorationStats {
    states: usize,
    transitions: usize,
    time: Duration,
}

impl ExplorationStats {
    fn new(states: usize, transitions: usize, time: Duration) -> Self {
        Self {
            states,
            transitions,
            time,
        }
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn time(&self) -> Duration {
        self.time
    }
}

impl std::ops::AddAssign for ExplorationStats {
    fn add_assign(&mut self, rhs: Self) {
        self.states += rhs.states;
        self.transitions += rhs.transitions;
        self.time += rhs.time;
    }
}

impl fmt::Display for ExplorationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|Q| = {}, |T| = {}, exploration time: {:.2}",
            self.states(),
            self.transitions(),
            self.time().as_secs_f32(),
        )
    }
}

/// An explored product together with the component tuple of every state.
pub(crate) struct Product {
    pub(crate) automaton: Automaton,
    pub(crate) tuples: Vec<StateTuple>,
    pub(crate) stats: ExplorationStats,
}

pub(crate) struct ProductConstructor<'a, Q> {
    operands: &'a [&'a Automaton],
    /// For every event of the product alphabet, the operands that synchronize on it.
    participants: Vec<(Event, Vec<usize>)>,
    events: EventSet,
    builder: AutomatonBuilder,
    tuples: Vec<StateTuple>,
    mapping: HashMap<StateTuple, StateIndex>,
    queue: Q,
    budget: &'a Budget,
}

impl<'a, Q: ExplorationQueue<StateIndex>> ProductConstructor<'a, Q> {
    pub(crate) fn new(operands: &'a [&'a Automaton], queue: Q, budget: &'a Budget) -> Self {
        let mut events = EventSet::new();
        for operand in operands {
            events.union_with(operand.events());
        }
        let participants = events
            .iter()
            .map(|e| {
                let indices = operands
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.events().contains(e))
                    .map(|(i, _)| i)
                    .collect();
                (e, indices)
            })
            .collect();
        let mut builder = AutomatonBuilder::new();
        for event in events.iter() {
            builder.add_event(event);
        }
        Self {
            operands,
            participants,
            events,
            builder,
            tuples: Vec::new(),
            mapping: HashMap::new(),
            queue,
            budget,
        }
    }

    /// Returns the index of the product state for the tuple, adding it if it is new.
    fn add_tuple(&mut self, tuple: StateTuple) -> Result<(StateIndex, bool), Error> {
        match self.mapping.entry(tuple) {
            Entry::Occupied(entry) => Ok((*entry.get(), false)),
            Entry::Vacant(entry) => {
                self.budget.check_states(self.tuples.len() + 1)?;
                let tuple = entry.key();
                let marked = tuple
                    .iter()
                    .zip(self.operands)
                    .all(|(&s, a)| a[s].is_marked());
                let index = self
                    .builder
                    .add_state(tuple_name(self.operands, tuple), marked);
                self.tuples.push(tuple.clone());
                entry.insert(index);
                self.queue.push(index);
                Ok((index, true))
            }
        }
    }

    /// Explores all product states reachable from the tuple of initial states.
    ///
    /// If some operand is empty, the product is empty.
    pub(crate) fn explore(mut self) -> Result<Product, Error> {
        let start = Instant::now();
        let initial_tuple: Option<StateTuple> =
            self.operands.iter().map(|a| a.initial_state()).collect();
        let initial_tuple = match initial_tuple {
            Some(tuple) => tuple,
            None => {
                return Ok(Product {
                    automaton: Automaton::empty(self.events),
                    tuples: Vec::new(),
                    stats: ExplorationStats::default(),
                })
            }
        };
        let (initial_state, _) = self.add_tuple(initial_tuple)?;
        self.builder.set_initial_state(initial_state);

        let participants = std::mem::take(&mut self.participants);
        let mut explored_transitions = 0;
        let mut choices: Vec<Vec<StateIndex>> = Vec::new();
        while let Some(state_index) = self.queue.pop() {
            self.budget.check()?;
            let tuple = self.tuples[state_index.index()].clone();
            for (event, indices) in &participants {
                let event = *event;
                choices.clear();
                choices.extend(
                    indices
                        .iter()
                        .map(|&i| self.operands[i].successors(tuple[i], event).collect()),
                );
                if choices.iter().any(Vec::is_empty) {
                    continue;
                }
                // enumerate the cartesian product of the component successors
                let mut counters = vec![0; choices.len()];
                'product: loop {
                    let mut successor = tuple.clone();
                    for (k, &i) in indices.iter().enumerate() {
                        successor[i] = choices[k][counters[k]];
                    }
                    let (successor_index, _) = self.add_tuple(successor)?;
                    self.builder
                        .add_transition(state_index, event, successor_index);
                    explored_transitions += 1;

                    let mut k = 0;
                    loop {
                        if k == counters.len() {
                            break 'product;
                        }
                        counters[k] += 1;
                        if counters[k] < choices[k].len() {
                            break;
                        }
                        counters[k] = 0;
                        k += 1;
                    }
                }
            }
        }
        let stats = ExplorationStats::new(self.tuples.len(), explored_transitions, start.elapsed());
        trace!("Explored product of {} automata: {}", self.operands.len(), stats);
        Ok(Product {
            automaton: self.builder.build(),
            tuples: self.tuples,
            stats,
        })
    }
}

fn tuple_name(operands: &[&Automaton], tuple: &StateTuple) -> String {
    let names: Vec<&str> = tuple
        .iter()
        .zip(operands)
        .map(|(&s, a)| a[s].name())
        .collect();
    format!("({})", names.join(","))
}

/// Explores the product of the operands with the given strategy and budget.
pub(crate) fn product(
    operands: &[&Automaton],
    strategy: ExplorationStrategy,
    budget: &Budget,
) -> Result<Product, Error> {
    let queue = StrategyQueue::new(strategy, 1024);
    ProductConstructor::new(operands, queue, budget).explore()
}

/// Computes the synchronous product of two automata.
///
/// Events shared by both alphabets synchronize, all other events interleave.
/// A product state is marked if both component states are marked.
///
/// # Errors
///
/// Never fails without resource limits; the signature matches [`compose_with`].
pub fn compose(a: &Automaton, b: &Automaton) -> Result<Automaton, Error> {
    compose_all([a, b])
}

/// Computes the synchronous product of all automata, without resource limits.
pub fn compose_all<'a, I>(automata: I) -> Result<Automaton, Error>
where
    I: IntoIterator<Item = &'a Automaton>,
{
    compose_with(automata, &SynthesisOptions::default())
}

/// Computes the synchronous product of all automata, using the exploration
/// strategy and resource limits of the options.
///
/// A single automaton is returned as is, after removal of unreachable states.
///
/// # Errors
///
/// Returns [`Error::NoOperands`] if no automaton is given, and
/// [`Error::ResourceExhausted`] or [`Error::Aborted`] if the exploration
/// exceeds the limits of the options.
pub fn compose_with<'a, I>(automata: I, options: &SynthesisOptions) -> Result<Automaton, Error>
where
    I: IntoIterator<Item = &'a Automaton>,
{
    let operands: Vec<&Automaton> = automata.into_iter().collect();
    let budget = Budget::of(options);
    Ok(compose_in(&operands, options.exploration_strategy, &budget)?.0)
}

/// Composes the operands within the given budget.
pub(crate) fn compose_in(
    operands: &[&Automaton],
    strategy: ExplorationStrategy,
    budget: &Budget,
) -> Result<(Automaton, ExplorationStats), Error> {
    match operands {
        [] => Err(Error::NoOperands("composition")),
        [single] => {
            let automaton = single.prune_unreachable();
            budget.check_states(automaton.num_states())?;
            Ok((automaton, ExplorationStats::default()))
        }
        _ => {
            let explored = product(operands, strategy, budget)?;
            Ok((explored.automaton, explored.stats))
        }
    }
}
