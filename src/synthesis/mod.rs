//! Computation of the supremal controllable and normal sublanguage of a
//! specification with respect to a plant.

mod region;

use std::fmt;
use std::time::Duration;

use fixedbitset::FixedBitSet;
use log::{debug, info, trace};
use rayon::prelude::*;

use crate::alphabet::{EventAlphabet, EventSet};
use crate::automaton::{Automaton, AutomatonBuilder, StateIndex};
use crate::budget::Budget;
use crate::constructor;
use crate::error::Error;
use crate::observer;
use crate::options::{SynthesisMode, SynthesisOptions};
use region::StateRegion;

/// The name of the sink state reached on a violation of the specification.
const ILLEGAL_STATE: &str = "ERROR";

/// A supervisor on the full alphabet.
///
/// Besides the automaton, it records for every state the events that the
/// plant enables in the corresponding plant state, which is needed to decide
/// whether the supervisor may be projected onto the observable events.
#[derive(Debug, Clone)]
pub struct Supervisor {
    automaton: Automaton,
    plant_enabled: Vec<EventSet>,
}

impl Supervisor {
    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    /// Returns the events enabled by the plant in the plant state of `state`.
    pub fn plant_enabled(&self, state: StateIndex) -> &EventSet {
        &self.plant_enabled[state.index()]
    }

    /// Returns the events the supervisor disables at `state` although the plant enables them.
    pub fn disabled_events(&self, state: StateIndex) -> EventSet {
        self.plant_enabled(state)
            .difference(&self.automaton.enabled_events(state))
    }
}

/// Statistics of one run of the fixed point.
#[derive(Debug, Default, Clone)]
pub struct FixedPointStats {
    product_states: usize,
    refined_states: usize,
    iterations: usize,
    time: Duration,
}

impl FixedPointStats {
    /// Returns the number of states of the product of plant and specification.
    pub fn product_states(&self) -> usize {
        self.product_states
    }

    /// Returns the number of states after refinement by the observer, if normality is enforced.
    pub fn refined_states(&self) -> usize {
        self.refined_states
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn time(&self) -> Duration {
        self.time
    }
}

impl fmt::Display for FixedPointStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|Q| = {}, refined |Q| = {}, iterations: {}, time: {:.2}",
            self.product_states,
            self.refined_states,
            self.iterations,
            self.time.as_secs_f32(),
        )
    }
}

/// Completes the specification over its own events and `events`.
///
/// Events the specification does not know become self-loops. Events of the
/// specification that are disabled in some state lead to an illegal sink
/// state, which is returned together with the completed automaton and
/// enables every event.
pub(crate) fn complete_specification(
    specification: &Automaton,
    events: &EventSet,
) -> (Automaton, StateIndex) {
    let events = specification.events().union(events);
    let mut builder = AutomatonBuilder::new();
    for event in events.iter() {
        builder.add_event(event);
    }
    for state in specification.states() {
        builder.add_state(state.name(), state.is_marked());
    }
    let illegal = builder.add_state(ILLEGAL_STATE, false);
    for (index, state) in specification.states_with_index() {
        let enabled = state.enabled_events();
        for transition in state.transitions() {
            builder.add_transition(index, transition.event(), transition.successor());
        }
        for event in events.iter().filter(|&e| !enabled.contains(e)) {
            let target = if specification.events().contains(event) {
                illegal
            } else {
                index
            };
            builder.add_transition(index, event, target);
        }
    }
    for event in events.iter() {
        builder.add_transition(illegal, event, illegal);
    }
    if let Some(initial_state) = specification.initial_state() {
        builder.set_initial_state(initial_state);
    }
    (builder.build(), illegal)
}

/// The states of the composed automaton sharing one observation estimate.
struct Classes {
    class_of: Vec<usize>,
    members: Vec<Vec<StateIndex>>,
}

struct FixedPoint<'a> {
    automaton: &'a Automaton,
    illegal: FixedBitSet,
    classes: Option<Classes>,
    uncontrollable: EventSet,
    mode: SynthesisMode,
    prefix_closed: bool,
}

impl<'a> FixedPoint<'a> {
    fn is_bad(&self, state: StateIndex, candidate: &StateRegion, coreachable: Option<&StateRegion>) -> bool {
        if self.illegal.contains(state.index()) {
            return true;
        }
        if coreachable.map_or(false, |region| !region[state]) {
            return true;
        }
        // the completed specification is total, so every uncontrollable
        // event of the plant has a transition here
        self.mode.enforces_controllability()
            && self.automaton[state]
                .transitions()
                .iter()
                .any(|t| self.uncontrollable.contains(t.event()) && !candidate[t.successor()])
    }

    /// Computes the states to remove in this sweep from a snapshot of the candidate set.
    fn sweep(&self, candidate: &StateRegion, predecessors: &[Vec<StateIndex>]) -> Vec<StateIndex> {
        let coreachable = (!self.prefix_closed).then(|| candidate.coreachable(self.automaton, predecessors));
        let bad: Vec<StateIndex> = (0..self.automaton.num_states())
            .into_par_iter()
            .map(StateIndex::new)
            .filter(|&q| candidate[q] && self.is_bad(q, candidate, coreachable.as_ref()))
            .collect();
        match &self.classes {
            Some(classes) if !bad.is_empty() => {
                let mut bad_classes = FixedBitSet::with_capacity(classes.members.len());
                for q in &bad {
                    bad_classes.insert(classes.class_of[q.index()]);
                }
                bad_classes
                    .ones()
                    .flat_map(|c| classes.members[c].iter().copied())
                    .filter(|&q| candidate[q])
                    .collect()
            }
            _ => bad,
        }
    }

    fn run(&self, budget: &Budget) -> Result<(StateRegion, usize), Error> {
        let predecessors = if self.prefix_closed {
            Vec::new()
        } else {
            self.automaton.predecessors()
        };
        let mut candidate = StateRegion::full(self.automaton.num_states());
        let mut iteration = 0;
        loop {
            iteration += 1;
            budget.check_iteration(iteration)?;
            let bad = self.sweep(&candidate, &predecessors);
            trace!(
                "Sweep {}: removing {} of {} candidate states",
                iteration,
                bad.len(),
                candidate.size()
            );
            if bad.is_empty() {
                return Ok((candidate, iteration));
            }
            for q in bad {
                candidate.remove(q);
            }
        }
    }
}

/// Computes the supremal sublanguage of the specification with respect to the
/// plant, enforcing the closure properties of the synthesis mode.
///
/// The specification is completed against the plant before composition, so
/// it only restricts the events of its own alphabet. Returns `None` if the
/// supremal sublanguage is empty.
///
/// # Errors
///
/// Returns [`Error::ResourceExhausted`] or [`Error::Aborted`] if the limits
/// of the options are exceeded.
pub fn supremal_sublanguage(
    plant: &Automaton,
    specification: &Automaton,
    alphabet: &EventAlphabet,
    options: &SynthesisOptions,
) -> Result<Option<Supervisor>, Error> {
    Ok(supremal_with(plant, specification, alphabet, options, &Budget::of(options))?.0)
}

pub(crate) fn supremal_with(
    plant: &Automaton,
    specification: &Automaton,
    alphabet: &EventAlphabet,
    options: &SynthesisOptions,
    budget: &Budget,
) -> Result<(Option<Supervisor>, FixedPointStats), Error> {
    let start = budget.elapsed();
    let strategy = options.exploration_strategy;
    info!("Computing supremal {} sublanguage", options.mode);

    // the plant synchronizes on every event, so events it never uses are blocked
    let plant = plant.with_events(&alphabet.events());
    let (completed, illegal_state) = complete_specification(specification, plant.events());
    let product = constructor::product(&[&plant, &completed], strategy, budget)?;
    debug!(
        "Product of plant and specification: {}",
        product.stats
    );
    let mut stats = FixedPointStats {
        product_states: product.automaton.num_states(),
        ..FixedPointStats::default()
    };

    let (refined, base, classes) = if options.mode.enforces_normality() {
        let projection = observer::project_with(&product.automaton, alphabet.observable(), budget)?;
        debug!(
            "Observer of product has {} states",
            projection.automaton.num_states()
        );
        let refined = constructor::product(&[&product.automaton, &projection.automaton], strategy, budget)?;
        let mut members = vec![Vec::new(); projection.automaton.num_states()];
        let mut class_of = Vec::with_capacity(refined.tuples.len());
        let mut base = Vec::with_capacity(refined.tuples.len());
        for (index, tuple) in refined.tuples.iter().enumerate() {
            base.push(tuple[0]);
            class_of.push(tuple[1].index());
            members[tuple[1].index()].push(StateIndex::new(index));
        }
        (refined.automaton, base, Some(Classes { class_of, members }))
    } else {
        let base = product.automaton.state_indices().collect();
        (product.automaton.clone(), base, None)
    };
    stats.refined_states = refined.num_states();
    debug!("Automaton for fixed point has {} states", refined.num_states());

    let plant_state = |q: StateIndex| product.tuples[base[q.index()].index()][0];
    let mut illegal = FixedBitSet::with_capacity(refined.num_states());
    for q in refined.state_indices() {
        if product.tuples[base[q.index()].index()][1] == illegal_state {
            illegal.insert(q.index());
        }
    }

    let fixed_point = FixedPoint {
        automaton: &refined,
        illegal,
        classes,
        uncontrollable: alphabet.uncontrollable(),
        mode: options.mode,
        prefix_closed: options.prefix_closed,
    };
    let (candidate, iterations) = fixed_point.run(budget)?;
    stats.iterations = iterations;
    stats.time = budget.elapsed() - start;
    info!("Fixed point reached after {} iterations", iterations);

    let kept = refined.reachable_within(candidate.bits());
    if kept.count_ones(..) == 0 {
        debug!("Supremal sublanguage is empty: {}", stats);
        return Ok((None, stats));
    }
    let (automaton, mapping) = refined.retain_states(&kept);
    let mut plant_enabled = vec![EventSet::new(); automaton.num_states()];
    for (q, new_index) in mapping.iter().enumerate() {
        if let Some(new_index) = new_index {
            plant_enabled[new_index.index()] = plant.enabled_events(plant_state(StateIndex::new(q)));
        }
    }
    debug!(
        "Supervisor has {} states and {} transitions: {}",
        automaton.num_states(),
        automaton.num_transitions(),
        stats
    );
    Ok((
        Some(Supervisor {
            automaton,
            plant_enabled,
        }),
        stats,
    ))
}
