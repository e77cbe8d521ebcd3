//! Projection of automata onto the observable events and reduction of a
//! supervisor to a controller that only observes those events.

mod minimization;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use log::{debug, info};

use crate::alphabet::{Event, EventAlphabet, EventSet};
use crate::automaton::{Automaton, AutomatonBuilder, StateIndex};
use crate::budget::Budget;
use crate::error::Error;
use crate::options::SynthesisOptions;
use crate::synthesis::Supervisor;

pub use minimization::minimize;

/// A deterministic projection together with the member states of every estimate.
pub(crate) struct Projection {
    pub(crate) automaton: Automaton,
    pub(crate) members: Vec<Vec<StateIndex>>,
}

/// Extends the sorted set of states by everything reachable with events outside `observable`.
fn silent_closure(automaton: &Automaton, observable: &EventSet, states: &mut Vec<StateIndex>) {
    let mut visited = vec![false; automaton.num_states()];
    let mut queue: VecDeque<StateIndex> = states.iter().copied().collect();
    for &state in states.iter() {
        visited[state.index()] = true;
    }
    while let Some(state) = queue.pop_front() {
        for transition in automaton[state].transitions() {
            let successor = transition.successor();
            if !observable.contains(transition.event()) && !visited[successor.index()] {
                visited[successor.index()] = true;
                states.push(successor);
                queue.push_back(successor);
            }
        }
    }
    states.sort_unstable();
}

/// Computes the observer of `automaton` for the observable events.
///
/// Every state of the result is an estimate: the set of states reachable by
/// some trace with the same observation. An estimate is marked if one of its
/// members is marked.
pub(crate) fn project_with(
    automaton: &Automaton,
    observable: &EventSet,
    budget: &Budget,
) -> Result<Projection, Error> {
    let events = automaton.events().intersection(observable);
    let mut builder = AutomatonBuilder::new();
    for event in events.iter() {
        builder.add_event(event);
    }
    let initial_state = match automaton.initial_state() {
        Some(state) => state,
        None => {
            return Ok(Projection {
                automaton: builder.build(),
                members: Vec::new(),
            })
        }
    };

    let mut members: Vec<Vec<StateIndex>> = Vec::new();
    let mut mapping: HashMap<Vec<StateIndex>, StateIndex> = HashMap::new();
    let mut queue = VecDeque::new();

    let mut add_estimate = |builder: &mut AutomatonBuilder,
                            members: &mut Vec<Vec<StateIndex>>,
                            queue: &mut VecDeque<StateIndex>,
                            estimate: Vec<StateIndex>|
     -> Result<StateIndex, Error> {
        if let Some(&index) = mapping.get(&estimate) {
            return Ok(index);
        }
        budget.check_states(members.len() + 1)?;
        let names: Vec<&str> = estimate.iter().map(|&s| automaton[s].name()).collect();
        let marked = estimate.iter().any(|&s| automaton[s].is_marked());
        let index = builder.add_state(format!("{{{}}}", names.join(",")), marked);
        mapping.insert(estimate.clone(), index);
        members.push(estimate);
        queue.push_back(index);
        Ok(index)
    };

    let mut initial_estimate = vec![initial_state];
    silent_closure(automaton, observable, &mut initial_estimate);
    let initial_index = add_estimate(&mut builder, &mut members, &mut queue, initial_estimate)?;
    builder.set_initial_state(initial_index);

    while let Some(index) = queue.pop_front() {
        budget.check()?;
        for event in events.iter() {
            let mut successors: Vec<StateIndex> = members[index.index()]
                .iter()
                .flat_map(|&s| automaton.successors(s, event))
                .collect();
            if successors.is_empty() {
                continue;
            }
            successors.sort_unstable();
            successors.dedup();
            silent_closure(automaton, observable, &mut successors);
            let successor_index = add_estimate(&mut builder, &mut members, &mut queue, successors)?;
            builder.add_transition(index, event, successor_index);
        }
    }
    Ok(Projection {
        automaton: builder.build(),
        members,
    })
}

/// Projects the automaton onto the observable events.
///
/// The language of the result is the natural projection of the language
/// of `automaton`; the result is deterministic.
pub fn project(automaton: &Automaton, observable: &EventSet) -> Result<Automaton, Error> {
    Ok(project_with(automaton, observable, &Budget::unlimited())?.automaton)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// An unobservable event enabled by the plant is disabled by the supervisor.
    HiddenDisablement,
    /// An observable event is enabled at one state of an estimate and
    /// disabled at another state of the same estimate where the plant enables it.
    AmbiguousEnablement,
}

/// A place where the projected supervisor would not be able to take the
/// decision of the supervisor on the full alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverViolation {
    estimate: StateIndex,
    state: String,
    event: Event,
    kind: ViolationKind,
}

impl ObserverViolation {
    /// Returns the estimate of the projection containing the offending state.
    pub fn estimate(&self) -> StateIndex {
        self.estimate
    }

    /// Returns the name of the supervisor state where the event is disabled.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn event(&self) -> Event {
        self.event
    }

    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    /// Returns a message naming the event with its name in the alphabet.
    pub fn describe(&self, alphabet: &EventAlphabet) -> String {
        let event = alphabet.name(self.event);
        match self.kind {
            ViolationKind::HiddenDisablement => format!(
                "unobservable event `{}` is disabled at state {}",
                event, self.state
            ),
            ViolationKind::AmbiguousEnablement => format!(
                "observable event `{}` is disabled at state {} but enabled in the same estimate {}",
                event, self.state, self.estimate
            ),
        }
    }
}

impl fmt::Display for ObserverViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} of event {} at state {} (estimate {})",
            self.kind, self.event, self.state, self.estimate
        )
    }
}

fn violations_of(
    projection: &Projection,
    supervisor: &Supervisor,
    alphabet: &EventAlphabet,
) -> Vec<ObserverViolation> {
    let automaton = supervisor.automaton();
    let mut violations = Vec::new();
    for (estimate, members) in projection.members.iter().enumerate() {
        let estimate = StateIndex::new(estimate);
        let enabled: Vec<EventSet> = members.iter().map(|&q| automaton.enabled_events(q)).collect();
        let mut enabled_somewhere = EventSet::new();
        for events in &enabled {
            enabled_somewhere.union_with(events);
        }
        for (&q, enabled) in members.iter().zip(&enabled) {
            for event in supervisor.plant_enabled(q).difference(enabled).iter() {
                let kind = if !alphabet.is_observable(event) {
                    ViolationKind::HiddenDisablement
                } else if enabled_somewhere.contains(event) {
                    ViolationKind::AmbiguousEnablement
                } else {
                    continue;
                };
                violations.push(ObserverViolation {
                    estimate,
                    state: automaton[q].name().to_owned(),
                    event,
                    kind,
                });
            }
        }
    }
    violations
}

/// Checks whether the supervisor can be projected onto the observable events
/// without changing the closed-loop behavior, and returns all violations.
pub fn check_observer_property(
    supervisor: &Supervisor,
    alphabet: &EventAlphabet,
) -> Result<Vec<ObserverViolation>, Error> {
    let projection = project_with(supervisor.automaton(), alphabet.observable(), &Budget::unlimited())?;
    Ok(violations_of(&projection, supervisor, alphabet))
}

/// The outcome of the observer reduction.
#[derive(Debug, Clone)]
pub enum Reduction {
    /// The supervisor over the observable events.
    Reduced(Automaton),
    /// The observer property does not hold.
    Infeasible { violations: Vec<ObserverViolation> },
}

/// Reduces the supervisor to the observable events of the alphabet.
pub fn reduce(
    supervisor: &Supervisor,
    alphabet: &EventAlphabet,
    options: &SynthesisOptions,
) -> Result<Reduction, Error> {
    reduce_with(supervisor, alphabet, options, &Budget::of(options))
}

pub(crate) fn reduce_with(
    supervisor: &Supervisor,
    alphabet: &EventAlphabet,
    options: &SynthesisOptions,
    budget: &Budget,
) -> Result<Reduction, Error> {
    info!("Projecting supervisor onto observable events");
    let projection = project_with(supervisor.automaton(), alphabet.observable(), budget)?;
    debug!(
        "Observer has {} states and {} transitions",
        projection.automaton.num_states(),
        projection.automaton.num_transitions()
    );
    let violations = violations_of(&projection, supervisor, alphabet);
    if !violations.is_empty() {
        info!("Observer property violated at {} places", violations.len());
        return Ok(Reduction::Infeasible { violations });
    }
    let reduced = if options.minimization {
        info!("Minimizing reduced supervisor");
        minimize(&projection.automaton)
    } else {
        projection.automaton.renumbered()
    };
    debug!("Reduced supervisor has {} states", reduced.num_states());
    Ok(Reduction::Reduced(reduced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::tests::{automaton, trace};
    use crate::options::SynthesisMode;
    use crate::synthesis::supremal_sublanguage;

    fn alphabet() -> EventAlphabet {
        EventAlphabet::new(&["a", "b", "u"], &["a", "b"], &["a", "b"]).unwrap()
    }

    #[test]
    fn test_projection_merges_silent_steps() {
        let alphabet = alphabet();
        let original = automaton(
            &alphabet,
            &[("0", "u", "1"), ("0", "a", "2"), ("1", "b", "3"), ("2", "u", "3")],
            &["3"],
        );
        let projected = project(&original, alphabet.observable()).unwrap();
        assert!(projected.is_deterministic());
        assert_eq!(projected.events(), alphabet.observable());
        let initial_state = projected.initial_state().unwrap();
        assert_eq!(projected[initial_state].name(), "{0,1}");
        assert!(projected.accepts(&trace(&alphabet, &["a"])));
        assert!(projected.accepts(&trace(&alphabet, &["b"])));
        assert!(!projected.accepts(&[]));
        assert!(!projected.generates(&trace(&alphabet, &["a", "b"])));
    }

    fn controllable_supervisor(alphabet: &EventAlphabet, plant: &Automaton, specification: &Automaton) -> Supervisor {
        let options = SynthesisOptions {
            mode: SynthesisMode::Controllable,
            ..SynthesisOptions::default()
        };
        supremal_sublanguage(plant, specification, alphabet, &options)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_ambiguous_enablement() {
        // a silent failure forbids starting, but is not seen by the supervisor
        let alphabet = EventAlphabet::new(&["fail", "start"], &["start"], &["start"]).unwrap();
        let plant = automaton(
            &alphabet,
            &[("idle", "fail", "down"), ("idle", "start", "busy"), ("down", "start", "broken")],
            &["idle", "down", "busy", "broken"],
        );
        let specification = automaton(&alphabet, &[("0", "fail", "1"), ("0", "start", "2")], &["0", "1", "2"]);
        let supervisor = controllable_supervisor(&alphabet, &plant, &specification);

        let violations = check_observer_property(&supervisor, &alphabet).unwrap();
        let start = alphabet.event("start").unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind(), ViolationKind::AmbiguousEnablement);
        assert_eq!(violations[0].event(), start);
        assert!(violations[0].describe(&alphabet).contains("`start`"));
    }

    #[test]
    fn test_hidden_disablement() {
        let alphabet = EventAlphabet::new(&["a"], &["a"], &[] as &[&str]).unwrap();
        let plant = automaton(&alphabet, &[("0", "a", "1"), ("1", "a", "2")], &["0", "1", "2"]);
        let specification = automaton(&alphabet, &[("0", "a", "1")], &["0", "1"]);
        let supervisor = controllable_supervisor(&alphabet, &plant, &specification);

        let violations = check_observer_property(&supervisor, &alphabet).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind(), ViolationKind::HiddenDisablement);
        assert!(matches!(
            reduce(&supervisor, &alphabet, &SynthesisOptions::default()).unwrap(),
            Reduction::Infeasible { .. }
        ));
    }

    #[test]
    fn test_observer_property_holds_for_full_observation() {
        let alphabet = EventAlphabet::fully_controlled(&["a"]).unwrap();
        let plant = automaton(&alphabet, &[("0", "a", "1"), ("1", "a", "2")], &["0", "1", "2"]);
        let specification = automaton(&alphabet, &[("0", "a", "1")], &["0", "1"]);
        let supervisor = controllable_supervisor(&alphabet, &plant, &specification);

        assert!(check_observer_property(&supervisor, &alphabet).unwrap().is_empty());
        match reduce(&supervisor, &alphabet, &SynthesisOptions::default()).unwrap() {
            Reduction::Reduced(reduced) => assert_eq!(reduced.num_states(), 2),
            Reduction::Infeasible { violations } => panic!("unexpected violations {:?}", violations),
        }
    }

    #[test]
    fn test_projection_state_bound() {
        let alphabet = alphabet();
        let original = automaton(&alphabet, &[("0", "a", "1"), ("1", "a", "2")], &[]);
        let limits = crate::options::Limits {
            max_states: Some(2),
            ..Default::default()
        };
        let budget = Budget::new(&limits, &Default::default());
        assert!(matches!(
            project_with(&original, alphabet.observable(), &budget),
            Err(Error::ResourceExhausted { .. })
        ));
    }
}
