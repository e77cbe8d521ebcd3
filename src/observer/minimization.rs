use std::collections::HashMap;
use std::hash::Hash;

use log::trace;

use crate::alphabet::Event;
use crate::automaton::{Automaton, AutomatonBuilder, StateIndex};

/// Assigns class numbers to the keys in order of first occurrence.
fn number_classes<K: Hash + Eq>(keys: impl Iterator<Item = K>) -> (Vec<usize>, usize) {
    let mut numbers = HashMap::new();
    let classes = keys
        .map(|key| {
            let next = numbers.len();
            *numbers.entry(key).or_insert(next)
        })
        .collect();
    (classes, numbers.len())
}

/// Merges bisimilar states of the automaton.
///
/// The initial partition separates states by marking and by their set of
/// enabled events. A class is then split by the classes of the successors
/// of its states until the partition is stable. Classes are numbered in
/// ascending order of their first state, and the quotient keeps the
/// transitions of this representative. The result is renumbered from the
/// initial state.
pub fn minimize(automaton: &Automaton) -> Automaton {
    let automaton = automaton.prune_unreachable();
    let initial_state = match automaton.initial_state() {
        Some(state) => state,
        None => return automaton,
    };

    let (mut class, mut num_classes) = number_classes(automaton.states().map(|s| {
        let enabled: Vec<Event> = s.enabled_events().iter().collect();
        (s.is_marked(), enabled)
    }));
    let mut rounds = 0;
    loop {
        rounds += 1;
        let (refined, num_refined) = number_classes(automaton.states_with_index().map(|(i, s)| {
            let mut signature: Vec<(Event, usize)> = s
                .transitions()
                .iter()
                .map(|t| (t.event(), class[t.successor().index()]))
                .collect();
            signature.sort_unstable();
            signature.dedup();
            (class[i.index()], signature)
        }));
        let stable = num_refined == num_classes;
        class = refined;
        num_classes = num_refined;
        if stable {
            break;
        }
    }
    trace!(
        "Partition refinement of {} states: {} classes after {} rounds",
        automaton.num_states(),
        num_classes,
        rounds
    );

    let mut representative = vec![None; num_classes];
    for index in automaton.state_indices() {
        representative[class[index.index()]].get_or_insert(index);
    }
    let mut builder = AutomatonBuilder::new();
    for event in automaton.events().iter() {
        builder.add_event(event);
    }
    let states: Vec<StateIndex> = representative
        .iter()
        .flatten()
        .map(|&r| builder.add_state(automaton[r].name(), automaton[r].is_marked()))
        .collect();
    for (c, r) in representative.iter().enumerate() {
        if let Some(r) = *r {
            for transition in automaton[r].transitions() {
                let target = states[class[transition.successor().index()]];
                builder.add_transition(states[c], transition.event(), target);
            }
        }
    }
    builder.set_initial_state(states[class[initial_state.index()]]);
    builder.build().renumbered()
}
