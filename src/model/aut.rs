//! The Aldebaran `aut` format of labelled transition systems.
//!
//! ```text
//! des (0, 2, 3)
//! (0, "login", 1)
//! (1, "login", 2)
//! ```
//!
//! States are numbered and all of them are marked.

use super::{RawModel, RawState, RawTransition};
use crate::alphabet::EventAlphabet;
use crate::automaton::Automaton;
use crate::error::Error;

fn parse_number(token: &str, line: usize) -> Result<usize, Error> {
    token
        .trim()
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid number `{}`", token.trim())))
}

/// Returns the contents between the outer parentheses.
fn parenthesized(text: &str, line: usize) -> Result<&str, Error> {
    text.trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| Error::parse(line, "expected parenthesized tuple"))
}

pub(super) fn parse(text: &str) -> Result<RawModel, Error> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());
    let (header_line, header) = lines
        .next()
        .ok_or_else(|| Error::parse(0, "missing `des` header"))?;
    let header = header
        .strip_prefix("des")
        .ok_or_else(|| Error::parse(header_line, "missing `des` header"))?;
    let fields: Vec<&str> = parenthesized(header, header_line)?.split(',').collect();
    let (initial_state, num_transitions, num_states) = match fields.as_slice() {
        [initial, transitions, states] => (
            parse_number(initial, header_line)?,
            parse_number(transitions, header_line)?,
            parse_number(states, header_line)?,
        ),
        _ => return Err(Error::parse(header_line, "expected `des (initial, transitions, states)`")),
    };
    if num_states == 0 {
        return match lines.next() {
            None if num_transitions == 0 => Ok(RawModel::default()),
            _ => Err(Error::parse(header_line, "transitions in a model without states")),
        };
    }
    if initial_state >= num_states {
        return Err(Error::parse(header_line, format!("undeclared initial state {}", initial_state)));
    }

    // swaps the initial state with state 0, so it is its own inverse
    let position = |state: usize| {
        if state == initial_state {
            0
        } else if state == 0 {
            initial_state
        } else {
            state
        }
    };
    let mut states: Vec<RawState> = (0..num_states)
        .map(|i| RawState {
            name: position(i).to_string(),
            marked: true,
            transitions: Vec::new(),
        })
        .collect();

    let mut count = 0;
    for (line, text) in lines {
        let inner = parenthesized(text, line)?;
        let (first, last) = match (inner.find(','), inner.rfind(',')) {
            (Some(first), Some(last)) if first < last => (first, last),
            _ => return Err(Error::parse(line, "expected `(from, label, to)`")),
        };
        let from = parse_number(&inner[..first], line)?;
        let to = parse_number(&inner[last + 1..], line)?;
        for &state in &[from, to] {
            if state >= num_states {
                return Err(Error::parse(line, format!("undeclared state {}", state)));
            }
        }
        let label = inner[first + 1..last].trim();
        let label = match label.strip_prefix('"') {
            Some(quoted) => quoted.strip_suffix('"'),
            None => Some(label),
        }
        .filter(|l| !l.contains('"'))
        .ok_or_else(|| Error::parse(line, format!("unbalanced quotes in label {}", label)))?;
        if label.is_empty() {
            return Err(Error::parse(line, "empty label"));
        }
        states[position(from)].transitions.push(RawTransition {
            event: label.to_owned(),
            target: position(to),
            controllable: None,
            observable: None,
            line,
        });
        count += 1;
    }
    if count != num_transitions {
        return Err(Error::parse(
            header_line,
            format!("header declares {} transitions, found {}", num_transitions, count),
        ));
    }
    Ok(RawModel { states })
}

pub(super) fn serialize(automaton: &Automaton, alphabet: &EventAlphabet) -> Result<String, Error> {
    let (order, position) = automaton.breadth_first_order();
    let mut transitions = Vec::new();
    for (from, &index) in order.iter().enumerate() {
        let state = &automaton[index];
        if !state.is_marked() {
            return Err(Error::Unrepresentable(format!(
                "state {} is not marked, but aut models mark every state",
                state.name()
            )));
        }
        for transition in state.transitions() {
            let label = alphabet.name(transition.event());
            if label.contains('"') {
                return Err(Error::Unrepresentable(format!("label `{}` contains a quote", label)));
            }
            if let Some(to) = position[transition.successor().index()] {
                transitions.push(format!("({}, \"{}\", {})\n", from, label, to));
            }
        }
    }
    let mut text = format!("des (0, {}, {})\n", transitions.len(), order.len());
    for transition in transitions {
        text += &transition;
    }
    Ok(text)
}
