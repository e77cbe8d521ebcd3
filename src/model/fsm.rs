//! The `fsm` format: a state count followed by one block per state.
//!
//! ```text
//! 3
//!
//! 0	1	1
//! login	1	c	o
//!
//! 1	1	0
//! ```
//!
//! A block starts with `name marked transitions` and lists one transition
//! per line as `event target` with optional `c`/`uc` and `o`/`uo` flags.

use std::collections::{HashMap, HashSet};

use super::{check_token, RawModel, RawState, RawTransition};
use crate::alphabet::EventAlphabet;
use crate::automaton::Automaton;
use crate::error::Error;

struct PendingTransition<'a> {
    event: &'a str,
    target: &'a str,
    controllable: Option<bool>,
    observable: Option<bool>,
    line: usize,
}

fn parse_count(token: &str, line: usize, what: &str) -> Result<usize, Error> {
    token
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid {} `{}`", what, token)))
}

pub(super) fn parse(text: &str) -> Result<RawModel, Error> {
    let last_line = text.lines().count();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, tokens)| !tokens.is_empty());
    let mut next_line = |what: &str| {
        lines
            .next()
            .ok_or_else(|| Error::parse(last_line, format!("unexpected end of input, expected {}", what)))
    };

    let (line, tokens) = next_line("number of states")?;
    let num_states = match tokens.as_slice() {
        [count] => parse_count(count, line, "number of states")?,
        _ => return Err(Error::parse(line, "expected number of states")),
    };

    let mut mapping: HashMap<&str, usize> = HashMap::with_capacity(num_states);
    let mut blocks = Vec::with_capacity(num_states);
    for _ in 0..num_states {
        let (line, tokens) = next_line("state")?;
        let (name, marked, count) = match tokens.as_slice() {
            [name, marked, count] => (*name, *marked, parse_count(count, line, "number of transitions")?),
            _ => return Err(Error::parse(line, "expected `name marked transitions`")),
        };
        let marked = match marked {
            "0" => false,
            "1" => true,
            _ => return Err(Error::parse(line, format!("invalid marking `{}`", marked))),
        };
        if mapping.insert(name, blocks.len()).is_some() {
            return Err(Error::parse(line, format!("duplicate state `{}`", name)));
        }
        let mut transitions = Vec::with_capacity(count);
        for _ in 0..count {
            let (line, tokens) = next_line("transition")?;
            let (event, target, flags) = match tokens.as_slice() {
                [event, target, flags @ ..] if flags.len() <= 2 => (*event, *target, flags),
                _ => return Err(Error::parse(line, "expected `event target [c|uc] [o|uo]`")),
            };
            let mut transition = PendingTransition {
                event,
                target,
                controllable: None,
                observable: None,
                line,
            };
            for &flag in flags {
                match flag {
                    "c" => transition.controllable = Some(true),
                    "uc" => transition.controllable = Some(false),
                    "o" => transition.observable = Some(true),
                    "uo" => transition.observable = Some(false),
                    _ => return Err(Error::parse(line, format!("invalid flag `{}`", flag))),
                }
            }
            transitions.push(transition);
        }
        blocks.push((name, marked, transitions));
    }
    if let Some((line, _)) = lines.next() {
        return Err(Error::parse(line, "unexpected content after the last state"));
    }

    let mut states = Vec::with_capacity(blocks.len());
    for (name, marked, pending) in blocks {
        let mut transitions = Vec::with_capacity(pending.len());
        for t in pending {
            let target = *mapping
                .get(t.target)
                .ok_or_else(|| Error::parse(t.line, format!("undeclared state `{}`", t.target)))?;
            transitions.push(RawTransition {
                event: t.event.to_owned(),
                target,
                controllable: t.controllable,
                observable: t.observable,
                line: t.line,
            });
        }
        states.push(RawState {
            name: name.to_owned(),
            marked,
            transitions,
        });
    }
    Ok(RawModel { states })
}

pub(super) fn serialize(automaton: &Automaton, alphabet: &EventAlphabet) -> Result<String, Error> {
    let (order, _) = automaton.breadth_first_order();
    let mut names = HashSet::with_capacity(order.len());
    let mut text = format!("{}\n", order.len());
    for &index in &order {
        let state = &automaton[index];
        check_token(state.name(), "state name")?;
        if !names.insert(state.name()) {
            return Err(Error::Unrepresentable(format!(
                "state name `{}` is not unique",
                state.name()
            )));
        }
        text += &format!(
            "\n{}\t{}\t{}\n",
            state.name(),
            u8::from(state.is_marked()),
            state.transitions().len()
        );
        for transition in state.transitions() {
            let event = transition.event();
            check_token(alphabet.name(event), "event name")?;
            text += &format!(
                "{}\t{}\t{}\t{}\n",
                alphabet.name(event),
                automaton[transition.successor()].name(),
                if alphabet.is_controllable(event) { "c" } else { "uc" },
                if alphabet.is_observable(event) { "o" } else { "uo" },
            );
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::tests::automaton;

    #[test]
    fn test_serialize_writes_flags_from_alphabet() {
        let alphabet = EventAlphabet::new(&["a", "b"], &["a"], &["b"]).unwrap();
        let original = automaton(&alphabet, &[("s", "a", "t"), ("t", "b", "s")], &["s"]);
        let text = serialize(&original, &alphabet).unwrap();
        assert_eq!(text, "2\n\ns\t1\t1\na\tt\tc\tuo\n\nt\t0\t1\nb\ts\tuc\to\n");
    }

    #[test]
    fn test_forward_references() {
        let model = parse("2\nB 1 0\nA 0 1\nx B\n").unwrap();
        assert_eq!(model.states[1].transitions[0].target, 0);
        assert_eq!(model.states[1].transitions[0].controllable, None);
    }

    #[test]
    fn test_malformed_input() {
        let cases = [
            ("", 0),
            ("x\n", 1),
            ("1\n\nA 2 0\n", 3),
            ("1\nA 1 1\n", 2),
            ("1\nA 1 1\na A c x\n", 3),
            ("1\nA 1 1\na B\n", 3),
            ("2\nA 1 0\nA 1 0\n", 3),
            ("1\nA 1 0\nB 1 0\n", 3),
        ];
        for &(text, line) in cases.iter() {
            match parse(text) {
                Err(Error::Parse { line: l, .. }) => assert_eq!(l, line, "{:?}", text),
                other => panic!("{:?} parsed as {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_spaces_in_names_are_unrepresentable() {
        let alphabet = EventAlphabet::fully_controlled(&["a"]).unwrap();
        let mut builder = Automaton::builder();
        let state = builder.add_state("a state", true);
        builder.set_initial_state(state);
        assert!(matches!(
            serialize(&builder.build(), &alphabet),
            Err(Error::Unrepresentable(_))
        ));
    }
}
