//! Reading and writing automata in textual model formats.
//!
//! Parsing happens in two steps: the text is first read into a [`RawModel`]
//! that still refers to events by name, which is then resolved against an
//! [`EventAlphabet`]. This allows collecting the events of all models before
//! the alphabet is fixed.

mod aut;
mod fsm;

use std::collections::HashSet;
use std::path::Path;

use log::{debug, warn};

use crate::alphabet::EventAlphabet;
use crate::automaton::{Automaton, AutomatonBuilder, StateIndex};
use crate::error::Error;
pub use crate::options::ModelFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawTransition {
    event: String,
    target: usize,
    controllable: Option<bool>,
    observable: Option<bool>,
    line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawState {
    name: String,
    marked: bool,
    transitions: Vec<RawTransition>,
}

/// A parsed model whose events are not yet resolved.
///
/// The first state is the initial state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawModel {
    states: Vec<RawState>,
}

impl RawModel {
    /// Parses the text in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is malformed or refers to
    /// undeclared states.
    pub fn parse(text: &str, format: ModelFormat) -> Result<Self, Error> {
        let model = match format {
            ModelFormat::Fsm => fsm::parse(text)?,
            ModelFormat::Aut => aut::parse(text)?,
        };
        debug!(
            "Parsed {} model with {} states and {} events",
            format,
            model.states.len(),
            model.events().len()
        );
        Ok(model)
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Returns the names of all events used by the model, in order of first use.
    pub fn events(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for transition in self.states.iter().flat_map(|s| s.transitions.iter()) {
            if seen.insert(transition.event.as_str()) {
                events.push(transition.event.as_str());
            }
        }
        events
    }

    /// Builds the automaton with the events of the alphabet.
    ///
    /// Controllability and observability flags of the model that disagree
    /// with the alphabet are reported as warnings; the alphabet takes
    /// precedence. Unreachable states are removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if a transition uses an event that is
    /// not part of the alphabet.
    pub fn resolve(&self, alphabet: &EventAlphabet) -> Result<Automaton, Error> {
        let mut builder = AutomatonBuilder::new();
        for state in &self.states {
            builder.add_state(state.name.as_str(), state.marked);
        }
        for (index, state) in self.states.iter().enumerate() {
            for transition in &state.transitions {
                let context = format!("transition of state {} at line {}", state.name, transition.line);
                let event = alphabet.lookup(&transition.event, &context)?;
                if transition.controllable.map_or(false, |c| c != alphabet.is_controllable(event)) {
                    warn!(
                        "Controllability of event {} at line {} differs from the alphabet",
                        transition.event, transition.line
                    );
                }
                if transition.observable.map_or(false, |o| o != alphabet.is_observable(event)) {
                    warn!(
                        "Observability of event {} at line {} differs from the alphabet",
                        transition.event, transition.line
                    );
                }
                builder.add_transition(
                    StateIndex::new(index),
                    event,
                    StateIndex::new(transition.target),
                );
            }
        }
        if !self.states.is_empty() {
            builder.set_initial_state(StateIndex::new(0));
        }
        Ok(builder.build().prune_unreachable())
    }
}

/// Parses a model and resolves its events against the alphabet.
pub fn parse_model(text: &str, format: ModelFormat, alphabet: &EventAlphabet) -> Result<Automaton, Error> {
    RawModel::parse(text, format)?.resolve(alphabet)
}

/// Writes the reachable part of the automaton, starting with the initial state.
///
/// # Errors
///
/// Returns [`Error::Unrepresentable`] if the automaton cannot be expressed in
/// the format, e.g. unmarked states in the `aut` format.
pub fn serialize_model(automaton: &Automaton, format: ModelFormat, alphabet: &EventAlphabet) -> Result<String, Error> {
    match format {
        ModelFormat::Fsm => fsm::serialize(automaton, alphabet),
        ModelFormat::Aut => aut::serialize(automaton, alphabet),
    }
}

/// Reads a model file without resolving its events.
pub fn load_raw_model<P: AsRef<Path>>(path: P, format: ModelFormat) -> Result<RawModel, Error> {
    let text = fs_err::read_to_string(path.as_ref())?;
    RawModel::parse(&text, format)
}

/// Reads a model file and resolves its events against the alphabet.
pub fn load_model<P: AsRef<Path>>(path: P, format: ModelFormat, alphabet: &EventAlphabet) -> Result<Automaton, Error> {
    load_raw_model(path, format)?.resolve(alphabet)
}

/// Writes the automaton to a file.
pub fn write_model<P: AsRef<Path>>(
    path: P,
    automaton: &Automaton,
    format: ModelFormat,
    alphabet: &EventAlphabet,
) -> Result<(), Error> {
    let text = serialize_model(automaton, format, alphabet)?;
    fs_err::write(path.as_ref(), text)?;
    Ok(())
}

/// Checks that a name can be written as a single token.
fn check_token(name: &str, what: &str) -> Result<(), Error> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        Err(Error::Unrepresentable(format!("{} `{}` is not a single token", what, name)))
    } else {
        Ok(())
    }
}
