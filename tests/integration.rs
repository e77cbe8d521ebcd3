//! Integration tests that synthesize supervisors for small models and verify
//! the closed loop of plant and supervisor against the properties.

use desynth::model::{load_model, parse_model, write_model, ModelFormat};
use desynth::options::*;
use desynth::{
    compose, compose_all, synthesize_with, Automaton, Error, Event, EventAlphabet, Problem, Resource,
    Status::{self, NoController, ObserverInfeasible, Synthesized},
    ViolationKind,
};

/// A user that may log in twice.
const DOUBLE_LOGIN: &str = "3

0 1 1
login 1

1 1 1
login 2

2 1 0
";

/// At most one login.
const SINGLE_LOGIN: &str = "2

0 1 1
login 1

1 1 0
";

/// A machine that may fail silently before it starts.
const SILENT_FAILURE: &str = "4

idle 1 2
fail down
start busy

down 1 1
start broken

busy 1 0

broken 1 0
";

/// Starting is only allowed while the machine is up.
const NO_START_AFTER_FAILURE: &str = "3

0 1 2
fail 1
start 2

1 1 0

2 1 0
";

/// Two machines that each work once, with the outputs buffered in a single slot.
const MACHINE_ONE: &str = "2

idle 1 1
work1 done

done 1 0
";

const MACHINE_TWO: &str = "2

idle 1 1
take idle2

idle2 1 1
work2 done2

done2 1 0
";

const BUFFER: &str = "2

empty 1 1
work1 full

full 1 1
take empty
";

/// A machine that starts once.
const SINGLE_START: &str = "2

0 1 1
a 1

1 1 0
";

/// Every start must be acknowledged by `x`, which the machine never does.
const ACKNOWLEDGED_START: &str = "2

0 1 1
a 1

1 1 1
x 0
";

fn alphabet(events: &[&str], controllable: &[&str], observable: &[&str]) -> EventAlphabet {
    EventAlphabet::new(events, controllable, observable).unwrap()
}

fn problem(alphabet: EventAlphabet, plants: &[&str], properties: &[&str]) -> Problem {
    let parse = |text: &&str| parse_model(text, ModelFormat::Fsm, &alphabet).unwrap();
    let plants = plants.iter().map(parse).collect();
    let properties = properties.iter().map(parse).collect();
    Problem::new(alphabet, plants, properties)
}

/// Returns all traces up to the given length that the automaton generates.
fn generated_traces(automaton: &Automaton, alphabet: &EventAlphabet, max_len: usize) -> Vec<Vec<Event>> {
    let mut traces = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    if !automaton.generates(&[]) {
        return Vec::new();
    }
    for _ in 0..max_len {
        let mut next = Vec::new();
        for trace in &frontier {
            for event in alphabet.iter() {
                let mut extended: Vec<Event> = trace.clone();
                extended.push(event);
                if automaton.generates(&extended) {
                    next.push(extended);
                }
            }
        }
        traces.extend(next.iter().cloned());
        frontier = next;
    }
    traces
}

/// Checks that the closed loop of plant and supervisor stays within the
/// properties and, for controllable supervisors, never disables an
/// uncontrollable event of the plant.
fn verify_closed_loop(problem: &Problem, supervisor: &Automaton, controllable: bool) {
    let alphabet = &problem.alphabet;
    let plant = compose_all(&problem.plants)
        .unwrap()
        .with_events(&alphabet.events());
    let extended: Vec<Automaton> = problem
        .properties
        .iter()
        .map(|p| p.extend_alphabet(&alphabet.events()))
        .collect();
    let specification = compose_all(&extended).unwrap();
    let closed_loop = compose(&plant, supervisor).unwrap();

    for trace in generated_traces(&closed_loop, alphabet, 5) {
        assert!(plant.generates(&trace), "trace {:?} is not a plant trace", trace);
        assert!(specification.generates(&trace), "trace {:?} violates the properties", trace);
        if !controllable {
            continue;
        }
        for event in alphabet.uncontrollable().iter() {
            let mut extended = trace.clone();
            extended.push(event);
            if plant.generates(&extended) {
                assert!(
                    closed_loop.generates(&extended),
                    "uncontrollable {} disabled after {:?}",
                    alphabet.name(event),
                    trace
                );
            }
        }
    }
}

/// Synthesize a supervisor for the problem and check the status, the number
/// of supervisor states and the closed loop.
fn verify_synthesis(
    problem: &Problem,
    mode: SynthesisMode,
    expected_status: Status,
    expected_states: Option<usize>,
) {
    let options = SynthesisOptions {
        mode,
        ..SynthesisOptions::default()
    };
    let result = synthesize_with(problem, &options).unwrap();
    assert_eq!(result.status(), expected_status);
    assert_eq!(result.supervisor().map(Automaton::num_states), expected_states);
    assert_eq!(result.stats().supervisor_states(), expected_states.unwrap_or(0));
    if let Some(supervisor) = result.supervisor() {
        verify_closed_loop(problem, supervisor, mode.enforces_controllability());
    }
    if expected_status == ObserverInfeasible {
        assert!(!result.violations().is_empty());
    } else {
        assert!(result.violations().is_empty());
    }
}

/// Generate tests for the given list of problems, one module per synthesis mode.
macro_rules! synthesis_tests {
    ($($name:ident: ($problem:expr, $controllable:expr, $normal:expr, $both:expr),)*) => {
        mod controllable {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let (status, states) = $controllable;
                    verify_synthesis(&$problem, SynthesisMode::Controllable, status, states);
                }
            )*
        }

        mod normal {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let (status, states) = $normal;
                    verify_synthesis(&$problem, SynthesisMode::Normal, status, states);
                }
            )*
        }

        mod controllable_normal {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let (status, states) = $both;
                    verify_synthesis(&$problem, SynthesisMode::ControllableNormal, status, states);
                }
            )*
        }
    }
}

synthesis_tests! {
    login_controllable: (
        problem(alphabet(&["login"], &["login"], &["login"]), &[DOUBLE_LOGIN], &[SINGLE_LOGIN]),
        (Synthesized, Some(2)),
        (Synthesized, Some(2)),
        (Synthesized, Some(2))
    ),
    login_uncontrollable: (
        problem(alphabet(&["login"], &[], &["login"]), &[DOUBLE_LOGIN], &[SINGLE_LOGIN]),
        (NoController, None),
        (Synthesized, Some(2)),
        (NoController, None)
    ),
    silent_failure: (
        problem(
            alphabet(&["fail", "start"], &["start"], &["start"]),
            &[SILENT_FAILURE],
            &[NO_START_AFTER_FAILURE]
        ),
        (ObserverInfeasible, None),
        (Synthesized, Some(1)),
        (Synthesized, Some(1))
    ),
    buffer_overflow: (
        problem(
            alphabet(&["work1", "take", "work2"], &["work1", "take", "work2"], &["work1", "take", "work2"]),
            &[MACHINE_ONE, MACHINE_TWO],
            &[BUFFER]
        ),
        (Synthesized, Some(4)),
        (Synthesized, Some(4)),
        (Synthesized, Some(4))
    ),
    event_unused_by_plant: (
        problem(alphabet(&["a", "x"], &["a"], &["a", "x"]), &[SINGLE_START], &[ACKNOWLEDGED_START]),
        (Synthesized, Some(2)),
        (Synthesized, Some(2)),
        (Synthesized, Some(2))
    ),
}

#[test]
fn supervisor_never_uses_events_outside_the_plant() {
    let problem = problem(
        alphabet(&["a", "x"], &["a", "x"], &["a", "x"]),
        &[SINGLE_START],
        &["1\n\n0 1 1\na 0\n"],
    );
    let result = synthesize_with(&problem, &SynthesisOptions::default()).unwrap();
    assert_eq!(result.status(), Synthesized);
    let supervisor = result.supervisor().unwrap();
    let a = problem.alphabet.event("a").unwrap();
    let x = problem.alphabet.event("x").unwrap();
    assert!(supervisor.generates(&[a]));
    assert!(!supervisor.generates(&[x]));
    assert!(!supervisor.generates(&[a, x]));
    verify_closed_loop(&problem, supervisor, true);
}

fn silent_failure() -> Problem {
    problem(
        alphabet(&["fail", "start"], &["start"], &["start"]),
        &[SILENT_FAILURE],
        &[NO_START_AFTER_FAILURE],
    )
}

#[test]
fn observer_violation_is_reported() {
    let problem = silent_failure();
    let options = SynthesisOptions {
        mode: SynthesisMode::Controllable,
        ..SynthesisOptions::default()
    };
    let result = synthesize_with(&problem, &options).unwrap();
    assert_eq!(result.status(), ObserverInfeasible);
    let start = problem.alphabet.event("start").unwrap();
    assert!(result
        .violations()
        .iter()
        .any(|v| v.event() == start && v.kind() == ViolationKind::AmbiguousEnablement));
    for violation in result.violations() {
        assert!(violation.describe(&problem.alphabet).contains("start"));
    }
}

#[test]
fn fallback_returns_unreduced_supervisor() {
    let problem = silent_failure();
    let options = SynthesisOptions {
        mode: SynthesisMode::Controllable,
        observer_fallback: true,
        ..SynthesisOptions::default()
    };
    let result = synthesize_with(&problem, &options).unwrap();
    assert_eq!(result.status(), ObserverInfeasible);
    let supervisor = result.supervisor().unwrap();
    assert_eq!(supervisor.num_states(), 3);
    verify_closed_loop(&problem, supervisor, true);
}

#[test]
fn reduction_can_be_disabled() {
    let problem = silent_failure();
    let options = SynthesisOptions {
        mode: SynthesisMode::Controllable,
        observer_reduction: false,
        ..SynthesisOptions::default()
    };
    let result = synthesize_with(&problem, &options).unwrap();
    assert_eq!(result.status(), Synthesized);
    assert_eq!(result.supervisor().map(Automaton::num_states), Some(3));
}

#[test]
fn state_limit_is_not_an_empty_supervisor() {
    let problem = problem(alphabet(&["login"], &["login"], &["login"]), &[DOUBLE_LOGIN], &[SINGLE_LOGIN]);
    let options = SynthesisOptions {
        limits: Limits {
            max_states: Some(1),
            ..Limits::default()
        },
        ..SynthesisOptions::default()
    };
    let result = synthesize_with(&problem, &options);
    assert!(matches!(
        result,
        Err(Error::ResourceExhausted {
            resource: Resource::States,
            limit: 1
        })
    ));
}

#[test]
fn raised_abort_flag_cancels_synthesis() {
    let problem = problem(alphabet(&["login"], &["login"], &["login"]), &[DOUBLE_LOGIN], &[SINGLE_LOGIN]);
    let options = SynthesisOptions::default();
    options.abort.raise();
    assert!(matches!(synthesize_with(&problem, &options), Err(Error::Aborted)));
}

#[test]
fn missing_models_are_rejected() {
    let problem = problem(alphabet(&["login"], &["login"], &["login"]), &[DOUBLE_LOGIN], &[]);
    let result = synthesize_with(&problem, &SynthesisOptions::default());
    assert!(matches!(result, Err(Error::NoOperands(_))));
}

#[test]
fn supervisor_is_written_and_read_back() {
    let problem = problem(alphabet(&["login"], &["login"], &["login"]), &[DOUBLE_LOGIN], &[SINGLE_LOGIN]);
    let result = synthesize_with(&problem, &SynthesisOptions::default()).unwrap();
    let supervisor = result.supervisor().unwrap();

    let dir = tempfile::tempdir().unwrap();
    for &format in &[ModelFormat::Fsm, ModelFormat::Aut] {
        let path = dir.path().join(format!("supervisor.{}", format));
        write_model(&path, supervisor, format, &problem.alphabet).unwrap();
        let loaded = load_model(&path, format, &problem.alphabet).unwrap();
        assert_eq!(loaded.num_states(), supervisor.num_states());
        assert_eq!(loaded.num_transitions(), supervisor.num_transitions());
        verify_closed_loop(&problem, &loaded, true);
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let alphabet = alphabet(&["login"], &["login"], &["login"]);
    let result = load_model(dir.path().join("missing.fsm"), ModelFormat::Fsm, &alphabet);
    assert!(matches!(result, Err(Error::Io(_))));
}
