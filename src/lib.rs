//! Synthesis of supervisory controllers for discrete-event systems.
//!
//! Given plant models, property models and a partition of the events into
//! controllable and observable events, [`synthesize`] computes the most
//! permissive supervisor that keeps the plant within the properties, only
//! disables controllable events and only relies on observable events.
//!
//! ```
//! use desynth::model::{parse_model, ModelFormat};
//! use desynth::{EventAlphabet, Problem, Status};
//!
//! let alphabet = EventAlphabet::new(&["login"], &["login"], &["login"])?;
//! let plant = parse_model("3\n\n0 1 1\nlogin 1\n\n1 1 1\nlogin 2\n\n2 1 0\n", ModelFormat::Fsm, &alphabet)?;
//! let property = parse_model("2\n\n0 1 1\nlogin 1\n\n1 1 0\n", ModelFormat::Fsm, &alphabet)?;
//! let result = desynth::synthesize(&Problem::new(alphabet, vec![plant], vec![property]))?;
//! assert_eq!(result.status(), Status::Synthesized);
//! assert_eq!(result.supervisor().map(|s| s.num_states()), Some(2));
//! # Ok::<(), desynth::Error>(())
//! ```

pub mod alphabet;
pub mod automaton;
mod budget;
mod constructor;
mod error;
pub mod model;
pub mod observer;
pub mod options;
pub mod synthesis;

use std::fmt::{self, Display};
use std::time::Duration;

use log::{debug, info};

pub use alphabet::{Event, EventAlphabet, EventSet};
pub use automaton::{Automaton, AutomatonBuilder, StateIndex};
pub use constructor::{compose, compose_all, compose_with, ExplorationStats};
pub use error::{Error, Resource};
pub use observer::{ObserverViolation, Reduction, ViolationKind};
pub use synthesis::{FixedPointStats, Supervisor};

use budget::Budget;
use observer::reduce_with;
use options::SynthesisOptions;
use synthesis::supremal_with;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    /// A supervisor over the observable events was found.
    Synthesized,
    /// The supremal sublanguage is empty.
    NoController,
    /// A supervisor exists on the full alphabet, but it cannot be reduced to
    /// the observable events.
    ObserverInfeasible,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Status::Synthesized => "SYNTHESIZED",
                Status::NoController => "NO CONTROLLER",
                Status::ObserverInfeasible => "OBSERVER INFEASIBLE",
            }
        )
    }
}

/// A synthesis problem: plant and property models over a common alphabet.
///
/// Plants are composed in parallel; every property is extended to the whole
/// alphabet before composition, so it only restricts the events it mentions.
#[derive(Debug, Clone)]
pub struct Problem {
    pub alphabet: EventAlphabet,
    pub plants: Vec<Automaton>,
    pub properties: Vec<Automaton>,
}

impl Problem {
    pub fn new(alphabet: EventAlphabet, plants: Vec<Automaton>, properties: Vec<Automaton>) -> Self {
        Self {
            alphabet,
            plants,
            properties,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SynthesisStats {
    plant: ExplorationStats,
    specification: ExplorationStats,
    fixed_point: FixedPointStats,
    supervisor_states: usize,
    time: Duration,
}

impl SynthesisStats {
    /// Returns the statistics of the composition of the plants.
    pub fn plant(&self) -> &ExplorationStats {
        &self.plant
    }

    /// Returns the statistics of the composition of the properties.
    pub fn specification(&self) -> &ExplorationStats {
        &self.specification
    }

    pub fn fixed_point(&self) -> &FixedPointStats {
        &self.fixed_point
    }

    /// Returns the number of states of the returned supervisor, or zero.
    pub fn supervisor_states(&self) -> usize {
        self.supervisor_states
    }

    pub fn time(&self) -> Duration {
        self.time
    }
}

impl Display for SynthesisStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plant: {}; specification: {}; fixed point: {}; supervisor: {} states; total time: {:.2}",
            self.plant,
            self.specification,
            self.fixed_point,
            self.supervisor_states,
            self.time.as_secs_f32(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    status: Status,
    supervisor: Option<Automaton>,
    violations: Vec<ObserverViolation>,
    stats: SynthesisStats,
}

impl SynthesisResult {
    fn new(status: Status, supervisor: Option<Automaton>, violations: Vec<ObserverViolation>, mut stats: SynthesisStats) -> Self {
        stats.supervisor_states = supervisor.as_ref().map_or(0, Automaton::num_states);
        Self {
            status,
            supervisor,
            violations,
            stats,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the supervisor, if one was synthesized.
    ///
    /// For [`Status::ObserverInfeasible`] this is the unreduced supervisor if
    /// [`SynthesisOptions::observer_fallback`] is set.
    pub fn supervisor(&self) -> Option<&Automaton> {
        self.supervisor.as_ref()
    }

    /// Returns the violations of the observer property, if any.
    pub fn violations(&self) -> &[ObserverViolation] {
        &self.violations
    }

    pub fn stats(&self) -> &SynthesisStats {
        &self.stats
    }
}

pub fn synthesize(problem: &Problem) -> Result<SynthesisResult, Error> {
    synthesize_with(problem, &SynthesisOptions::default())
}

/// Synthesizes a supervisor for the problem.
///
/// # Errors
///
/// Returns [`Error::NoOperands`] if there is no plant or no property, and
/// [`Error::ResourceExhausted`] or [`Error::Aborted`] if the limits of the
/// options are exceeded. An empty supervisor or a violation of the observer
/// property are reported through the [`Status`] of the result.
pub fn synthesize_with(problem: &Problem, options: &SynthesisOptions) -> Result<SynthesisResult, Error> {
    let budget = Budget::of(options);
    let alphabet = &problem.alphabet;
    if problem.plants.is_empty() {
        return Err(Error::NoOperands("plant"));
    }
    if problem.properties.is_empty() {
        return Err(Error::NoOperands("property"));
    }
    let mut stats = SynthesisStats::default();

    info!("Composing {} plant models", problem.plants.len());
    let plants: Vec<&Automaton> = problem.plants.iter().collect();
    let (plant, plant_stats) = constructor::compose_in(&plants, options.exploration_strategy, &budget)?;
    debug!("Plant has {} states and {} transitions", plant.num_states(), plant.num_transitions());
    stats.plant = plant_stats;

    info!("Composing {} property models", problem.properties.len());
    let universe = alphabet.events();
    let properties: Vec<Automaton> = problem
        .properties
        .iter()
        .map(|p| p.extend_alphabet(&universe))
        .collect();
    let properties: Vec<&Automaton> = properties.iter().collect();
    let (specification, specification_stats) =
        constructor::compose_in(&properties, options.exploration_strategy, &budget)?;
    debug!(
        "Specification has {} states and {} transitions",
        specification.num_states(),
        specification.num_transitions()
    );
    stats.specification = specification_stats;

    let (supervisor, fixed_point_stats) = supremal_with(&plant, &specification, alphabet, options, &budget)?;
    stats.fixed_point = fixed_point_stats;
    let supervisor = match supervisor {
        Some(supervisor) => supervisor,
        None => {
            info!("No controller exists");
            stats.time = budget.elapsed();
            return Ok(SynthesisResult::new(Status::NoController, None, Vec::new(), stats));
        }
    };

    let mut result = if options.observer_reduction {
        match reduce_with(&supervisor, alphabet, options, &budget)? {
            Reduction::Reduced(automaton) => {
                SynthesisResult::new(Status::Synthesized, Some(automaton), Vec::new(), stats)
            }
            Reduction::Infeasible { violations } => {
                for violation in &violations {
                    debug!("{}", violation.describe(alphabet));
                }
                let fallback = options
                    .observer_fallback
                    .then(|| supervisor.automaton().renumbered());
                SynthesisResult::new(Status::ObserverInfeasible, fallback, violations, stats)
            }
        }
    } else {
        let automaton = supervisor.automaton().renumbered();
        SynthesisResult::new(Status::Synthesized, Some(automaton), Vec::new(), stats)
    };
    result.stats.time = budget.elapsed();
    info!("Synthesis finished: {}", result.stats);
    Ok(result)
}
