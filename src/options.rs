//! Options for the synthesis procedure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, ValueEnum};

/// Implement [`Display`](std::fmt::Display) with the information in [`clap::ValueEnum`].
///
/// This ensures consistent names for parsing of the default argument.
macro_rules! clap_display {
    ($t:ty) => {
        impl std::fmt::Display for $t
        where
            $t: clap::ValueEnum,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.to_possible_value() {
                    Some(value) => write!(f, "{}", value.get_name()),
                    None => write!(f, "{:?}", self),
                }
            }
        }
    };
}

/// The textual format of a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelFormat {
    /// State listing with per-transition controllability and observability
    /// flags, as used by tools for discrete-event systems.
    #[value(name = "fsm")]
    Fsm,
    /// Labelled transition system in the Aldebaran format.
    /// Every state is marked.
    #[value(name = "aut")]
    Aut,
}
impl Default for ModelFormat {
    fn default() -> Self {
        Self::Fsm
    }
}
clap_display!(ModelFormat);

/// The closure properties enforced on the supremal sublanguage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SynthesisMode {
    /// Supremal controllable sublanguage: uncontrollable events
    /// are never disabled.
    #[value(name = "controllable")]
    Controllable,
    /// Supremal normal sublanguage: decisions are consistent
    /// with the observable events.
    #[value(name = "normal")]
    Normal,
    /// Supremal controllable and normal sublanguage.
    #[value(name = "controllable-normal")]
    ControllableNormal,
}
impl Default for SynthesisMode {
    fn default() -> Self {
        Self::ControllableNormal
    }
}
clap_display!(SynthesisMode);

impl SynthesisMode {
    /// Returns true if states disabling an uncontrollable plant event are removed.
    pub const fn enforces_controllability(self) -> bool {
        matches!(self, Self::Controllable | Self::ControllableNormal)
    }

    /// Returns true if states are removed together with all states
    /// sharing the same observation.
    pub const fn enforces_normality(self) -> bool {
        matches!(self, Self::Normal | Self::ControllableNormal)
    }
}

/// The strategy to use for choosing the next state during
/// exploration of a product automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExplorationStrategy {
    /// Explore states in a breadth-first search, i.e.
    /// choose the state that was discovered the earliest as the next state.
    #[value(name = "bfs")]
    Bfs,
    /// Explore states in a depth-first search, i.e.
    /// choose the state that was discovered the latest as the next state.
    #[value(name = "dfs")]
    Dfs,
}
impl Default for ExplorationStrategy {
    fn default() -> Self {
        Self::Bfs
    }
}
clap_display!(ExplorationStrategy);

/// The trace level / verbosity for the logging framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    /// Turn logging off.
    #[value(name = "off")]
    Off,
    /// Only print errors.
    #[value(name = "error")]
    Error,
    /// Print errors and warnings.
    #[value(name = "warn")]
    Warn,
    /// Print errors, warnings and useful information.
    #[value(name = "info")]
    Info,
    /// Print errors, warnings, useful and debug information.
    #[value(name = "debug")]
    Debug,
    /// Print all information, including very verbose output.
    #[value(name = "trace")]
    Trace,
}
impl Default for TraceLevel {
    fn default() -> Self {
        Self::Error
    }
}
clap_display!(TraceLevel);

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => Self::Off,
            TraceLevel::Error => Self::Error,
            TraceLevel::Warn => Self::Warn,
            TraceLevel::Info => Self::Info,
            TraceLevel::Debug => Self::Debug,
            TraceLevel::Trace => Self::Trace,
        }
    }
}

/// A flag that can be raised from another thread to cancel a running
/// composition or synthesis. Raising it never corrupts an automaton
/// that was already returned.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of all computations observing this flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bounds on the resources of a single synthesis run.
///
/// An exceeded bound results in [`Error::ResourceExhausted`](crate::Error::ResourceExhausted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct Limits {
    /// Maximal number of states of any explored product or projection.
    #[arg(
        long = "max-states",
        value_name = "N",
        help = "Maximal number of states of an explored product",
        display_order = 20
    )]
    pub max_states: Option<usize>,
    /// Maximal number of sweeps of the synthesis fixed point.
    #[arg(
        long = "max-iterations",
        value_name = "N",
        help = "Maximal number of fixed-point iterations",
        display_order = 21
    )]
    pub max_iterations: Option<usize>,
    /// Maximal wall-clock time for the whole run, in seconds.
    #[arg(
        long = "time-limit",
        value_name = "SECONDS",
        help = "Time limit for synthesis in seconds",
        display_order = 22
    )]
    pub time_limit: Option<u64>,
}

/// A group of options used for parsing the arguments of the
/// command-line interface.
///
/// This struct should mainly be used with [`clap`] and not
/// instantiated manually. For using this crate as library,
/// please use [`SynthesisOptions`] directly instead. This struct
/// only includes additional fields for specifying the models,
/// the alphabet and output options.
#[derive(Debug, Clone, Default, Parser)]
#[command(version, about)]
pub struct CliOptions {
    /// The files with the plant models, composed in parallel.
    #[arg(
        short = 'p',
        long = "plant",
        value_name = "FILE",
        required = true,
        help = "Plant model file (may be repeated)",
        display_order = 0
    )]
    pub plants: Vec<String>,
    /// The files with the property models, composed in parallel
    /// after extension to the full alphabet.
    #[arg(
        short = 'P',
        long = "property",
        value_name = "FILE",
        required = true,
        help = "Property model file (may be repeated)",
        display_order = 1
    )]
    pub properties: Vec<String>,
    /// The format of the input model files.
    #[arg(
        value_enum,
        short = 'i',
        long = "input-format",
        value_name = "FORMAT",
        default_value_t,
        help = "Format of the model files",
        display_order = 2
    )]
    pub input_format: ModelFormat,
    /// The event universe. If empty, the union of the events of all models is used.
    #[arg(
        long = "alphabet",
        value_name = "EVENTS",
        value_delimiter = ',',
        help = "Comma-separated list of all events (default: events of the models)",
        display_order = 3
    )]
    pub alphabet: Vec<String>,
    /// The controllable events.
    #[arg(
        short = 'c',
        long = "controllable",
        value_name = "EVENTS",
        value_delimiter = ',',
        help = "Comma-separated list of controllable events",
        display_order = 4
    )]
    pub controllable: Vec<String>,
    /// The uncontrollable events, an alternative to listing the controllable events.
    #[arg(
        short = 'u',
        long = "uncontrollable",
        value_name = "EVENTS",
        value_delimiter = ',',
        conflicts_with = "controllable",
        help = "Comma-separated list of uncontrollable events, all others are controllable",
        display_order = 5
    )]
    pub uncontrollable: Vec<String>,
    /// The observable events. If empty, every event is observable.
    #[arg(
        long = "observable",
        value_name = "EVENTS",
        value_delimiter = ',',
        help = "Comma-separated list of observable events (default: all events)",
        display_order = 6
    )]
    pub observable: Vec<String>,
    /// The output file where the supervisor should be written to.
    #[arg(
        short = 'O',
        long = "output-file",
        value_name = "FILE",
        help = "Write supervisor to the given file",
        display_order = 7
    )]
    pub output_file: Option<String>,
    /// The format for writing the supervisor.
    #[arg(
        value_enum,
        short = 'o',
        long = "output-format",
        value_name = "FORMAT",
        default_value_t,
        help = "Format of the written supervisor",
        display_order = 8
    )]
    pub output_format: ModelFormat,
    /// The trace level to use for instantiating the logging framework.
    #[arg(
        value_enum,
        short = 't',
        long = "trace",
        value_name = "LEVEL",
        default_value_t,
        help = "Trace level",
        display_order = 30
    )]
    pub trace_level: TraceLevel,
    /// The set of options for the synthesis process.
    #[command(flatten)]
    pub synthesis_options: SynthesisOptions,
}

/// Options to control the synthesis procedure and the reduction of the supervisor.
///
/// These options can then be used with [`synthesize_with`](crate::synthesize_with).
///
/// # Examples
///
/// ```
/// use desynth::options::*;
/// let options = SynthesisOptions {
///     mode: SynthesisMode::Controllable,
///     limits: Limits {
///         max_states: Some(100_000),
///         ..Limits::default()
///     },
///     ..SynthesisOptions::default()
/// };
/// assert!(!options.mode.enforces_normality());
/// ```
#[derive(Debug, Clone, Args)]
pub struct SynthesisOptions {
    /// The closure properties enforced by synthesis.
    #[arg(
        value_enum,
        short = 'm',
        long = "mode",
        value_name = "MODE",
        default_value_t,
        help = "Closure properties of the supremal sublanguage",
        display_order = 10
    )]
    pub mode: SynthesisMode,
    /// Treat all reachable states as safe instead of requiring that a marked
    /// state stays reachable.
    #[arg(
        long = "nonblocking",
        action = clap::ArgAction::SetFalse,
        help = "Also remove states from which no marked state is reachable",
        display_order = 11
    )]
    pub prefix_closed: bool,
    /// The strategy used to explore product automata.
    #[arg(
        value_enum,
        short = 'e',
        long = "exploration",
        value_name = "STRATEGY",
        default_value_t,
        help = "Exploration strategy for product automata",
        display_order = 12
    )]
    pub exploration_strategy: ExplorationStrategy,
    /// Project the supervisor onto the observable events.
    #[arg(
        long = "no-reduction",
        action = clap::ArgAction::SetFalse,
        help = "Do not reduce the supervisor to the observable events",
        display_order = 13
    )]
    pub observer_reduction: bool,
    /// Merge equivalent states of the reduced supervisor.
    #[arg(
        long = "no-minimization",
        action = clap::ArgAction::SetFalse,
        help = "Do not minimize the reduced supervisor",
        display_order = 14
    )]
    pub minimization: bool,
    /// Return the unreduced supervisor if the reduction violates the observer property.
    #[arg(
        long = "fallback",
        help = "Output the unreduced supervisor if the observer property is violated",
        display_order = 15
    )]
    pub observer_fallback: bool,
    /// The resource bounds of a run.
    #[command(flatten)]
    pub limits: Limits,
    /// Cancellation flag observed during exploration and the fixed point.
    #[arg(skip)]
    pub abort: AbortFlag,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::default(),
            prefix_closed: true,
            exploration_strategy: ExplorationStrategy::default(),
            observer_reduction: true,
            minimization: true,
            observer_fallback: false,
            limits: Limits::default(),
            abort: AbortFlag::default(),
        }
    }
}

impl From<&CliOptions> for SynthesisOptions {
    fn from(options: &CliOptions) -> Self {
        options.synthesis_options.clone()
    }
}
