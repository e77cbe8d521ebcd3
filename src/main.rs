//! desynth binary crate.

use std::collections::HashSet;
use std::io::{self, Write};

use clap::Parser;
use log::warn;

use desynth::model::{load_raw_model, serialize_model, write_model, RawModel};
use desynth::options::{CliOptions, SynthesisOptions, TraceLevel};
use desynth::{synthesize_with, Error, EventAlphabet, Problem};

fn main() {
    if let Err(error) = desynth_main() {
        // discard result as we cannot further propagate a write error
        let _ = writeln!(io::stderr(), "Error: {}", error);
        if error.is_resource_error() {
            let _ = writeln!(
                io::stderr(),
                "The computation is too large for the given limits; \
                 raise --max-states, --max-iterations or --time-limit"
            );
        }
        std::process::exit(1);
    }
}

/// Initialize the logging framework with the given trace level.
///
/// # Errors
///
/// Returns an error if the logging framework has already been initialized.
fn initialize_logging(level: TraceLevel) -> io::Result<()> {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

/// Builds the alphabet from the options, using the events of the models
/// as universe if no alphabet is given.
fn build_alphabet(options: &CliOptions, models: &[&RawModel]) -> Result<EventAlphabet, Error> {
    let universe: Vec<String> = if options.alphabet.is_empty() {
        let mut seen = HashSet::new();
        models
            .iter()
            .flat_map(|m| m.events())
            .filter(|e| seen.insert(*e))
            .map(str::to_owned)
            .collect()
    } else {
        options.alphabet.iter().map(|s| s.trim().to_owned()).collect()
    };
    let controllable: Vec<String> = if !options.controllable.is_empty() {
        options.controllable.iter().map(|s| s.trim().to_owned()).collect()
    } else if !options.uncontrollable.is_empty() {
        let uncontrollable: HashSet<&str> = options.uncontrollable.iter().map(|s| s.trim()).collect();
        let declared: HashSet<&str> = universe.iter().map(String::as_str).collect();
        if let Some(stray) = options
            .uncontrollable
            .iter()
            .map(|s| s.trim())
            .find(|e| !declared.contains(e))
        {
            return Err(Error::InvalidAlphabet(format!(
                "uncontrollable event `{}` is not part of the alphabet",
                stray
            )));
        }
        universe
            .iter()
            .filter(|e| !uncontrollable.contains(e.as_str()))
            .cloned()
            .collect()
    } else {
        warn!("No controllable events given, every event is uncontrollable");
        Vec::new()
    };
    let observable: Vec<String> = if options.observable.is_empty() {
        universe.clone()
    } else {
        options.observable.iter().map(|s| s.trim().to_owned()).collect()
    };
    EventAlphabet::new(&universe, &controllable, &observable)
}

/// Main function that parses the options, reads the models,
/// calls the synthesis procedure and writes the output.
///
/// # Errors
///
/// Returns an error if a model could not be read or resolved, or if the
/// synthesis exceeded its resource limits.
fn desynth_main() -> Result<(), Error> {
    let options = CliOptions::parse();
    initialize_logging(options.trace_level)?;

    let plants = options
        .plants
        .iter()
        .map(|path| load_raw_model(path, options.input_format))
        .collect::<Result<Vec<_>, _>>()?;
    let properties = options
        .properties
        .iter()
        .map(|path| load_raw_model(path, options.input_format))
        .collect::<Result<Vec<_>, _>>()?;
    let models: Vec<&RawModel> = plants.iter().chain(properties.iter()).collect();
    let alphabet = build_alphabet(&options, &models)?;

    let plants = plants
        .iter()
        .map(|m| m.resolve(&alphabet))
        .collect::<Result<Vec<_>, _>>()?;
    let properties = properties
        .iter()
        .map(|m| m.resolve(&alphabet))
        .collect::<Result<Vec<_>, _>>()?;
    let problem = Problem::new(alphabet, plants, properties);
    let synthesis_options = SynthesisOptions::from(&options);
    let result = synthesize_with(&problem, &synthesis_options)?;

    writeln!(io::stdout(), "{}", result.status())?;
    for violation in result.violations() {
        writeln!(io::stderr(), "{}", violation.describe(&problem.alphabet))?;
    }
    if let Some(supervisor) = result.supervisor() {
        if let Some(output_file) = &options.output_file {
            write_model(output_file, supervisor, options.output_format, &problem.alphabet)?;
        } else {
            let text = serialize_model(supervisor, options.output_format, &problem.alphabet)?;
            write!(io::stdout(), "{}", text)?;
        }
    }
    Ok(())
}
