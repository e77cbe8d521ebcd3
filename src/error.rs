//! Errors reported by the synthesis procedure and the model boundary.

use std::fmt;
use std::io;

use thiserror::Error;

/// A resource whose configured bound can be exceeded during synthesis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Number of states of an explored product or projection.
    States,
    /// Number of sweeps of the synthesis fixed point.
    Iterations,
    /// Wall-clock time in seconds.
    Time,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Self::States => "states",
            Self::Iterations => "iterations",
            Self::Time => "seconds",
        };
        write!(f, "{}", string)
    }
}

/// The error type of this crate.
///
/// Infeasibility of synthesis and violation of the observer property are
/// regular outcomes, see [`Status`](crate::Status), and not represented here.
#[derive(Debug, Error)]
pub enum Error {
    /// A model or a subset of the alphabet mentions an event that is not
    /// part of the configured event universe.
    #[error("unknown event '{event}' in {context}")]
    UnknownEvent {
        /// The name of the offending event.
        event: String,
        /// Where the event was referenced.
        context: String,
    },
    /// The alphabet configuration itself is inconsistent.
    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),
    /// A model text could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// The line (starting at 1) where the error was detected.
        line: usize,
        /// Description of the problem.
        message: String,
    },
    /// An automaton cannot be expressed in the requested model format.
    #[error("cannot write model: {0}")]
    Unrepresentable(String),
    /// An operation that needs at least one operand was called without any.
    #[error("no {0} given")]
    NoOperands(&'static str),
    /// A configured bound was exceeded; the computation may be retried with a
    /// larger bound or a decomposed problem.
    #[error("resource limit exceeded: more than {limit} {resource}")]
    ResourceExhausted {
        /// The exhausted resource.
        resource: Resource,
        /// The configured bound.
        limit: u64,
    },
    /// The computation was cancelled through an [`AbortFlag`](crate::options::AbortFlag).
    #[error("computation aborted")]
    Aborted,
    /// An I/O error, e.g. from reading a model file.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Returns true if this error signals exhaustion of a resource bound
    /// or an external abort, as opposed to malformed input.
    pub fn is_resource_error(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. } | Self::Aborted)
    }
}
