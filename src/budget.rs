use std::time::{Duration, Instant};

use crate::error::{Error, Resource};
use crate::options::{AbortFlag, Limits, SynthesisOptions};

/// Tracks the resource limits of one run of composition or synthesis.
#[derive(Debug, Clone)]
pub(crate) struct Budget {
    limits: Limits,
    abort: AbortFlag,
    start: Instant,
}

impl Budget {
    pub(crate) fn new(limits: &Limits, abort: &AbortFlag) -> Self {
        Self {
            limits: limits.clone(),
            abort: abort.clone(),
            start: Instant::now(),
        }
    }

    pub(crate) fn of(options: &SynthesisOptions) -> Self {
        Self::new(&options.limits, &options.abort)
    }

    pub(crate) fn unlimited() -> Self {
        Self::new(&Limits::default(), &AbortFlag::default())
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Checks the abort flag and the time limit.
    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.abort.is_raised() {
            return Err(Error::Aborted);
        }
        if let Some(seconds) = self.limits.time_limit {
            if self.start.elapsed() >= Duration::from_secs(seconds) {
                return Err(Error::ResourceExhausted {
                    resource: Resource::Time,
                    limit: seconds,
                });
            }
        }
        Ok(())
    }

    /// Checks that an automaton with `states` states may still be built.
    pub(crate) fn check_states(&self, states: usize) -> Result<(), Error> {
        match self.limits.max_states {
            Some(limit) if states > limit => Err(Error::ResourceExhausted {
                resource: Resource::States,
                limit: limit as u64,
            }),
            _ => self.check(),
        }
    }

    /// Checks that sweep number `iteration` (starting at 1) of a fixed point may run.
    pub(crate) fn check_iteration(&self, iteration: usize) -> Result<(), Error> {
        match self.limits.max_iterations {
            Some(limit) if iteration > limit => Err(Error::ResourceExhausted {
                resource: Resource::Iterations,
                limit: limit as u64,
            }),
            _ => self.check(),
        }
    }
}
