use thiserror::Error;

use crate::space::State;

/// Invalid arguments given while building a solver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("state space must have at least one dimension")]
    NoDimensions,
    #[error("state dimension {index} has size 0")]
    EmptyDimension { index: usize },
    #[error("state space of shape {dims:?} has too many states to enumerate")]
    TooLarge { dims: Vec<usize> },
    #[error("action set must not be empty")]
    NoActions,
    #[error("convergence threshold must be positive and finite, got {0}")]
    InvalidEpsilon(f64),
    #[error("state {state:?} is outside a state space of shape {dims:?}")]
    StateOutOfBounds { state: Vec<usize>, dims: Vec<usize> },
    #[error("invalid value for `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// A method tag that names no known solving method
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown method `{tag}`, expected `sync` or `value_iter`")]
pub struct UnknownMethodError {
    pub tag: String,
}

/// Failure while running a solver
///
/// Sweeps are not transactional: when one of these is returned the value and policy tables may be left
/// partially updated.
#[derive(Error, Debug)]
pub enum SolveError<E> {
    /// The model failed to compute an expected return
    #[error("expected return failed in state {state}")]
    Model {
        state: State,
        #[source]
        source: E,
    },
    /// A convergence loop ran out of its sweep budget
    #[error("no convergence after {sweeps} sweeps, last delta was {delta}")]
    SweepLimit { sweeps: usize, delta: f64 },
    /// Policy iteration ran out of its round budget without reaching a stable policy
    #[error("policy still changing after {rounds} rounds of policy iteration")]
    RoundLimit { rounds: usize },
}
