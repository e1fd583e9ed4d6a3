use log::{debug, info, log, Level};
use rand::Rng;
use strum::{Display, EnumIter, EnumString};

use crate::{
    env::{DiscreteActionSpace, DiscreteStateSpace, Model},
    error::{ConfigurationError, SolveError, UnknownMethodError},
    space::{State, StateSpace},
    table::{Policy, ValueFunction},
};

/// How [`Solver::improve_policy`] drives the value and policy tables to convergence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Method {
    /// Policy iteration: evaluate the policy to convergence, improve it greedily, repeat until stable
    #[strum(to_string = "sync", serialize = "policy_iteration")]
    Sync,
    /// Value iteration: back up the best action value in every state until the values settle, then read
    /// off the greedy policy once
    #[strum(to_string = "value_iter", serialize = "value_iteration")]
    ValueIteration,
}

impl Method {
    /// Parse a method tag such as `"sync"` or `"value_iter"`
    pub fn from_tag(tag: &str) -> Result<Self, UnknownMethodError> {
        tag.parse().map_err(|_| UnknownMethodError {
            tag: tag.to_owned(),
        })
    }
}

/// How a sweep writes its new values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateStrategy {
    /// Overwrite each value as soon as it is computed, so later states in the same sweep read fresher
    /// values (Gauss-Seidel)
    #[default]
    InPlace,
    /// Compute the whole sweep against the previous table and swap at the end (Jacobi)
    ///
    /// Reaches the same fixed point as [`UpdateStrategy::InPlace`] along a different trajectory.
    DoubleBuffered,
}

/// Where the greedy search over actions starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BestValueSeed {
    /// Policy improvement starts at `0.0` and value iteration at the state's current value
    ///
    /// An action must beat the seed strictly to be selected, so a state where no action returns more than
    /// zero keeps its previous action. This assumes returns are non-negative.
    #[default]
    Zero,
    /// Both searches start at negative infinity and always pick the maximizing action
    NegInfinity,
}

/// Where a solver is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    #[default]
    Initialized,
    Evaluating,
    Improving,
    Converged,
}

/// Cumulative work done by a solver since it was built or last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Policy evaluation sweeps
    pub evaluation_sweeps: usize,
    /// Policy improvement sweeps
    pub improvement_sweeps: usize,
    /// Rounds of policy iteration (one full evaluation plus one improvement)
    pub policy_iterations: usize,
    /// Value iteration sweeps
    pub value_iteration_sweeps: usize,
}

/// Configuration for the [`Solver`]
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Convergence threshold on the largest value change in a sweep
    pub epsilon: f64,
    /// Log every state's improvement at `info` instead of `trace`
    pub verbose: bool,
    pub update: UpdateStrategy,
    pub best_value_seed: BestValueSeed,
    /// Maximum sweeps in any one convergence loop, unbounded if `None`
    pub max_sweeps: Option<usize>,
    /// Maximum rounds of policy iteration, unbounded if `None`
    pub max_rounds: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            verbose: false,
            update: UpdateStrategy::InPlace,
            best_value_seed: BestValueSeed::Zero,
            max_sweeps: None,
            max_rounds: None,
        }
    }
}

/// A dynamic programming solver for finite MDPs
///
/// Owns a dense rectangular state space, an action set shared by every state, a policy table and a value
/// table. All dynamics live behind the model's [`Model::expected_return`], which the solver calls once per
/// state per action on each sweep.
///
/// ### Generics
/// - `M` - The [`Model`] being solved
///
/// ### Example
/// ```
/// use std::convert::Infallible;
///
/// use mdp::{
///     algo::{Method, Solver, SolverConfig},
///     env::Model,
///     space::State,
///     table::ValueFunction,
/// };
/// use rand::{rngs::StdRng, SeedableRng};
///
/// // Walk right to reach the absorbing end of a corridor
/// struct Corridor;
///
/// impl Model for Corridor {
///     type Action = usize;
///     type Error = Infallible;
///
///     fn expected_return(&self, s: &State, a: usize, v: &ValueFunction) -> Result<f64, Infallible> {
///         Ok(match s[0] {
///             4 => 0.0,
///             3 if a == 1 => 1.0,
///             i if a == 1 => 0.9 * v[[i + 1]],
///             i => 0.9 * v[[i.saturating_sub(1)]],
///         })
///     }
/// }
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let mut solver = Solver::new(Corridor, &[5], vec![0, 1], SolverConfig::default(), &mut rng).unwrap();
/// solver.improve_policy(Method::ValueIteration).unwrap();
///
/// assert_eq!(solver.action(&[0]), Some(1));
/// ```
pub struct Solver<M: Model> {
    model: M,
    space: StateSpace,
    actions: Vec<M::Action>,
    policy: Policy<M::Action>,
    values: ValueFunction,
    pinned: Vec<Option<f64>>,
    config: SolverConfig,
    phase: Phase,
    stats: Stats,
}

impl<M: Model> Solver<M> {
    /// Initialize a new `Solver` over the state space `state_dims` with the given action set
    ///
    /// Every state starts with a uniformly random action drawn from `rng` and a value of `0.0`. The model's
    /// [pinned values](Model::pinned_values) are applied afterwards.
    ///
    /// **Errors** if `state_dims` is empty or has a zero-sized dimension, if `actions` is empty, if
    /// `config.epsilon` is not positive and finite, or if a pinned state is outside the state space
    pub fn new<R: Rng + ?Sized>(
        model: M,
        state_dims: &[usize],
        actions: Vec<M::Action>,
        config: SolverConfig,
        rng: &mut R,
    ) -> Result<Self, ConfigurationError> {
        if !(config.epsilon > 0.0 && config.epsilon.is_finite()) {
            return Err(ConfigurationError::InvalidEpsilon(config.epsilon));
        }
        if actions.is_empty() {
            return Err(ConfigurationError::NoActions);
        }

        let space = StateSpace::new(state_dims)?;
        let shape = space.shape().clone();
        let policy = Policy::from_fn(shape.clone(), |_| {
            actions[rng.gen_range(0..actions.len())]
        });
        let values = ValueFunction::zeros(shape);
        let pinned = vec![None; space.len()];

        let mut solver = Self {
            model,
            space,
            actions,
            policy,
            values,
            pinned,
            config,
            phase: Phase::Initialized,
            stats: Stats::default(),
        };

        for (state, value) in solver.model.pinned_values() {
            solver.pin(&state, value)?;
        }

        debug!(
            "solver ready: {} states of shape {:?}, {} actions",
            solver.space.len(),
            solver.space.dims(),
            solver.actions.len()
        );

        Ok(solver)
    }

    /// Restart training: draw a fresh random policy, zero every value and re-apply pinned values
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let actions = &self.actions;
        self.policy = Policy::from_fn(self.space.shape().clone(), |_| {
            actions[rng.gen_range(0..actions.len())]
        });
        self.values.fill(0.0);
        for (i, pin) in self.pinned.iter().enumerate() {
            if let Some(value) = *pin {
                self.values.set(i, value);
            }
        }
        self.phase = Phase::Initialized;
        self.stats = Stats::default();
    }

    /// Fix the value of a state so that no sweep ever overwrites it
    ///
    /// **Errors** if the state is outside the state space
    pub fn pin(&mut self, state: &[usize], value: f64) -> Result<(), ConfigurationError> {
        let i = self
            .space
            .index_of(state)
            .ok_or_else(|| ConfigurationError::StateOutOfBounds {
                state: state.to_vec(),
                dims: self.space.dims().to_vec(),
            })?;
        self.pinned[i] = Some(value);
        self.values.set(i, value);
        Ok(())
    }

    /// Perform exactly one policy evaluation sweep
    ///
    /// Every state that is not pinned gets the expected return of its current policy action.
    ///
    /// **Returns** the largest absolute value change seen during the sweep
    pub fn sync_evaluate_policy(&mut self) -> Result<f64, SolveError<M::Error>> {
        self.phase = Phase::Evaluating;

        let Self {
            model,
            space,
            policy,
            values,
            pinned,
            config,
            ..
        } = self;
        let delta = sweep(space, pinned, values, config.update, |i, state, values| {
            expected_return(model, state, policy.at(i), values)
        })?;

        self.stats.evaluation_sweeps += 1;
        debug!(
            "evaluation sweep {}: delta = {delta}",
            self.stats.evaluation_sweeps
        );

        Ok(delta)
    }

    /// Evaluate the current policy until a sweep changes no value by more than `epsilon`
    ///
    /// Never returns if the model is not a contraction, unless [`SolverConfig::max_sweeps`] is set.
    ///
    /// **Returns** the number of sweeps performed
    pub fn evaluate_policy(&mut self) -> Result<usize, SolveError<M::Error>> {
        let mut sweeps = 0;
        loop {
            let delta = self.sync_evaluate_policy()?;
            sweeps += 1;
            if delta <= self.config.epsilon {
                return Ok(sweeps);
            }
            self.check_sweep_budget(sweeps, delta)?;
        }
    }

    /// Perform exactly one greedy policy improvement sweep
    ///
    /// In every state the actions are tried in order and the first one whose expected return strictly beats
    /// the running best is kept, so ties go to the lowest-indexed action.
    ///
    /// **Returns** `true` if no state changed its action
    pub fn sync_improve_policy(&mut self) -> Result<bool, SolveError<M::Error>> {
        self.phase = Phase::Improving;

        let seed = match self.config.best_value_seed {
            BestValueSeed::Zero => 0.0,
            BestValueSeed::NegInfinity => f64::NEG_INFINITY,
        };
        let level = if self.config.verbose {
            Level::Info
        } else {
            Level::Trace
        };

        let mut stable = true;
        for (i, state) in self.space.iter().enumerate() {
            let old_action = self.policy.at(i);
            let (best_action, best_value) = greedy(
                &self.model,
                &self.actions,
                state,
                old_action,
                seed,
                &self.values,
            )?;
            self.policy.set(i, best_action);

            log!(
                level,
                "{:^16} | {:>12?} -> {:<12?} | {:>12.4}",
                state.to_string(),
                old_action,
                best_action,
                best_value
            );

            if best_action != old_action {
                stable = false;
            }
        }

        self.stats.improvement_sweeps += 1;
        debug!(
            "improvement sweep {}: stable = {stable}",
            self.stats.improvement_sweeps
        );

        Ok(stable)
    }

    /// Perform exactly one value iteration sweep
    ///
    /// Every state that is not pinned gets the best expected return over all actions. The policy is left
    /// untouched.
    ///
    /// **Returns** the largest absolute value change seen during the sweep
    pub fn sync_value_iteration(&mut self) -> Result<f64, SolveError<M::Error>> {
        self.phase = Phase::Evaluating;

        let Self {
            model,
            space,
            actions,
            policy,
            values,
            pinned,
            config,
            ..
        } = self;
        let seed_mode = config.best_value_seed;
        let delta = sweep(space, pinned, values, config.update, |i, state, values| {
            let seed = match seed_mode {
                BestValueSeed::Zero => values.at(i),
                BestValueSeed::NegInfinity => f64::NEG_INFINITY,
            };
            greedy(model, actions, state, policy.at(i), seed, values).map(|(_, v)| v)
        })?;

        self.stats.value_iteration_sweeps += 1;
        debug!(
            "value iteration sweep {}: delta = {delta}",
            self.stats.value_iteration_sweeps
        );

        Ok(delta)
    }

    /// Solve for an optimal policy with the given method
    ///
    /// - [`Method::Sync`] alternates [`Solver::evaluate_policy`] and [`Solver::sync_improve_policy`] until the
    ///   policy is stable.
    /// - [`Method::ValueIteration`] repeats [`Solver::sync_value_iteration`] until a sweep's delta drops
    ///   below `epsilon`, then runs one [`Solver::sync_improve_policy`] to extract the policy.
    pub fn improve_policy(&mut self, method: Method) -> Result<(), SolveError<M::Error>> {
        info!("solving {} states with {method}", self.space.len());

        match method {
            Method::Sync => {
                let mut rounds = 0;
                loop {
                    rounds += 1;
                    let sweeps = self.evaluate_policy()?;
                    self.stats.policy_iterations += 1;
                    debug!("policy iteration {rounds}: evaluation took {sweeps} sweeps");

                    if self.sync_improve_policy()? {
                        break;
                    }
                    if let Some(max) = self.config.max_rounds {
                        if rounds >= max {
                            return Err(SolveError::RoundLimit { rounds });
                        }
                    }
                }
                info!("policy stable after {rounds} rounds of policy iteration");
            }
            Method::ValueIteration => {
                let mut sweeps = 0;
                loop {
                    let delta = self.sync_value_iteration()?;
                    sweeps += 1;
                    if delta < self.config.epsilon {
                        break;
                    }
                    self.check_sweep_budget(sweeps, delta)?;
                }
                info!("values settled after {sweeps} sweeps of value iteration");
                self.sync_improve_policy()?;
            }
        }

        self.phase = Phase::Converged;
        Ok(())
    }

    fn check_sweep_budget(&self, sweeps: usize, delta: f64) -> Result<(), SolveError<M::Error>> {
        match self.config.max_sweeps {
            Some(max) if sweeps >= max => Err(SolveError::SweepLimit { sweeps, delta }),
            _ => Ok(()),
        }
    }

    /// Value of a state, or `None` if it is outside the state space
    pub fn value(&self, state: &[usize]) -> Option<f64> {
        self.values.get(state)
    }

    /// Current action in a state, or `None` if it is outside the state space
    pub fn action(&self, state: &[usize]) -> Option<M::Action> {
        self.policy.get(state)
    }

    /// Whether a state's value is pinned
    pub fn is_pinned(&self, state: &[usize]) -> bool {
        self.space
            .index_of(state)
            .is_some_and(|i| self.pinned[i].is_some())
    }

    /// Iterate `(state, action, value)` in sweep order
    pub fn iter(&self) -> impl Iterator<Item = (&State, M::Action, f64)> + '_ {
        self.space
            .iter()
            .zip(self.policy.as_slice().iter().copied())
            .zip(self.values.as_slice().iter().copied())
            .map(|((s, a), v)| (s, a, v))
    }

    pub fn values(&self) -> &ValueFunction {
        &self.values
    }

    pub fn policy(&self) -> &Policy<M::Action> {
        &self.policy
    }

    pub fn states(&self) -> &StateSpace {
        &self.space
    }

    pub fn actions(&self) -> &[M::Action] {
        &self.actions
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Give back the model along with the final policy and value tables
    pub fn into_parts(self) -> (M, Policy<M::Action>, ValueFunction) {
        (self.model, self.policy, self.values)
    }
}

impl<M> Solver<M>
where
    M: Model + DiscreteStateSpace + DiscreteActionSpace,
{
    /// Initialize a new `Solver` using the state and action spaces the model describes
    pub fn for_model<R: Rng + ?Sized>(
        model: M,
        config: SolverConfig,
        rng: &mut R,
    ) -> Result<Self, ConfigurationError> {
        let dims = model.state_dims();
        let actions = model.actions();
        Self::new(model, &dims, actions, config, rng)
    }
}

fn expected_return<M: Model>(
    model: &M,
    state: &State,
    action: M::Action,
    values: &ValueFunction,
) -> Result<f64, SolveError<M::Error>> {
    model
        .expected_return(state, action, values)
        .map_err(|source| SolveError::Model {
            state: state.clone(),
            source,
        })
}

/// Find the first action whose expected return strictly beats `seed` and every action before it
///
/// Falls back to `(fallback, seed)` when nothing beats the seed.
fn greedy<M: Model>(
    model: &M,
    actions: &[M::Action],
    state: &State,
    fallback: M::Action,
    seed: f64,
    values: &ValueFunction,
) -> Result<(M::Action, f64), SolveError<M::Error>> {
    let mut best = (fallback, seed);
    for &action in actions {
        let value = expected_return(model, state, action, values)?;
        if value > best.1 {
            best = (action, value);
        }
    }

    Ok(best)
}

/// Sweep every unpinned state once, replacing its value with `backup(index, state, values)`
///
/// **Returns** the largest absolute change
fn sweep<E>(
    space: &StateSpace,
    pinned: &[Option<f64>],
    values: &mut ValueFunction,
    update: UpdateStrategy,
    mut backup: impl FnMut(usize, &State, &ValueFunction) -> Result<f64, E>,
) -> Result<f64, E> {
    let mut delta = 0.0_f64;

    match update {
        UpdateStrategy::InPlace => {
            for (i, state) in space.iter().enumerate() {
                if pinned[i].is_some() {
                    continue;
                }
                let old = values.at(i);
                let new = backup(i, state, values)?;
                values.set(i, new);
                delta = delta.max((old - new).abs());
            }
        }
        UpdateStrategy::DoubleBuffered => {
            let mut next = values.clone();
            for (i, state) in space.iter().enumerate() {
                if pinned[i].is_some() {
                    continue;
                }
                let new = backup(i, state, values)?;
                next.set(i, new);
                delta = delta.max((values.at(i) - new).abs());
            }
            *values = next;
        }
    }

    Ok(delta)
}
