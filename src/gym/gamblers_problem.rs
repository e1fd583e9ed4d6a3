use std::convert::Infallible;

use crate::{
    env::{DiscreteActionSpace, DiscreteStateSpace, Model},
    error::ConfigurationError,
    space::State,
    table::ValueFunction,
};

/// The gambler's problem from Sutton & Barto, example 4.3
///
/// A gambler with some capital repeatedly stakes part of it on a coin flip that comes up heads with
/// probability `prob_heads`. Heads doubles the stake, tails loses it. The episode ends when the gambler
/// reaches `goal`, worth a reward of 1, or runs out of money.
///
/// States are the capital `[0, goal]`, actions are stakes `1..goal`. A stake larger than the gambler can
/// afford, or larger than what is needed to reach the goal, is worth nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct GamblersProblem {
    goal: usize,
    prob_heads: f64,
    gamma: f64,
}

impl Default for GamblersProblem {
    fn default() -> Self {
        Self {
            goal: 100,
            prob_heads: 0.5,
            gamma: 1.0,
        }
    }
}

impl GamblersProblem {
    /// Initialize a new `GamblersProblem`
    ///
    /// **Errors** if `goal` is less than 2 or if `prob_heads` or `gamma` is not in the interval `[0,1]`
    pub fn new(goal: usize, prob_heads: f64, gamma: f64) -> Result<Self, ConfigurationError> {
        if goal < 2 {
            return Err(ConfigurationError::InvalidParameter {
                name: "goal",
                value: goal as f64,
            });
        }
        for (name, value) in [("prob_heads", prob_heads), ("gamma", gamma)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidParameter { name, value });
            }
        }

        Ok(Self {
            goal,
            prob_heads,
            gamma,
        })
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    pub fn prob_heads(&self) -> f64 {
        self.prob_heads
    }
}

impl Model for GamblersProblem {
    /// The stake
    type Action = usize;
    type Error = Infallible;

    fn expected_return(
        &self,
        state: &State,
        stake: usize,
        values: &ValueFunction,
    ) -> Result<f64, Infallible> {
        let capital = state[0];
        if capital == 0 {
            return Ok(0.0);
        }
        if capital >= self.goal {
            return Ok(1.0);
        }
        if stake > capital.min(self.goal - capital) {
            return Ok(0.0);
        }

        let win = values[[capital + stake]];
        let loss = values[[capital - stake]];
        Ok(self.gamma * (self.prob_heads * win + (1.0 - self.prob_heads) * loss))
    }

    fn pinned_values(&self) -> Vec<(State, f64)> {
        vec![(State::from([self.goal]), 1.0)]
    }
}

impl DiscreteStateSpace for GamblersProblem {
    fn state_dims(&self) -> Vec<usize> {
        vec![self.goal + 1]
    }
}

impl DiscreteActionSpace for GamblersProblem {
    fn actions(&self) -> Vec<Self::Action> {
        (1..self.goal).collect()
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        algo::{Method, Solver, SolverConfig},
        space::Shape,
    };

    fn solver(env: GamblersProblem, seed: u64) -> Solver<GamblersProblem> {
        let mut rng = StdRng::seed_from_u64(seed);
        Solver::for_model(env, SolverConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn gamblers_problem_functional() {
        let env = GamblersProblem::new(10, 0.25, 1.0).unwrap();
        assert_eq!(env.state_dims(), vec![11], "capital 0 through goal");
        assert_eq!(env.actions(), (1..10).collect::<Vec<_>>(), "stakes");

        let mut values = ValueFunction::zeros(Shape::new(&[11]).unwrap());
        values.set(10, 1.0);
        values.set(2, 0.5);

        let ret = |capital: usize, stake: usize| {
            env.expected_return(&State::from([capital]), stake, &values)
                .unwrap()
        };
        assert_eq!(ret(0, 1), 0.0, "broke");
        assert_eq!(ret(10, 3), 1.0, "goal reached");
        assert_eq!(ret(3, 4), 0.0, "stake exceeds capital");
        assert_eq!(ret(8, 3), 0.0, "stake overshoots goal");
        assert_eq!(ret(5, 5), 0.25, "all in");
        assert_eq!(ret(4, 2), 0.75 * 0.5, "loss lands on a valued state");
    }

    #[test]
    fn gamblers_problem_rejects_bad_parameters() {
        assert!(GamblersProblem::new(1, 0.5, 1.0).is_err(), "goal too small");
        assert!(GamblersProblem::new(100, 1.5, 1.0).is_err(), "prob_heads");
        assert!(GamblersProblem::new(100, 0.5, -0.1).is_err(), "gamma");
    }

    #[test]
    fn value_iteration_reproduces_textbook_values() {
        let mut solver = solver(GamblersProblem::new(100, 0.4, 1.0).unwrap(), 0);

        let mut deltas = vec![];
        loop {
            let delta = solver.sync_value_iteration().unwrap();
            deltas.push(delta);
            if delta < solver.config().epsilon {
                break;
            }
            assert!(deltas.len() < 1000, "value iteration converges");
        }
        solver.sync_improve_policy().unwrap();

        assert!(
            deltas.windows(2).skip(1).all(|w| w[1] <= w[0]),
            "delta is non-increasing after the first sweep: {deltas:?}"
        );

        assert_float_eq!(solver.value(&[25]).unwrap(), 0.16, abs <= 1e-3);
        assert_float_eq!(solver.value(&[50]).unwrap(), 0.4, abs <= 1e-3);
        assert_float_eq!(solver.value(&[75]).unwrap(), 0.64, abs <= 1e-3);
        assert_eq!(solver.value(&[100]), Some(1.0), "goal stays pinned");
        assert_eq!(solver.value(&[0]), Some(0.0), "ruin is worthless");
        assert_eq!(solver.action(&[50]), Some(50), "bet everything at 50");
    }

    #[test]
    fn policy_iteration_terminates() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = SolverConfig {
            epsilon: 1e-4,
            max_rounds: Some(100),
            max_sweeps: Some(100_000),
            ..Default::default()
        };
        let mut solver = Solver::for_model(GamblersProblem::default(), config, &mut rng).unwrap();
        solver.improve_policy(Method::Sync).unwrap();

        assert!(
            solver.stats().policy_iterations < 60,
            "stable after {} rounds",
            solver.stats().policy_iterations
        );
        for (state, _, value) in solver.iter() {
            assert_float_eq!(value, state[0] as f64 / 100.0, abs <= 1e-6);
        }
    }

    #[test]
    fn goal_stays_pinned() {
        let mut solver = solver(GamblersProblem::new(20, 0.4, 1.0).unwrap(), 11);
        assert!(solver.is_pinned(&[20]), "goal pinned by the model");

        for _ in 0..25 {
            solver.sync_evaluate_policy().unwrap();
            solver.sync_value_iteration().unwrap();
            assert_eq!(solver.value(&[20]), Some(1.0), "pinned after every sweep");
        }
    }
}
