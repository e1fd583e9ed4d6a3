use std::convert::Infallible;

use statrs::distribution::{Discrete, Poisson};

use crate::{
    env::{DiscreteActionSpace, DiscreteStateSpace, Model},
    error::ConfigurationError,
    space::State,
    table::ValueFunction,
};

/// Configuration for the [`CarRental`] environment
#[derive(Debug, Clone, PartialEq)]
pub struct CarRentalConfig {
    /// Most cars a location can hold, extra returns are lost
    pub max_cars: usize,
    /// Most cars that can be moved between locations overnight
    pub max_move: usize,
    /// Cost per car moved
    pub move_cost: f64,
    /// Reward per car rented
    pub rental_reward: f64,
    /// Expected rental requests per day at each location
    pub rental_rate: [f64; 2],
    /// Expected returns per day at each location
    pub return_rate: [f64; 2],
    pub gamma: f64,
    /// Requests and returns are truncated below this count
    pub poisson_upper_bound: usize,
}

impl Default for CarRentalConfig {
    fn default() -> Self {
        Self {
            max_cars: 10,
            max_move: 5,
            move_cost: 2.0,
            rental_reward: 10.0,
            rental_rate: [3.0, 4.0],
            return_rate: [3.0, 2.0],
            gamma: 0.9,
            poisson_upper_bound: 11,
        }
    }
}

/// Jack's car rental from Sutton & Barto, example 4.2
///
/// Jack manages two locations of a car rental company. Each day customers rent and return cars at Poisson
/// distributed rates, and each rental earns a reward. Overnight Jack can move cars between the locations
/// at a cost per car.
///
/// States are the inventories `[0, max_cars]` at both locations. An action is the number of cars moved from
/// the first location to the second, negative to move the other way. Moves are clamped to the cars actually
/// present.
#[derive(Debug, Clone)]
pub struct CarRental {
    config: CarRentalConfig,
    rental_pmf: [Vec<f64>; 2],
    return_pmf: [Vec<f64>; 2],
}

impl CarRental {
    /// Initialize a new `CarRental` and cache the Poisson pmfs it needs
    ///
    /// **Errors** if a rate is not positive and finite, if `gamma` is not in the interval `[0,1]`, or if
    /// `max_cars` or `poisson_upper_bound` is zero
    pub fn new(config: CarRentalConfig) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&config.gamma) {
            return Err(ConfigurationError::InvalidParameter {
                name: "gamma",
                value: config.gamma,
            });
        }
        for (name, value) in [
            ("max_cars", config.max_cars),
            ("poisson_upper_bound", config.poisson_upper_bound),
        ] {
            if value == 0 {
                return Err(ConfigurationError::InvalidParameter { name, value: 0.0 });
            }
        }

        let bound = config.poisson_upper_bound;
        let rental_pmf = [
            pmf_table("rental_rate", config.rental_rate[0], bound)?,
            pmf_table("rental_rate", config.rental_rate[1], bound)?,
        ];
        let return_pmf = [
            pmf_table("return_rate", config.return_rate[0], bound)?,
            pmf_table("return_rate", config.return_rate[1], bound)?,
        ];

        Ok(Self {
            config,
            rental_pmf,
            return_pmf,
        })
    }

    pub fn config(&self) -> &CarRentalConfig {
        &self.config
    }

    /// Clamp a move to what the locations can supply
    fn clamp_move(&self, cars: [usize; 2], action: i32) -> i32 {
        action.clamp(-(cars[1] as i32), cars[0] as i32)
    }
}

/// P(n) for `n` in `[0, bound)` under a Poisson distribution with rate `lambda`
fn pmf_table(
    name: &'static str,
    lambda: f64,
    bound: usize,
) -> Result<Vec<f64>, ConfigurationError> {
    let poisson = Poisson::new(lambda)
        .map_err(|_| ConfigurationError::InvalidParameter { name, value: lambda })?;

    Ok((0..bound as u64).map(|n| poisson.pmf(n)).collect())
}

impl Model for CarRental {
    /// Number of cars moved from the first location to the second
    type Action = i32;
    type Error = Infallible;

    fn expected_return(
        &self,
        state: &State,
        action: i32,
        values: &ValueFunction,
    ) -> Result<f64, Infallible> {
        let CarRentalConfig {
            max_cars,
            move_cost,
            rental_reward,
            gamma,
            poisson_upper_bound: bound,
            ..
        } = self.config;

        let cars = [state[0], state[1]];
        let moved = self.clamp_move(cars, action);
        let start = [
            ((cars[0] as i32 - moved) as usize).min(max_cars),
            ((cars[1] as i32 + moved) as usize).min(max_cars),
        ];

        let mut expected = -move_cost * moved.unsigned_abs() as f64;

        for req0 in 0..bound {
            for req1 in 0..bound {
                let p_req = self.rental_pmf[0][req0] * self.rental_pmf[1][req1];
                let rented = [req0.min(start[0]), req1.min(start[1])];
                let reward = (rented[0] + rented[1]) as f64 * rental_reward;
                let left = [start[0] - rented[0], start[1] - rented[1]];

                for ret0 in 0..bound {
                    for ret1 in 0..bound {
                        let p = p_req * self.return_pmf[0][ret0] * self.return_pmf[1][ret1];
                        let next = [
                            (left[0] + ret0).min(max_cars),
                            (left[1] + ret1).min(max_cars),
                        ];
                        expected += p * (reward + gamma * values[next]);
                    }
                }
            }
        }

        Ok(expected)
    }
}

impl DiscreteStateSpace for CarRental {
    fn state_dims(&self) -> Vec<usize> {
        vec![self.config.max_cars + 1; 2]
    }
}

impl DiscreteActionSpace for CarRental {
    fn actions(&self) -> Vec<Self::Action> {
        let max = self.config.max_move as i32;
        (-max..=max).collect()
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

    fn small() -> CarRentalConfig {
        CarRentalConfig {
            max_cars: 4,
            max_move: 2,
            poisson_upper_bound: 8,
            ..Default::default()
        }
    }

    fn zeros(env: &CarRental) -> ValueFunction {
        ValueFunction::zeros(Shape::new(&env.state_dims()).unwrap())
    }

    #[test]
    fn car_rental_functional() {
        let env = CarRental::new(CarRentalConfig::default()).unwrap();
        assert_eq!(env.state_dims(), vec![11, 11], "inventory 0 through 10");
        assert_eq!(env.actions(), (-5..=5).collect::<Vec<_>>(), "moves");

        for pmf in env.rental_pmf.iter().chain(env.return_pmf.iter()) {
            assert_eq!(pmf.len(), 11, "pmf truncated at the upper bound");
            let mass = pmf.iter().sum::<f64>();
            assert!(mass <= 1.0 && mass > 0.99, "most of the mass is kept");
        }
    }

    #[test]
    fn car_rental_rejects_bad_parameters() {
        let bad = [
            CarRentalConfig {
                gamma: 1.5,
                ..small()
            },
            CarRentalConfig {
                rental_rate: [0.0, 4.0],
                ..small()
            },
            CarRentalConfig {
                return_rate: [3.0, -1.0],
                ..small()
            },
            CarRentalConfig {
                poisson_upper_bound: 0,
                ..small()
            },
        ];
        for config in bad {
            assert!(CarRental::new(config.clone()).is_err(), "{config:?} rejected");
        }
    }

    #[test]
    fn moves_cost_money() {
        let env = CarRental::new(CarRentalConfig {
            rental_reward: 0.0,
            ..small()
        })
        .unwrap();
        let values = zeros(&env);
        let ret = |cars: [usize; 2], action| {
            env.expected_return(&State::from(cars), action, &values)
                .unwrap()
        };

        assert_eq!(ret([2, 2], 0), 0.0, "staying put is free");
        assert_eq!(ret([2, 2], -2), -4.0, "two cars cost 4");
        assert_eq!(ret([1, 3], 2), -2.0, "move clamped to the one car present");
        assert_eq!(ret([0, 3], 2), 0.0, "nothing to move");
    }

    #[test]
    fn empty_lot_earns_nothing() {
        let env = CarRental::new(small()).unwrap();
        let values = zeros(&env);
        let ret = env
            .expected_return(&State::from([0, 0]), 0, &values)
            .unwrap();
        assert_eq!(ret, 0.0, "no cars to rent");

        let ret = env
            .expected_return(&State::from([4, 4]), 0, &values)
            .unwrap();
        assert!(ret > 0.0, "full lots earn rentals");
    }

    #[test]
    fn policy_iteration_solves_small_lot() {
        let mut rng = StdRng::seed_from_u64(5);
        let env = CarRental::new(small()).unwrap();
        let config = SolverConfig {
            max_rounds: Some(50),
            max_sweeps: Some(10_000),
            ..Default::default()
        };
        let mut solver = Solver::for_model(env, config, &mut rng).unwrap();
        solver.improve_policy(Method::Sync).unwrap();

        let mut value_iteration = Solver::for_model(
            CarRental::new(small()).unwrap(),
            SolverConfig::default(),
            &mut rng,
        )
        .unwrap();
        value_iteration.improve_policy(Method::ValueIteration).unwrap();

        for ((_, _, a), (_, _, b)) in solver.iter().zip(value_iteration.iter()) {
            assert!(a > 0.0, "every state is worth something");
            assert_float_eq!(a, b, abs <= 1e-2);
        }
    }
}
