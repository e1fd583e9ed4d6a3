use std::{error::Error, fs, path::Path};

use mdp::{
    algo::{Method, Solver, SolverConfig},
    gym::{CarRental, CarRentalConfig},
};
use rand::{rngs::StdRng, SeedableRng};

fn main() -> Result<(), Box<dyn Error>> {
    let env = CarRental::new(CarRentalConfig::default())?;
    let max_cars = env.config().max_cars;

    let mut rng = StdRng::seed_from_u64(0);
    let mut solver = Solver::for_model(env, SolverConfig::default(), &mut rng)?;

    println!("Running policy iteration...");
    solver.improve_policy(Method::Sync)?;
    println!("{:?}", solver.stats());

    // Write the policy as a grid, one row per inventory at the first location

    let path = Path::new("demos/car_rental/out");
    fs::create_dir_all(path)?;

    let mut wtr = csv::Writer::from_path(path.join("policy.csv"))?;
    for row in solver.policy().as_slice().chunks(max_cars + 1) {
        wtr.write_record(row.iter().map(|a| a.to_string()))?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(path.join("values.csv"))?;
    for row in solver.values().as_slice().chunks(max_cars + 1) {
        wtr.write_record(row.iter().map(|v| format!("{v:.2}")))?;
    }
    wtr.flush()?;

    Ok(())
}
