use std::{env, error::Error, fs, path::Path};

use mdp::{
    algo::{Method, Solver, SolverConfig},
    gym::GamblersProblem,
};
use rand::{rngs::StdRng, SeedableRng};

/// Usage: `cargo run --example gamblers_problem -- [sync|value_iter] [prob_heads]`
fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let tag = args.next().unwrap_or_else(|| "value_iter".into());
    let method = Method::from_tag(&tag)?;
    let prob_heads = match args.next() {
        Some(p) => p.parse::<f64>()?,
        None => 0.4,
    };

    let env = GamblersProblem::new(100, prob_heads, 1.0)?;
    let mut rng = StdRng::seed_from_u64(0);
    let mut solver = Solver::for_model(env, SolverConfig::default(), &mut rng)?;

    println!("Solving the gambler's problem (ph = {prob_heads}) with {method}...");
    solver.improve_policy(method)?;
    println!("{:?}", solver.stats());

    // Write data to CSV

    let path = Path::new("demos/gamblers_problem/out");
    fs::create_dir_all(path)?;

    let mut wtr = csv::Writer::from_path(path.join("data.csv"))?;
    wtr.write_record(["capital", "value", "stake"])?;
    for (state, stake, value) in solver.iter() {
        let capital = state[0];
        wtr.write_record(&[capital.to_string(), value.to_string(), stake.to_string()])?;
    }
    wtr.flush()?;

    Ok(())
}
