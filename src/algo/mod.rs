pub mod dp;

pub use dp::{BestValueSeed, Method, Phase, Solver, SolverConfig, Stats, UpdateStrategy};
