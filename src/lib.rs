/// Implemented dynamic programming algorithms
pub mod algo;

/// Model traits an environment implements to be solved
pub mod env;

/// Error types
pub mod error;

/// States and rectangular state spaces
pub mod space;

/// Dense value and policy tables
pub mod table;

/// Environments with known dynamics
#[cfg(feature = "gym")]
pub mod gym;
