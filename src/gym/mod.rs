pub mod car_rental;
pub mod gamblers_problem;

pub use car_rental::{CarRental, CarRentalConfig};
pub use gamblers_problem::GamblersProblem;
