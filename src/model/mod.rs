//! Model module - Malthusian recurrence and household specialization model

pub mod household;
pub mod malthus;
pub mod optimize;

use thiserror::Error;

pub use household::{EstimationTarget, HouseholdParams};
pub use malthus::{MalthusParams, SolverSettings};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid parameter {name} = {value}: requires {rule}")]
    InvalidParameter {
        name: String,
        value: f64,
        rule: String,
    },
    #[error("Invalid solver settings: tolerance {tolerance}, max periods {max_periods}")]
    InvalidSolver { tolerance: f64, max_periods: usize },
    #[error("Recurrence left the positive reals at period {period}: {value}")]
    Diverged { period: usize, value: f64 },
    #[error("No feasible time allocation found")]
    NoFeasibleChoice,
    #[error("Home hours must be positive for the regression (wF = {wage_female}: HM = {hm}, HF = {hf})")]
    NonPositiveHomeHours { wage_female: f64, hm: f64, hf: f64 },
    #[error("Regression failed: {0}")]
    Regression(String),
}
