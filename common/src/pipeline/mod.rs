pub mod generator;
pub mod refiner;

pub use generator::{GenerationResult, SqlGenerator};
pub use refiner::{QueryRefiner, RefinementResult};
