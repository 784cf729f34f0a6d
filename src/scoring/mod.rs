pub mod config;
pub mod factors;
pub mod engine;
pub mod validation;

pub use config::*;
pub use factors::{Direction, Normalization};
pub use engine::calculate_score;
pub use validation::{ensure_valid, validate_scoring};
