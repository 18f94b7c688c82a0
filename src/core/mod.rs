pub mod config;
pub mod error;
pub mod runner;
pub mod types;

pub use config::{ConfigLoader, RunnerConfig};
pub use error::AppError;
pub use types::*;
