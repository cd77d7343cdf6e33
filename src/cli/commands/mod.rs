//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod questions;
mod random;
mod run;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use questions::run_questions;
pub use random::run_random;
pub use run::run_evaluation;
pub use serve::{router, run_serve, AppState};
