//! GAIA Runner - evaluation harness for the GAIA benchmark
//!
//! Fetches GAIA questions from a scoring service, answers each one with a
//! tool-calling LLM agent, and submits the answers for grading.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `api` - Scoring service client
//! - `agent` - Tool-calling agent and its sandboxed tool set
//! - `orchestrator` - Fetch, answer and submit pipeline
//! - `cli` - Terminal commands and the browser UI
//!
//! # Example
//!
//! ```rust,no_run
//! use gaia_runner::config::Settings;
//! use gaia_runner::orchestrator::run_and_submit_all;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!
//!     let outcome = run_and_submit_all(&settings, Some("my-hf-username"), None).await;
//!     println!("{}", outcome.status);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;

pub use error::{GaiaError, Result};
