//! CLI module for the GAIA runner.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// GAIA evaluation runner
///
/// Answers GAIA benchmark questions with a tool-calling agent and submits the
/// answers to the scoring service.
#[derive(Parser, Debug)]
#[command(name = "gaia-runner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer every question and submit the answers for scoring
    Run {
        /// Hugging Face username to submit as
        #[arg(short, long, env = "HF_USERNAME")]
        username: Option<String>,

        /// Model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start the browser UI
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the agent a single question without submitting
    Ask {
        /// The question to answer
        question: String,

        /// Attached file for the question
        #[arg(short, long)]
        file: Option<String>,

        /// Model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the questions served by the scoring API
    Questions,

    /// Fetch a random question and answer it without submitting
    Random {
        /// Only show the question
        #[arg(long)]
        no_answer: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
