//! Command-line interface for voiceauth
//!
//! Provides argument parsing using clap derive macros.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Challenge-phrase gated voice enrollment and verification
#[derive(Parser, Debug)]
#[command(
    name = "voiceauth",
    version,
    about = "Challenge-phrase gated voice enrollment and verification"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Arguments shared by `enroll` and `verify`
#[derive(Args, Debug)]
pub struct SpokenRequest {
    /// Identity to enroll or verify
    #[arg(long, short = 'u', value_name = "USER")]
    pub user: String,

    /// Challenge phrase the speaker was asked to say
    #[arg(long, short = 'p', value_name = "PHRASE")]
    pub phrase: String,

    /// WAV recording of the speaker (use - for stdin)
    #[arg(long, short = 'a', value_name = "PATH")]
    pub audio: PathBuf,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a random challenge phrase
    Challenge {
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enroll a voiceprint from a recording of the challenge phrase
    Enroll(SpokenRequest),

    /// Verify a recording against the enrolled voiceprint
    Verify(SpokenRequest),

    /// Check whether a user has an enrolled voiceprint
    Exists {
        /// Identity to look up
        #[arg(long, short = 'u', value_name = "USER")]
        user: String,
    },

    /// Remove a user's voiceprint
    Delete {
        /// Identity to remove
        #[arg(long, short = 'u', value_name = "USER")]
        user: String,
    },

    /// Load both models once and report how long it took
    Preload,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the effective configuration (file + environment overrides)
    Show,
    /// Print the configuration file path
    Path,
}
