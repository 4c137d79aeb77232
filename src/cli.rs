//! Command-line interface definition for Food Vision
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, profile setup, detection and the
//! interactive app shell.

use crate::config::SessionStoreKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Food Vision - snap a meal, learn what is in it
///
/// Sign in, finish the one-step profile setup, then submit a food photo and
/// ask follow-up questions about what was detected.
#[derive(Parser, Debug, Clone)]
#[command(name = "foodvision")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

    /// Override the session cache backend (file, keyring, memory)
    #[arg(long, value_parser = SessionStoreKind::parse_str)]
    pub session_store: Option<SessionStoreKind>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Food Vision
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show which screen set the session/profile gate currently allows
    Status,

    /// Sign in with e-mail and password
    SignIn {
        /// Account e-mail address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "FOODVISION_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account (a confirmation e-mail is sent)
    SignUp {
        /// Account e-mail address
        #[arg(short, long)]
        email: String,

        /// New password
        #[arg(short, long, env = "FOODVISION_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation; defaults to `--password`
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Sign out and clear the cached session
    SignOut,

    /// Send a password-reset e-mail
    ResetPassword {
        /// Account e-mail address
        #[arg(short, long)]
        email: String,
    },

    /// Show or complete the user profile
    Profile {
        /// Profile subcommand
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Detect the food in an image and optionally fetch follow-up info
    Detect {
        /// Path to the food photo
        image: PathBuf,

        /// Follow-up categories to query after detection (e.g. calories)
        #[arg(short, long = "info")]
        info: Vec<String>,
    },

    /// List the follow-up information categories
    Categories,

    /// Start the interactive app shell
    App,
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Show the signed-in user's profile
    Show,

    /// Record the user's age (13-120), completing profile setup
    SetAge {
        /// Age in years
        age: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
