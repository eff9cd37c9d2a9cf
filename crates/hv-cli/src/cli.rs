//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Use Harvest from your terminal.
///
/// Log in once with your Harvest email and organization, then add your
/// hours for the day without opening a browser.
#[derive(Debug, Parser)]
#[command(name = "harvest", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in to your Harvest account.
    ///
    /// The password is read from a masked prompt and checked against Harvest
    /// before anything is stored.
    Login(LoginArgs),

    /// Add your hours for today, or for a given day.
    Add(AddArgs),

    /// Remove the stored credential for the configured organization.
    Logout,

    /// Show which organization and account are configured.
    Status,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// The email associated with your Harvest account.
    #[arg(long)]
    pub email: String,

    /// The organization you belong to on Harvest (the `acme` in
    /// `acme.harvestapp.com`).
    #[arg(long)]
    pub org: String,

    /// Replace a credential that is already stored for this organization.
    #[arg(long)]
    pub force: bool,

    /// Read the password from the first line of stdin instead of prompting.
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Hours worked, e.g. 8 or 7.5.
    pub hours: String,

    /// Notes for the entry.
    #[arg(short, long)]
    pub message: Option<String>,

    /// The day you worked the given hours (YYYY-MM-DD, `today`, or
    /// `yesterday`). Defaults to today.
    #[arg(short, long)]
    pub day: Option<String>,

    /// Project id to file the hours against.
    #[arg(long)]
    pub project: Option<String>,

    /// Task id to file the hours against.
    #[arg(long)]
    pub task: Option<String>,
}
