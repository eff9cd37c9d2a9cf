//! Harvest CLI library.
//!
//! This crate provides the `harvest` command-line interface: argument
//! parsing, layered configuration, and the subcommands built on `hv-api`.

mod cli;
pub mod commands;
mod config;

pub use cli::{AddArgs, Cli, Commands, LoginArgs};
pub use config::{Config, clear_session, dirs_data_path, persist_session, state_file};
