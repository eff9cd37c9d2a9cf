//! CLI subcommand implementations.

pub mod add;
pub mod login;
pub mod logout;
pub mod status;
pub mod util;
