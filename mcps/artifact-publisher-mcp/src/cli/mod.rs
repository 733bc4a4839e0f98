//! `git` and `gh` command wrappers

pub mod error;
pub mod executor;

pub use error::{CliError, CliResult};
pub use executor::{check_gh_available, run_gh, run_gh_json, run_git};
